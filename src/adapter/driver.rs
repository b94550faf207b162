// 駆動する側アダプター（出力用DTO）

pub mod response_dto;
