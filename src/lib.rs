// 血液在庫台帳
// ドメイン駆動設計（ヘキサゴナルアーキテクチャ）で構成する

pub mod adapter;
pub mod application;
pub mod domain;
