// ドメイン層
// ビジネスルールとポートを定義し、外部技術には依存しない

pub mod error;
pub mod model;
pub mod port;
