// アプリケーション層
// ユースケースを実装し、ドメイン層のポートを組み合わせる

pub mod error;
pub mod service;

pub use error::ApplicationError;
