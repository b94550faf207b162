use crate::domain::error::DomainError;
use crate::domain::model::StockKey;
use crate::domain::port::{RepositoryError, StockUpdateError};

/// アプリケーション層のエラー型
/// ドメインエラー、リポジトリエラー、レコード未検出、同時更新競合をまとめる
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApplicationError {
    /// ドメインエラー（ビジネスルール違反）
    #[error("Domain error: {0}")]
    DomainError(#[from] DomainError),
    /// リポジトリエラー（永続化の失敗）
    #[error("Repository error: {0}")]
    RepositoryError(RepositoryError),
    /// 在庫レコードが見つからない
    #[error("Stock record not found: {0}")]
    RecordNotFound(StockKey),
    /// 再試行回数を使い切った同時更新競合
    /// 呼び出し側は一時的なエラーとして扱い、1回まで再試行してよい
    #[error("Concurrent update conflict after {attempts} attempts")]
    ConcurrentUpdateConflict { attempts: u32 },
}

impl From<RepositoryError> for ApplicationError {
    fn from(err: RepositoryError) -> Self {
        ApplicationError::RepositoryError(err)
    }
}

impl From<StockUpdateError> for ApplicationError {
    fn from(err: StockUpdateError) -> Self {
        match err {
            StockUpdateError::Rejected(domain_err) => ApplicationError::DomainError(domain_err),
            StockUpdateError::Repository(repo_err) => ApplicationError::RepositoryError(repo_err),
        }
    }
}
