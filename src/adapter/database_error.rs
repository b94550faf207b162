use crate::domain::port::RepositoryError;
use sqlx::mysql::MySqlDatabaseError;

/// デッドロック検出
const ER_LOCK_DEADLOCK: u16 = 1213;
/// ロック待ちタイムアウト
const ER_LOCK_WAIT_TIMEOUT: u16 = 1205;

/// データベースエラー型
/// データベース操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatabaseError {
    /// データベース接続エラー
    #[error("Database connection error: {0}")]
    ConnectionError(String),
    /// SQLクエリエラー
    #[error("Database query error: {0}")]
    QueryError(String),
    /// 同時更新の競合（再試行可能）
    #[error("Database lock conflict: {0}")]
    LockConflict(String),
    /// マイグレーションエラー
    #[error("Migration error: {0}")]
    MigrationError(String),
}

impl DatabaseError {
    /// sqlxのエラーをクエリエラーに変換する
    /// デッドロックとロック待ちタイムアウトは競合として区別する
    pub fn from_query(err: sqlx::Error, context: &str) -> Self {
        let message = format!("{}: {}", context, err);
        if is_lock_conflict(&err) {
            DatabaseError::LockConflict(message)
        } else {
            DatabaseError::QueryError(message)
        }
    }
}

fn is_lock_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .and_then(|db_err| db_err.try_downcast_ref::<MySqlDatabaseError>())
        .map_or(false, |mysql_err| {
            matches!(mysql_err.number(), ER_LOCK_DEADLOCK | ER_LOCK_WAIT_TIMEOUT)
        })
}

/// DatabaseErrorからRepositoryErrorへの変換
impl From<DatabaseError> for RepositoryError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::ConnectionError(msg) => RepositoryError::ConnectionFailed(msg),
            DatabaseError::QueryError(msg) => RepositoryError::OperationFailed(msg),
            DatabaseError::LockConflict(msg) => RepositoryError::Conflict(msg),
            DatabaseError::MigrationError(msg) => RepositoryError::OperationFailed(msg),
        }
    }
}
