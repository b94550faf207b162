// 出力ポート
// ドメイン層が外部に依存する機能をトレイトとして定義
// アダプター層でこれらのトレイトを実装する

use crate::domain::error::DomainError;
use crate::domain::model::{BloodBankId, BloodStock, StockKey, StockMutation};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// ログレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

/// ロガートレイト
/// ログ出力を抽象化するポート
pub trait Logger: Send + Sync {
    /// デバッグレベルのログを出力
    fn debug(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 情報レベルのログを出力
    fn info(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// 警告レベルのログを出力
    fn warn(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );

    /// エラーレベルのログを出力
    fn error(
        &self,
        component: &str,
        message: &str,
        correlation_id: Option<Uuid>,
        context: Option<HashMap<String, String>>,
    );
}

/// 時刻取得ポート
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// リポジトリエラー型
/// リポジトリ操作で発生するエラーを表現する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[allow(clippy::enum_variant_names)]
pub enum RepositoryError {
    /// データベース接続に失敗
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    /// 操作に失敗
    #[error("Operation failed: {0}")]
    OperationFailed(String),
    /// データの取得に失敗
    #[error("Fetch failed: {0}")]
    FetchFailed(String),
    /// 同時更新の競合（デッドロック・ロック待ちタイムアウトなど）
    /// 一時的なエラーとして再試行できる
    #[error("Concurrent update conflict: {0}")]
    Conflict(String),
}

/// 在庫更新エラー型
/// ドメインルールによる拒否と永続化の失敗を区別する
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StockUpdateError {
    #[error(transparent)]
    Rejected(#[from] DomainError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// 血液在庫リポジトリトレイト
/// 在庫レコードの永続化を抽象化する
/// 在庫数・引当数・アラートの書き込みは `apply_mutation` のみが行う
#[async_trait]
pub trait BloodStockRepository: Send + Sync {
    /// 在庫レコードを取得し、存在しなければ作成する
    /// 同じキーへの同時初回アクセスでもレコードは1件だけ作成される
    ///
    /// # Arguments
    /// * `key` - (血液銀行, 血液型)
    /// * `now` - 作成時の最終更新日時
    ///
    /// # Returns
    /// * `Ok(BloodStock)` - 既存または新規の在庫レコード
    /// * `Err(RepositoryError)` - 取得・作成失敗
    async fn find_or_create(
        &self,
        key: StockKey,
        now: DateTime<Utc>,
    ) -> Result<BloodStock, RepositoryError>;

    /// キーで在庫レコードを検索する
    ///
    /// # Returns
    /// * `Ok(Some(BloodStock))` - 在庫レコードが見つかった
    /// * `Ok(None)` - 在庫レコードが見つからなかった
    /// * `Err(RepositoryError)` - 検索失敗
    async fn find_by_key(&self, key: StockKey) -> Result<Option<BloodStock>, RepositoryError>;

    /// 指定された血液銀行の在庫レコードをすべて取得する
    /// 並び順は保証しない（表示側で血液型順に並べる）
    async fn find_by_blood_bank(
        &self,
        blood_bank: BloodBankId,
    ) -> Result<Vec<BloodStock>, RepositoryError>;

    /// すべての在庫レコードを作成順に取得する
    async fn find_all(&self) -> Result<Vec<BloodStock>, RepositoryError>;

    /// 変更コマンドをアトミックに適用する
    /// レコードが無ければ作成し、レコード単位の排他区間内で検証・適用・保存を行う
    /// 拒否された場合はストアに一切変更を残さない
    ///
    /// # Arguments
    /// * `key` - (血液銀行, 血液型)
    /// * `mutation` - 適用する変更コマンド
    /// * `now` - 変更日時
    ///
    /// # Returns
    /// * `Ok(BloodStock)` - 適用後の在庫レコード
    /// * `Err(StockUpdateError::Rejected)` - ドメインルールにより拒否
    /// * `Err(StockUpdateError::Repository)` - 永続化失敗
    async fn apply_mutation(
        &self,
        key: StockKey,
        mutation: &StockMutation,
        now: DateTime<Utc>,
    ) -> Result<BloodStock, StockUpdateError>;
}
