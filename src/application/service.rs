use crate::application::ApplicationError;
use crate::domain::model::{
    BloodBankId, BloodGroup, BloodStock, DonationId, ExpiryBatch, InventoryOperation, RequestId,
    StockKey, StockMutation,
};
use crate::domain::port::{BloodStockRepository, Clock, Logger, RepositoryError, StockUpdateError};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

mod donation_intake;
mod stock_report_service;

pub use donation_intake::{
    DonationIntakeService, DonationRecord, DonationStatus, BLOOD_SHELF_LIFE_DAYS,
    MAX_UNITS_PER_DONATION,
};
pub use stock_report_service::{
    BloodGroupSummary, LowStockEntry, StatusCount, StockQuery, StockReportService, StockSummary,
};

const COMPONENT: &str = "BloodStockLedger";

/// 台帳の動作設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerPolicy {
    /// 手動補正による削除でも低在庫アラートを追加するか
    pub raise_alert_on_manual_removal: bool,
    /// 期限切れ間近とみなす日数のデフォルト値
    pub expiring_soon_days: u32,
    /// 同時更新競合時の再試行回数
    pub max_conflict_retries: u32,
}

impl Default for LedgerPolicy {
    fn default() -> Self {
        Self {
            raise_alert_on_manual_removal: false,
            expiring_soon_days: 7,
            max_conflict_retries: 3,
        }
    }
}

/// 血液在庫台帳アプリケーションサービス
/// 在庫レコードへの唯一の書き込み経路
pub struct BloodStockLedgerService {
    repository: Arc<dyn BloodStockRepository>,
    clock: Arc<dyn Clock>,
    logger: Arc<dyn Logger>,
    policy: LedgerPolicy,
}

impl BloodStockLedgerService {
    /// 新しい台帳サービスを作成
    ///
    /// # Arguments
    /// * `repository` - 血液在庫リポジトリ
    /// * `clock` - 時刻取得
    /// * `logger` - ロガー
    /// * `policy` - 台帳の動作設定
    pub fn new(
        repository: Arc<dyn BloodStockRepository>,
        clock: Arc<dyn Clock>,
        logger: Arc<dyn Logger>,
        policy: LedgerPolicy,
    ) -> Self {
        Self {
            repository,
            clock,
            logger,
            policy,
        }
    }

    pub fn policy(&self) -> LedgerPolicy {
        self.policy
    }

    /// 検査済み献血からの入庫
    ///
    /// # Arguments
    /// * `blood_bank` - 血液銀行ID
    /// * `blood_group` - 血液型
    /// * `units` - 単位数（1以上）
    /// * `expiry_date` - 有効期限（現在より後）
    /// * `donation_id` - 献血ID
    ///
    /// # Returns
    /// * `Ok(BloodStock)` - 入庫後の在庫レコード
    /// * `Err(ApplicationError)` - 入庫失敗
    pub async fn add_stock_from_donation(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        units: u32,
        expiry_date: DateTime<Utc>,
        donation_id: DonationId,
    ) -> Result<BloodStock, ApplicationError> {
        let mutation = StockMutation::AddFromDonation {
            units,
            expiry_date,
            donation_id,
        };
        self.execute(
            StockKey::new(blood_bank, blood_group),
            mutation,
            Some(donation_id.as_uuid()),
        )
        .await
    }

    /// 輸血依頼充足のための出庫
    /// 低水準以下になった場合は低在庫アラートが追加される
    ///
    /// # Returns
    /// * `Ok(BloodStock)` - 出庫後の在庫レコード
    /// * `Err(ApplicationError::DomainError(DomainError::InsufficientStock))` - 在庫不足
    pub async fn remove_stock(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        units: u32,
        request_id: RequestId,
    ) -> Result<BloodStock, ApplicationError> {
        self.execute(
            StockKey::new(blood_bank, blood_group),
            StockMutation::RemoveForRequest { units },
            Some(request_id.as_uuid()),
        )
        .await
    }

    /// 管理者による手動在庫補正
    /// 削除時のアラート追加は `LedgerPolicy::raise_alert_on_manual_removal` に従う
    pub async fn update_inventory(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        units: u32,
        operation: InventoryOperation,
    ) -> Result<BloodStock, ApplicationError> {
        let mutation = StockMutation::ManualAdjustment {
            units,
            operation,
            raise_alert: self.policy.raise_alert_on_manual_removal,
        };
        self.execute(StockKey::new(blood_bank, blood_group), mutation, None)
            .await
    }

    /// 緊急依頼向けに在庫を引き当てる
    pub async fn reserve_stock(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        units: u32,
    ) -> Result<BloodStock, ApplicationError> {
        self.execute(
            StockKey::new(blood_bank, blood_group),
            StockMutation::Reserve { units },
            None,
        )
        .await
    }

    /// 引当を解除する
    pub async fn release_reservation(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        units: u32,
    ) -> Result<BloodStock, ApplicationError> {
        self.execute(
            StockKey::new(blood_bank, blood_group),
            StockMutation::ReleaseReservation { units },
            None,
        )
        .await
    }

    /// アラートを解決済みにする
    pub async fn resolve_alert(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        alert_index: usize,
    ) -> Result<BloodStock, ApplicationError> {
        self.execute(
            StockKey::new(blood_bank, blood_group),
            StockMutation::ResolveAlert { index: alert_index },
            None,
        )
        .await
    }

    /// 在庫レコードを取得し、存在しなければ作成する
    pub async fn find_or_create(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
    ) -> Result<BloodStock, ApplicationError> {
        let now = self.clock.now();
        self.repository
            .find_or_create(StockKey::new(blood_bank, blood_group), now)
            .await
            .map_err(ApplicationError::from)
    }

    /// 在庫レコードを取得
    ///
    /// # Returns
    /// * `Ok(BloodStock)` - 在庫レコード
    /// * `Err(ApplicationError::RecordNotFound)` - 在庫レコードが存在しない
    pub async fn get(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
    ) -> Result<BloodStock, ApplicationError> {
        let key = StockKey::new(blood_bank, blood_group);
        self.repository
            .find_by_key(key)
            .await?
            .ok_or(ApplicationError::RecordNotFound(key))
    }

    /// 血液銀行の在庫レコードを血液型順に取得
    pub async fn list_by_bank(
        &self,
        blood_bank: BloodBankId,
    ) -> Result<Vec<BloodStock>, ApplicationError> {
        let mut stocks = self.repository.find_by_blood_bank(blood_bank).await?;
        stocks.sort_by(|a, b| a.blood_group().as_str().cmp(b.blood_group().as_str()));
        Ok(stocks)
    }

    /// すべての在庫レコードを作成順に取得
    pub async fn list_all(&self) -> Result<Vec<BloodStock>, ApplicationError> {
        self.repository
            .find_all()
            .await
            .map_err(ApplicationError::from)
    }

    /// 期限切れ間近のバッチを取得
    ///
    /// # Arguments
    /// * `within_days` - 日数（省略時は設定値）
    pub async fn expiring_soon(
        &self,
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        within_days: Option<u32>,
    ) -> Result<Vec<ExpiryBatch>, ApplicationError> {
        let stock = self.get(blood_bank, blood_group).await?;
        let within_days = within_days.unwrap_or(self.policy.expiring_soon_days);
        Ok(stock
            .expiring_soon(self.clock.now(), within_days)
            .into_iter()
            .cloned()
            .collect())
    }

    /// 変更コマンドを検証してリポジトリに適用する
    /// 同時更新競合は設定回数まで再試行する
    async fn execute(
        &self,
        key: StockKey,
        mutation: StockMutation,
        correlation_id: Option<Uuid>,
    ) -> Result<BloodStock, ApplicationError> {
        if let Err(err) = mutation.validate(self.clock.now()) {
            self.logger.warn(
                COMPONENT,
                &format!("{} rejected before reaching the store: {}", mutation.name(), err),
                correlation_id,
                Some(mutation_context(key, &mutation)),
            );
            return Err(err.into());
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            let now = self.clock.now();
            match self.repository.apply_mutation(key, &mutation, now).await {
                Ok(stock) => {
                    self.log_applied(key, &mutation, &stock, correlation_id);
                    return Ok(stock);
                }
                Err(StockUpdateError::Repository(RepositoryError::Conflict(msg)))
                    if attempts <= self.policy.max_conflict_retries =>
                {
                    self.logger.debug(
                        COMPONENT,
                        &format!("Retrying {} after conflict: {}", mutation.name(), msg),
                        correlation_id,
                        Some(mutation_context(key, &mutation)),
                    );
                }
                Err(StockUpdateError::Repository(RepositoryError::Conflict(msg))) => {
                    self.logger.error(
                        COMPONENT,
                        &format!(
                            "{} gave up after {} attempts: {}",
                            mutation.name(),
                            attempts,
                            msg
                        ),
                        correlation_id,
                        Some(mutation_context(key, &mutation)),
                    );
                    return Err(ApplicationError::ConcurrentUpdateConflict { attempts });
                }
                Err(StockUpdateError::Rejected(err)) => {
                    self.logger.warn(
                        COMPONENT,
                        &format!("{} rejected: {}", mutation.name(), err),
                        correlation_id,
                        Some(mutation_context(key, &mutation)),
                    );
                    return Err(err.into());
                }
                Err(StockUpdateError::Repository(err)) => {
                    self.logger.error(
                        COMPONENT,
                        &format!("{} failed: {}", mutation.name(), err),
                        correlation_id,
                        Some(mutation_context(key, &mutation)),
                    );
                    return Err(err.into());
                }
            }
        }
    }

    fn log_applied(
        &self,
        key: StockKey,
        mutation: &StockMutation,
        stock: &BloodStock,
        correlation_id: Option<Uuid>,
    ) {
        let mut context = mutation_context(key, mutation);
        context.insert("current_stock".to_string(), stock.current_stock().to_string());
        context.insert("status".to_string(), stock.status().to_string());

        self.logger.info(
            COMPONENT,
            &format!("{} applied", mutation.name()),
            correlation_id,
            Some(context.clone()),
        );

        if raises_low_stock_alert(mutation) && stock.is_low_stock() {
            if let Some(alert) = stock.alerts().last() {
                context.insert("severity".to_string(), alert.severity().as_str().to_string());
                self.logger
                    .warn(COMPONENT, alert.message(), correlation_id, Some(context));
            }
        }
    }
}

fn raises_low_stock_alert(mutation: &StockMutation) -> bool {
    matches!(
        mutation,
        StockMutation::RemoveForRequest { .. }
            | StockMutation::ManualAdjustment {
                operation: InventoryOperation::Remove,
                raise_alert: true,
                ..
            }
    )
}

fn mutation_context(key: StockKey, mutation: &StockMutation) -> HashMap<String, String> {
    let mut context = HashMap::new();
    context.insert("blood_bank".to_string(), key.blood_bank.to_string());
    context.insert("blood_group".to_string(), key.blood_group.to_string());
    match mutation {
        StockMutation::AddFromDonation { units, .. }
        | StockMutation::RemoveForRequest { units }
        | StockMutation::Reserve { units }
        | StockMutation::ReleaseReservation { units } => {
            context.insert("units".to_string(), units.to_string());
        }
        StockMutation::ManualAdjustment {
            units, operation, ..
        } => {
            context.insert("units".to_string(), units.to_string());
            context.insert("operation".to_string(), operation.to_string());
        }
        StockMutation::ResolveAlert { index } => {
            context.insert("alert_index".to_string(), index.to_string());
        }
    }
    context
}
