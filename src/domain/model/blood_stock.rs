use crate::domain::error::DomainError;
use crate::domain::model::stock_level::{self, StockStatus};
use crate::domain::model::{
    AlertSeverity, AlertType, BloodBankId, BloodGroup, DonationId, ExpiryBatch, InventoryOperation,
    StockAlert, StockKey, StockMutation, StockThresholds,
};
use chrono::{DateTime, Duration, Utc};

/// 新規在庫レコードの名目容量
pub const DEFAULT_CAPACITY: u32 = 100;

/// 血液在庫集約
/// (血液銀行, 血液型) ごとの在庫数・引当数・有効期限バッチ・アラートを管理する
#[derive(Debug, Clone, PartialEq)]
pub struct BloodStock {
    blood_bank: BloodBankId,
    blood_group: BloodGroup,
    current_stock: u32,
    reserved_stock: u32,
    capacity: u32,
    thresholds: StockThresholds,
    expiry_batches: Vec<ExpiryBatch>,
    alerts: Vec<StockAlert>,
    last_updated: DateTime<Utc>,
}

impl BloodStock {
    /// 新しい在庫レコードを作成
    /// 在庫0、容量100、閾値はデフォルト値
    pub fn new(blood_bank: BloodBankId, blood_group: BloodGroup, now: DateTime<Utc>) -> Self {
        Self {
            blood_bank,
            blood_group,
            current_stock: 0,
            reserved_stock: 0,
            capacity: DEFAULT_CAPACITY,
            thresholds: StockThresholds::default(),
            expiry_batches: Vec::new(),
            alerts: Vec::new(),
            last_updated: now,
        }
    }

    /// データベースから取得したデータで在庫レコードを再構築
    /// リポジトリでの使用を想定
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        current_stock: u32,
        reserved_stock: u32,
        capacity: u32,
        thresholds: StockThresholds,
        expiry_batches: Vec<ExpiryBatch>,
        alerts: Vec<StockAlert>,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            blood_bank,
            blood_group,
            current_stock,
            reserved_stock,
            capacity,
            thresholds,
            expiry_batches,
            alerts,
            last_updated,
        }
    }

    /// 容量を設定した在庫レコードを作成（テスト・初期データ投入用）
    pub fn with_levels(
        blood_bank: BloodBankId,
        blood_group: BloodGroup,
        current_stock: u32,
        capacity: u32,
        thresholds: StockThresholds,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            current_stock,
            capacity,
            thresholds,
            ..Self::new(blood_bank, blood_group, now)
        }
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(self.blood_bank, self.blood_group)
    }

    pub fn blood_bank(&self) -> BloodBankId {
        self.blood_bank
    }

    pub fn blood_group(&self) -> BloodGroup {
        self.blood_group
    }

    /// 物理在庫数
    pub fn current_stock(&self) -> u32 {
        self.current_stock
    }

    /// 引当済み数
    pub fn reserved_stock(&self) -> u32 {
        self.reserved_stock
    }

    /// 名目容量（超過は許容される）
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn thresholds(&self) -> StockThresholds {
        self.thresholds
    }

    pub fn expiry_batches(&self) -> &[ExpiryBatch] {
        &self.expiry_batches
    }

    pub fn alerts(&self) -> &[StockAlert] {
        &self.alerts
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }

    /// 利用可能在庫（物理在庫 - 引当数、0未満にはならない）
    pub fn available_stock(&self) -> u32 {
        self.current_stock.saturating_sub(self.reserved_stock)
    }

    /// 容量に対する在庫の割合（%）
    pub fn utilization(&self) -> f64 {
        stock_level::utilization(self.current_stock, self.capacity)
    }

    /// 在庫ステータス
    pub fn status(&self) -> StockStatus {
        stock_level::derive_status(self.current_stock, self.capacity, self.thresholds)
    }

    /// 低水準以下かどうか（レコード自身の閾値で判定）
    pub fn is_low_stock(&self) -> bool {
        stock_level::at_or_below_level(self.current_stock, self.capacity, self.thresholds.low_level())
    }

    /// 指定された数量が利用可能かチェック
    pub fn has_available_stock(&self, units: u32) -> bool {
        self.available_stock() >= units
    }

    /// 変更コマンドを適用する
    ///
    /// # Returns
    /// * `Ok(Some(StockAlert))` - 適用成功、新しいアラートが追加された
    /// * `Ok(None)` - 適用成功
    /// * `Err(DomainError)` - 適用失敗（状態は変わらない）
    pub fn apply(
        &mut self,
        mutation: &StockMutation,
        now: DateTime<Utc>,
    ) -> Result<Option<StockAlert>, DomainError> {
        mutation.validate(now)?;
        match mutation {
            StockMutation::AddFromDonation {
                units,
                expiry_date,
                donation_id,
            } => self
                .add_stock_from_donation(*units, *expiry_date, *donation_id, now)
                .map(|_| None),
            StockMutation::RemoveForRequest { units } => self.remove_stock(*units, now),
            StockMutation::ManualAdjustment {
                units,
                operation,
                raise_alert,
            } => self.adjust(*units, *operation, *raise_alert, now),
            StockMutation::Reserve { units } => self.reserve(*units, now).map(|_| None),
            StockMutation::ReleaseReservation { units } => {
                self.release_reservation(*units, now).map(|_| None)
            }
            StockMutation::ResolveAlert { index } => self.resolve_alert(*index, now).map(|_| None),
        }
    }

    /// 献血由来の入庫
    /// 容量超過はエラーにしない。アラートの再評価も行わない
    pub fn add_stock_from_donation(
        &mut self,
        units: u32,
        expiry_date: DateTime<Utc>,
        donation_id: DonationId,
        now: DateTime<Utc>,
    ) -> Result<(), DomainError> {
        if units == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        if expiry_date <= now {
            return Err(DomainError::InvalidExpiryDate);
        }
        self.increment(units)?;
        self.expiry_batches
            .push(ExpiryBatch::new(units, expiry_date, donation_id));
        self.last_updated = now;
        Ok(())
    }

    /// 依頼充足のための出庫
    /// 出庫後に低水準以下となった場合は必ず新しいアラートを追加する
    ///
    /// # Returns
    /// * `Ok(Some(StockAlert))` - 出庫成功、低在庫アラートを追加した
    /// * `Ok(None)` - 出庫成功
    /// * `Err(DomainError::InsufficientStock)` - 在庫不足（状態は変わらない）
    pub fn remove_stock(
        &mut self,
        units: u32,
        now: DateTime<Utc>,
    ) -> Result<Option<StockAlert>, DomainError> {
        self.decrement(units, now)?;
        Ok(self.raise_low_stock_alert(now))
    }

    /// 手動補正
    /// 追加は有効期限バッチを記録しない。削除でアラートを出すかは `raise_alert` で指定する
    pub fn adjust(
        &mut self,
        units: u32,
        operation: InventoryOperation,
        raise_alert: bool,
        now: DateTime<Utc>,
    ) -> Result<Option<StockAlert>, DomainError> {
        match operation {
            InventoryOperation::Add => {
                if units == 0 {
                    return Err(DomainError::InvalidQuantity);
                }
                self.increment(units)?;
                self.last_updated = now;
                Ok(None)
            }
            InventoryOperation::Remove if raise_alert => self.remove_stock(units, now),
            InventoryOperation::Remove => {
                self.decrement(units, now)?;
                Ok(None)
            }
        }
    }

    /// 利用可能在庫から引当を行う
    pub fn reserve(&mut self, units: u32, now: DateTime<Utc>) -> Result<(), DomainError> {
        if units == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        if !self.has_available_stock(units) {
            return Err(DomainError::InsufficientStock {
                available: self.available_stock(),
                requested: units,
            });
        }
        self.reserved_stock += units;
        self.last_updated = now;
        Ok(())
    }

    /// 引当を解除する
    pub fn release_reservation(&mut self, units: u32, now: DateTime<Utc>) -> Result<(), DomainError> {
        if units == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        if units > self.reserved_stock {
            return Err(DomainError::InvalidValue(format!(
                "引当数を超える解除はできません。引当数: {}, 解除数: {}",
                self.reserved_stock, units
            )));
        }
        self.reserved_stock -= units;
        self.last_updated = now;
        Ok(())
    }

    /// アラートを解決済みにする
    /// 解決済みのアラートに対しては何もしない
    pub fn resolve_alert(&mut self, index: usize, now: DateTime<Utc>) -> Result<(), DomainError> {
        let alert = self.alerts.get_mut(index).ok_or_else(|| {
            DomainError::InvalidValue(format!("アラートが見つかりません: {}", index))
        })?;
        if alert.is_resolved() {
            return Ok(());
        }
        alert.resolve();
        self.last_updated = now;
        Ok(())
    }

    /// 指定日数以内に期限切れとなるバッチを取得
    /// 期限切れ済みのバッチは含まない
    pub fn expiring_soon(&self, now: DateTime<Utc>, within_days: u32) -> Vec<&ExpiryBatch> {
        let threshold = now + Duration::days(i64::from(within_days));
        self.expiry_batches
            .iter()
            .filter(|batch| batch.expiry_date() > now && batch.expiry_date() <= threshold)
            .collect()
    }

    fn increment(&mut self, units: u32) -> Result<(), DomainError> {
        self.current_stock = self.current_stock.checked_add(units).ok_or_else(|| {
            DomainError::InvalidValue(format!(
                "在庫数が上限を超えます: {} + {}",
                self.current_stock, units
            ))
        })?;
        Ok(())
    }

    fn decrement(&mut self, units: u32, now: DateTime<Utc>) -> Result<(), DomainError> {
        if units == 0 {
            return Err(DomainError::InvalidQuantity);
        }
        if !self.has_available_stock(units) {
            return Err(DomainError::InsufficientStock {
                available: self.available_stock(),
                requested: units,
            });
        }
        self.current_stock -= units;
        self.last_updated = now;
        Ok(())
    }

    fn raise_low_stock_alert(&mut self, now: DateTime<Utc>) -> Option<StockAlert> {
        if !self.is_low_stock() {
            return None;
        }
        let severity = if stock_level::at_or_below_level(
            self.current_stock,
            self.capacity,
            self.thresholds.critical_level(),
        ) {
            AlertSeverity::High
        } else {
            AlertSeverity::Medium
        };
        let alert = StockAlert::new(
            AlertType::LowStock,
            format!(
                "{} stock is low: {} units remaining",
                self.blood_group, self.current_stock
            ),
            severity,
            now,
        );
        self.alerts.push(alert.clone());
        Some(alert)
    }
}
