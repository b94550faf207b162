use crate::application::service::BloodStockLedgerService;
use crate::application::ApplicationError;
use crate::domain::error::DomainError;
use crate::domain::model::{BloodBankId, BloodGroup, BloodStock, DonationId};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 献血から入庫までの保存可能日数
pub const BLOOD_SHELF_LIFE_DAYS: i64 = 42;

/// 1回の献血で受け付ける最大単位数
pub const MAX_UNITS_PER_DONATION: u32 = 2;

/// 献血の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DonationStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Rejected,
    Processed,
}

impl DonationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DonationStatus::Scheduled => "scheduled",
            DonationStatus::InProgress => "in-progress",
            DonationStatus::Completed => "completed",
            DonationStatus::Cancelled => "cancelled",
            DonationStatus::Rejected => "rejected",
            DonationStatus::Processed => "processed",
        }
    }

    /// 文字列からDonationStatusを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "scheduled" => Ok(DonationStatus::Scheduled),
            "in-progress" => Ok(DonationStatus::InProgress),
            "completed" => Ok(DonationStatus::Completed),
            "cancelled" => Ok(DonationStatus::Cancelled),
            "rejected" => Ok(DonationStatus::Rejected),
            "processed" => Ok(DonationStatus::Processed),
            _ => Err(DomainError::InvalidValue(format!("無効な献血状態: {}", s))),
        }
    }
}

/// 献血記録（入庫判定に必要な項目のみ）
#[derive(Debug, Clone, PartialEq)]
pub struct DonationRecord {
    pub donation_id: DonationId,
    pub blood_bank: BloodBankId,
    pub blood_group: BloodGroup,
    pub units_donated: u32,
    pub donation_date: DateTime<Utc>,
    /// 未指定の場合は献血日から42日後
    pub expiry_date: Option<DateTime<Utc>>,
    pub status: DonationStatus,
    /// 検査結果が安全と判定されたか
    pub is_safe: bool,
}

impl DonationRecord {
    /// 入庫可能かどうか
    pub fn is_cleared_for_stock(&self) -> bool {
        self.is_safe
            && matches!(
                self.status,
                DonationStatus::Completed | DonationStatus::Processed
            )
    }

    /// 有効期限（未指定なら献血日 + 42日）
    pub fn effective_expiry_date(&self) -> DateTime<Utc> {
        self.expiry_date
            .unwrap_or_else(|| self.donation_date + Duration::days(BLOOD_SHELF_LIFE_DAYS))
    }
}

/// 献血入庫サービス
/// 安全と判定された献血を明示的に台帳へ入庫する
/// 同じ献血記録に対して1回だけ呼び出すのは呼び出し側の責務
pub struct DonationIntakeService {
    ledger: Arc<BloodStockLedgerService>,
}

impl DonationIntakeService {
    pub fn new(ledger: Arc<BloodStockLedgerService>) -> Self {
        Self { ledger }
    }

    /// 入庫可能な献血を台帳に入庫する
    ///
    /// # Returns
    /// * `Ok(Some(BloodStock))` - 入庫後の在庫レコード
    /// * `Ok(None)` - 入庫対象外（台帳には触れない）
    /// * `Err(ApplicationError)` - 単位数不正または入庫失敗
    pub async fn stock_cleared_donation(
        &self,
        record: &DonationRecord,
    ) -> Result<Option<BloodStock>, ApplicationError> {
        if !record.is_cleared_for_stock() {
            return Ok(None);
        }
        if record.units_donated == 0 || record.units_donated > MAX_UNITS_PER_DONATION {
            return Err(DomainError::InvalidQuantity.into());
        }

        self.ledger
            .add_stock_from_donation(
                record.blood_bank,
                record.blood_group,
                record.units_donated,
                record.effective_expiry_date(),
                record.donation_id,
            )
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::driven::{InMemoryBloodStockRepository, TracingLogger};
    use crate::application::service::LedgerPolicy;
    use crate::domain::port::{BloodStockRepository, Clock};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn donation_date() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn intake_at(
        now: DateTime<Utc>,
    ) -> (DonationIntakeService, Arc<InMemoryBloodStockRepository>) {
        let repository = Arc::new(InMemoryBloodStockRepository::new());
        let ledger = BloodStockLedgerService::new(
            repository.clone(),
            Arc::new(FixedClock(now)),
            Arc::new(TracingLogger::new()),
            LedgerPolicy::default(),
        );
        (DonationIntakeService::new(Arc::new(ledger)), repository)
    }

    fn record(status: DonationStatus, is_safe: bool, units: u32) -> DonationRecord {
        DonationRecord {
            donation_id: DonationId::new(),
            blood_bank: BloodBankId::new(),
            blood_group: BloodGroup::OPositive,
            units_donated: units,
            donation_date: donation_date(),
            expiry_date: None,
            status,
            is_safe,
        }
    }

    #[test]
    fn test_clearance_rules() {
        assert!(record(DonationStatus::Completed, true, 1).is_cleared_for_stock());
        assert!(record(DonationStatus::Processed, true, 1).is_cleared_for_stock());
        assert!(!record(DonationStatus::Completed, false, 1).is_cleared_for_stock());
        assert!(!record(DonationStatus::InProgress, true, 1).is_cleared_for_stock());
        assert!(!record(DonationStatus::Rejected, true, 1).is_cleared_for_stock());
    }

    #[test]
    fn test_default_expiry_is_42_days() {
        let donation = record(DonationStatus::Completed, true, 1);
        assert_eq!(
            donation.effective_expiry_date(),
            donation_date() + Duration::days(42)
        );
    }

    #[test]
    fn test_donation_status_round_trip_labels() {
        for label in ["scheduled", "in-progress", "completed", "cancelled", "rejected", "processed"] {
            assert_eq!(DonationStatus::from_string(label).unwrap().as_str(), label);
        }
        assert!(DonationStatus::from_string("done").is_err());
    }

    #[tokio::test]
    async fn test_cleared_donation_is_stocked_once() {
        let (intake, repository) = intake_at(donation_date() + Duration::days(1));
        let donation = record(DonationStatus::Completed, true, 2);

        let stock = intake
            .stock_cleared_donation(&donation)
            .await
            .unwrap()
            .expect("cleared donation should be stocked");
        assert_eq!(stock.current_stock(), 2);
        assert_eq!(stock.expiry_batches().len(), 1);
        assert_eq!(stock.expiry_batches()[0].donation_id(), donation.donation_id);
        assert_eq!(
            stock.expiry_batches()[0].expiry_date(),
            donation_date() + Duration::days(42)
        );
        assert_eq!(repository.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_uncleared_donation_does_not_touch_ledger() {
        let (intake, repository) = intake_at(donation_date() + Duration::days(1));
        let result = intake
            .stock_cleared_donation(&record(DonationStatus::Completed, false, 1))
            .await
            .unwrap();
        assert!(result.is_none());
        assert!(repository.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_units_out_of_range_rejected() {
        let (intake, repository) = intake_at(donation_date() + Duration::days(1));
        let result = intake
            .stock_cleared_donation(&record(DonationStatus::Completed, true, 3))
            .await;
        assert_eq!(
            result,
            Err(ApplicationError::DomainError(DomainError::InvalidQuantity))
        );
        assert!(repository.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_donation_rejected() {
        let (intake, _) = intake_at(donation_date() + Duration::days(43));
        let result = intake
            .stock_cleared_donation(&record(DonationStatus::Processed, true, 1))
            .await;
        assert_eq!(
            result,
            Err(ApplicationError::DomainError(DomainError::InvalidExpiryDate))
        );
    }
}
