use crate::domain::error::DomainError;
use crate::domain::model::DonationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;

/// 手動在庫補正の操作種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryOperation {
    Add,
    Remove,
}

impl InventoryOperation {
    /// 文字列からInventoryOperationを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "add" => Ok(InventoryOperation::Add),
            "remove" => Ok(InventoryOperation::Remove),
            _ => Err(DomainError::InvalidValue(format!(
                "無効な操作です。\"add\" または \"remove\" を指定してください: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for InventoryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryOperation::Add => write!(f, "add"),
            InventoryOperation::Remove => write!(f, "remove"),
        }
    }
}

/// 在庫レコードへの変更コマンド
/// リポジトリはレコード単位の排他区間内でこれを適用する
#[derive(Debug, Clone, PartialEq)]
pub enum StockMutation {
    /// 検査済み献血からの入庫
    AddFromDonation {
        units: u32,
        expiry_date: DateTime<Utc>,
        donation_id: DonationId,
    },
    /// 輸血依頼の充足による出庫
    RemoveForRequest { units: u32 },
    /// 管理者による手動補正
    ManualAdjustment {
        units: u32,
        operation: InventoryOperation,
        raise_alert: bool,
    },
    /// 緊急依頼向けの引当
    Reserve { units: u32 },
    /// 引当の解除
    ReleaseReservation { units: u32 },
    /// アラートを解決済みにする
    ResolveAlert { index: usize },
}

impl StockMutation {
    /// ストアに触れる前の入力検証
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        match self {
            StockMutation::AddFromDonation {
                units, expiry_date, ..
            } => {
                ensure_positive(*units)?;
                if *expiry_date <= now {
                    return Err(DomainError::InvalidExpiryDate);
                }
                Ok(())
            }
            StockMutation::RemoveForRequest { units }
            | StockMutation::ManualAdjustment { units, .. }
            | StockMutation::Reserve { units }
            | StockMutation::ReleaseReservation { units } => ensure_positive(*units),
            StockMutation::ResolveAlert { .. } => Ok(()),
        }
    }

    /// ログ出力用の操作名
    pub fn name(&self) -> &'static str {
        match self {
            StockMutation::AddFromDonation { .. } => "add_stock_from_donation",
            StockMutation::RemoveForRequest { .. } => "remove_stock",
            StockMutation::ManualAdjustment { .. } => "update_inventory",
            StockMutation::Reserve { .. } => "reserve_stock",
            StockMutation::ReleaseReservation { .. } => "release_reservation",
            StockMutation::ResolveAlert { .. } => "resolve_alert",
        }
    }
}

fn ensure_positive(units: u32) -> Result<(), DomainError> {
    if units == 0 {
        return Err(DomainError::InvalidQuantity);
    }
    Ok(())
}
