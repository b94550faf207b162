// 在庫ステータス導出
// 状態を持たない純粋関数のみ

use crate::domain::model::StockThresholds;
use serde::{Deserialize, Serialize};

use std::fmt;

/// 在庫ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    /// 危険水準以下
    Critical,
    /// 低水準以下
    Low,
    /// 十分
    Adequate,
}

impl StockStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Critical => "critical",
            StockStatus::Low => "low",
            StockStatus::Adequate => "adequate",
        }
    }
}

impl fmt::Display for StockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 容量に対する在庫の割合（%）
/// 容量0の場合は0とする
pub fn utilization(current_stock: u32, capacity: u32) -> f64 {
    if capacity == 0 {
        return 0.0;
    }
    current_stock as f64 / capacity as f64 * 100.0
}

/// 在庫数が容量の `level`% 以下かどうか
/// 境界で丸め誤差が出ないよう整数で比較する。容量0は利用率0とみなす
pub fn at_or_below_level(current_stock: u32, capacity: u32, level: u32) -> bool {
    if capacity == 0 {
        return true;
    }
    u64::from(current_stock) * 100 <= u64::from(level) * u64::from(capacity)
}

/// 在庫数・容量・閾値からステータスを導出
pub fn derive_status(current_stock: u32, capacity: u32, thresholds: StockThresholds) -> StockStatus {
    if at_or_below_level(current_stock, capacity, thresholds.critical_level()) {
        StockStatus::Critical
    } else if at_or_below_level(current_stock, capacity, thresholds.low_level()) {
        StockStatus::Low
    } else {
        StockStatus::Adequate
    }
}

/// 割合と閾値からステータスを導出（平均利用率など割合しかない集計用）
pub fn status_for_utilization(utilization: f64, thresholds: StockThresholds) -> StockStatus {
    if utilization <= thresholds.critical_level() as f64 {
        StockStatus::Critical
    } else if utilization <= thresholds.low_level() as f64 {
        StockStatus::Low
    } else {
        StockStatus::Adequate
    }
}
