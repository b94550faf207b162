use crate::application::service::{
    BloodGroupSummary, LowStockEntry, StatusCount, StockSummary,
};
use crate::domain::model::{BloodStock, ExpiryBatch, StockAlert};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// 在庫レコード用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct StockRecordResponse {
    pub blood_bank: String,
    pub blood_group: String,
    pub current_stock: u32,
    pub reserved_stock: u32,
    pub available_stock: u32,
    pub capacity: u32,
    pub critical_level: u32,
    pub low_level: u32,
    pub utilization: f64,
    pub status: String,
    pub expiry_batches: Vec<ExpiryBatchResponse>,
    pub alerts: Vec<AlertResponse>,
    pub last_updated: String,
}

/// 有効期限バッチ用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct ExpiryBatchResponse {
    pub units: u32,
    pub expiry_date: String,
    pub donation_id: String,
}

/// アラート用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    #[serde(rename = "type")]
    pub alert_type: String,
    pub message: String,
    pub severity: String,
    pub created_at: String,
    pub resolved: bool,
}

/// 低在庫一覧の1行
#[derive(Debug, Serialize)]
pub struct LowStockResponse {
    pub blood_group: String,
    pub blood_bank: String,
    pub current_stock: u32,
    pub utilization: f64,
    pub status: String,
}

/// 血液型ごとの全体在庫
#[derive(Debug, Serialize)]
pub struct BloodGroupSummaryResponse {
    pub blood_group: String,
    pub total_stock: u64,
    pub total_capacity: u64,
    pub average_utilization: f64,
    pub blood_bank_count: usize,
    pub status: String,
}

/// 全体在庫レポート用のレスポンスDTO
#[derive(Debug, Serialize)]
pub struct StockReportResponse {
    pub generated_at: String,
    pub total_stock: u64,
    pub total_capacity: u64,
    pub low_stock_count: usize,
    pub status_count: StatusCountResponse,
    pub low_stock: Vec<LowStockResponse>,
    pub by_blood_group: Vec<BloodGroupSummaryResponse>,
}

/// ステータス別件数
#[derive(Debug, Serialize)]
pub struct StatusCountResponse {
    pub critical: usize,
    pub low: usize,
    pub adequate: usize,
    pub total: usize,
}

impl StockRecordResponse {
    /// ドメインオブジェクトからStockRecordResponseを作成
    pub fn from_stock(stock: &BloodStock) -> Self {
        Self {
            blood_bank: stock.blood_bank().to_string(),
            blood_group: stock.blood_group().to_string(),
            current_stock: stock.current_stock(),
            reserved_stock: stock.reserved_stock(),
            available_stock: stock.available_stock(),
            capacity: stock.capacity(),
            critical_level: stock.thresholds().critical_level(),
            low_level: stock.thresholds().low_level(),
            utilization: stock.utilization(),
            status: stock.status().to_string(),
            expiry_batches: stock
                .expiry_batches()
                .iter()
                .map(ExpiryBatchResponse::from_batch)
                .collect(),
            alerts: stock.alerts().iter().map(AlertResponse::from_alert).collect(),
            last_updated: stock.last_updated().to_rfc3339(),
        }
    }
}

impl ExpiryBatchResponse {
    pub fn from_batch(batch: &ExpiryBatch) -> Self {
        Self {
            units: batch.units(),
            expiry_date: batch.expiry_date().to_rfc3339(),
            donation_id: batch.donation_id().to_string(),
        }
    }
}

impl AlertResponse {
    pub fn from_alert(alert: &StockAlert) -> Self {
        Self {
            alert_type: alert.alert_type().as_str().to_string(),
            message: alert.message().to_string(),
            severity: alert.severity().as_str().to_string(),
            created_at: alert.created_at().to_rfc3339(),
            resolved: alert.is_resolved(),
        }
    }
}

impl LowStockResponse {
    pub fn from_entry(entry: &LowStockEntry) -> Self {
        Self {
            blood_group: entry.blood_group.to_string(),
            blood_bank: entry.blood_bank.to_string(),
            current_stock: entry.current_stock,
            utilization: entry.utilization,
            status: entry.status.to_string(),
        }
    }
}

impl BloodGroupSummaryResponse {
    pub fn from_summary(summary: &BloodGroupSummary) -> Self {
        Self {
            blood_group: summary.blood_group.to_string(),
            total_stock: summary.total_stock,
            total_capacity: summary.total_capacity,
            average_utilization: summary.average_utilization,
            blood_bank_count: summary.blood_bank_count,
            status: summary.status.to_string(),
        }
    }
}

impl StockReportResponse {
    /// 集計結果からStockReportResponseを作成
    pub fn new(
        generated_at: DateTime<Utc>,
        summary: StockSummary,
        status_count: StatusCount,
        low_stock: &[LowStockEntry],
        by_blood_group: &[BloodGroupSummary],
    ) -> Self {
        Self {
            generated_at: generated_at.to_rfc3339(),
            total_stock: summary.total_stock,
            total_capacity: summary.total_capacity,
            low_stock_count: summary.low_stock_count,
            status_count: StatusCountResponse {
                critical: status_count.critical,
                low: status_count.low,
                adequate: status_count.adequate,
                total: status_count.total,
            },
            low_stock: low_stock.iter().map(LowStockResponse::from_entry).collect(),
            by_blood_group: by_blood_group
                .iter()
                .map(BloodGroupSummaryResponse::from_summary)
                .collect(),
        }
    }
}
