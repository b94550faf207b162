use crate::application::ApplicationError;
use crate::domain::model::{
    status_for_utilization, BloodBankId, BloodGroup, BloodStock, StockStatus, StockThresholds,
};
use crate::domain::port::BloodStockRepository;
use std::sync::Arc;

/// 在庫集計の絞り込み条件
/// 空の条件はすべての在庫レコードに一致する
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockQuery {
    pub blood_bank: Option<BloodBankId>,
    pub blood_group: Option<BloodGroup>,
}

impl StockQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_bank(blood_bank: BloodBankId) -> Self {
        Self {
            blood_bank: Some(blood_bank),
            blood_group: None,
        }
    }

    pub fn for_group(blood_group: BloodGroup) -> Self {
        Self {
            blood_bank: None,
            blood_group: Some(blood_group),
        }
    }

    fn matches(&self, stock: &BloodStock) -> bool {
        self.blood_bank.map_or(true, |bank| stock.blood_bank() == bank)
            && self
                .blood_group
                .map_or(true, |group| stock.blood_group() == group)
    }
}

/// 低在庫一覧の1行
#[derive(Debug, Clone, PartialEq)]
pub struct LowStockEntry {
    pub blood_group: BloodGroup,
    pub blood_bank: BloodBankId,
    pub current_stock: u32,
    pub utilization: f64,
    pub status: StockStatus,
}

impl From<&BloodStock> for LowStockEntry {
    fn from(stock: &BloodStock) -> Self {
        Self {
            blood_group: stock.blood_group(),
            blood_bank: stock.blood_bank(),
            current_stock: stock.current_stock(),
            utilization: stock.utilization(),
            status: stock.status(),
        }
    }
}

/// 絞り込み条件に一致する在庫の合計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockSummary {
    pub total_stock: u64,
    pub total_capacity: u64,
    pub low_stock_count: usize,
}

/// 血液型ごとの全体在庫
#[derive(Debug, Clone, PartialEq)]
pub struct BloodGroupSummary {
    pub blood_group: BloodGroup,
    pub total_stock: u64,
    pub total_capacity: u64,
    pub average_utilization: f64,
    pub blood_bank_count: usize,
    /// 平均利用率とデフォルト閾値から導出
    pub status: StockStatus,
}

/// ステータス別の件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCount {
    pub critical: usize,
    pub low: usize,
    pub adequate: usize,
    pub total: usize,
}

/// 在庫レポートサービス
/// 読み取り専用の集計ビューを提供する
pub struct StockReportService {
    repository: Arc<dyn BloodStockRepository>,
}

impl StockReportService {
    /// 新しいレポートサービスを作成
    ///
    /// # Arguments
    /// * `repository` - 血液在庫リポジトリ
    pub fn new(repository: Arc<dyn BloodStockRepository>) -> Self {
        Self { repository }
    }

    /// 全体の低在庫一覧
    /// 利用率の昇順（最も危険なものが先頭）、同率は作成順
    ///
    /// # Returns
    /// * `Ok(Vec<LowStockEntry>)` - 低水準以下の在庫
    /// * `Err(ApplicationError)` - 取得失敗
    pub async fn system_wide_low_stock(&self) -> Result<Vec<LowStockEntry>, ApplicationError> {
        let stocks = self.repository.find_all().await?;
        let mut entries: Vec<LowStockEntry> = stocks
            .iter()
            .filter(|stock| stock.is_low_stock())
            .map(LowStockEntry::from)
            .collect();
        // sort_by は安定ソート
        entries.sort_by(|a, b| a.utilization.total_cmp(&b.utilization));
        Ok(entries)
    }

    /// 血液銀行の低在庫一覧（血液型順）
    pub async fn low_stock_for_bank(
        &self,
        blood_bank: BloodBankId,
    ) -> Result<Vec<LowStockEntry>, ApplicationError> {
        let mut entries: Vec<LowStockEntry> = self
            .repository
            .find_by_blood_bank(blood_bank)
            .await?
            .iter()
            .filter(|stock| stock.is_low_stock())
            .map(LowStockEntry::from)
            .collect();
        entries.sort_by(|a, b| a.blood_group.as_str().cmp(b.blood_group.as_str()));
        Ok(entries)
    }

    /// 絞り込み条件に一致する在庫の合計
    /// 低在庫数は各レコード自身の低水準で判定する
    pub async fn summary_by_query(&self, query: StockQuery) -> Result<StockSummary, ApplicationError> {
        let stocks = self.matching(query).await?;
        Ok(stocks.iter().fold(StockSummary::default(), |mut summary, stock| {
            summary.total_stock += u64::from(stock.current_stock());
            summary.total_capacity += u64::from(stock.capacity());
            if stock.is_low_stock() {
                summary.low_stock_count += 1;
            }
            summary
        }))
    }

    /// ステータス別の件数
    pub async fn status_count(&self, query: StockQuery) -> Result<StatusCount, ApplicationError> {
        let stocks = self.matching(query).await?;
        let mut count = StatusCount {
            total: stocks.len(),
            ..StatusCount::default()
        };
        for stock in &stocks {
            match stock.status() {
                StockStatus::Critical => count.critical += 1,
                StockStatus::Low => count.low += 1,
                StockStatus::Adequate => count.adequate += 1,
            }
        }
        Ok(count)
    }

    /// 血液型ごとの全体在庫
    /// 在庫レコードが存在する血液型のみ、血液型の定義順で返す
    pub async fn by_blood_group(&self) -> Result<Vec<BloodGroupSummary>, ApplicationError> {
        let stocks = self.repository.find_all().await?;
        let summaries = BloodGroup::ALL
            .iter()
            .filter_map(|group| {
                let group_stocks: Vec<&BloodStock> = stocks
                    .iter()
                    .filter(|stock| stock.blood_group() == *group)
                    .collect();
                summarize_group(*group, &group_stocks)
            })
            .collect();
        Ok(summaries)
    }

    /// `by_blood_group` の別名（全体在庫ダッシュボード用）
    pub async fn system_wide_inventory(&self) -> Result<Vec<BloodGroupSummary>, ApplicationError> {
        self.by_blood_group().await
    }

    async fn matching(&self, query: StockQuery) -> Result<Vec<BloodStock>, ApplicationError> {
        let stocks = match query.blood_bank {
            Some(bank) => self.repository.find_by_blood_bank(bank).await?,
            None => self.repository.find_all().await?,
        };
        Ok(stocks
            .into_iter()
            .filter(|stock| query.matches(stock))
            .collect())
    }
}

fn summarize_group(blood_group: BloodGroup, stocks: &[&BloodStock]) -> Option<BloodGroupSummary> {
    if stocks.is_empty() {
        return None;
    }
    let total_stock: u64 = stocks.iter().map(|s| u64::from(s.current_stock())).sum();
    let total_capacity: u64 = stocks.iter().map(|s| u64::from(s.capacity())).sum();
    let average_utilization =
        stocks.iter().map(|s| s.utilization()).sum::<f64>() / stocks.len() as f64;
    let mut banks: Vec<BloodBankId> = stocks.iter().map(|s| s.blood_bank()).collect();
    banks.sort_by_key(|bank| bank.as_uuid());
    banks.dedup();

    Some(BloodGroupSummary {
        blood_group,
        total_stock,
        total_capacity,
        average_utilization,
        blood_bank_count: banks.len(),
        status: status_for_utilization(average_utilization, StockThresholds::default()),
    })
}
