use crate::domain::model::{BloodBankId, BloodStock, StockKey, StockMutation};
use crate::domain::port::{BloodStockRepository, RepositoryError, StockUpdateError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Store {
    records: HashMap<StockKey, BloodStock>,
    // 作成順
    order: Vec<StockKey>,
}

impl Store {
    fn insert(&mut self, stock: BloodStock) {
        let key = stock.key();
        if self.records.insert(key, stock).is_none() {
            self.order.push(key);
        }
    }

    fn ordered<'a>(&'a self) -> impl Iterator<Item = &'a BloodStock> + 'a {
        self.order.iter().filter_map(|key| self.records.get(key))
    }
}

/// インメモリ血液在庫リポジトリ
/// 1つのロックですべての読み書きを直列化する
#[derive(Default)]
pub struct InMemoryBloodStockRepository {
    store: Mutex<Store>,
}

impl InMemoryBloodStockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の在庫レコードを投入する（初期データ・テスト用）
    /// 同じキーのレコードは置き換える
    pub fn seed(&self, stock: BloodStock) -> Result<(), RepositoryError> {
        self.lock()?.insert(stock);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|e| RepositoryError::OperationFailed(format!("ストアのロックに失敗しました: {}", e)))
    }
}

#[async_trait]
impl BloodStockRepository for InMemoryBloodStockRepository {
    async fn find_or_create(
        &self,
        key: StockKey,
        now: DateTime<Utc>,
    ) -> Result<BloodStock, RepositoryError> {
        let mut store = self.lock()?;
        if let Some(stock) = store.records.get(&key) {
            return Ok(stock.clone());
        }
        let stock = BloodStock::new(key.blood_bank, key.blood_group, now);
        store.insert(stock.clone());
        Ok(stock)
    }

    async fn find_by_key(&self, key: StockKey) -> Result<Option<BloodStock>, RepositoryError> {
        Ok(self.lock()?.records.get(&key).cloned())
    }

    async fn find_by_blood_bank(
        &self,
        blood_bank: BloodBankId,
    ) -> Result<Vec<BloodStock>, RepositoryError> {
        let store = self.lock()?;
        Ok(store
            .ordered()
            .filter(|stock| stock.blood_bank() == blood_bank)
            .cloned()
            .collect())
    }

    async fn find_all(&self) -> Result<Vec<BloodStock>, RepositoryError> {
        Ok(self.lock()?.ordered().cloned().collect())
    }

    async fn apply_mutation(
        &self,
        key: StockKey,
        mutation: &StockMutation,
        now: DateTime<Utc>,
    ) -> Result<BloodStock, StockUpdateError> {
        let mut store = self.lock()?;
        // 作業用コピーに適用し、成功した場合のみ書き戻す
        let mut stock = store
            .records
            .get(&key)
            .cloned()
            .unwrap_or_else(|| BloodStock::new(key.blood_bank, key.blood_group, now));
        stock.apply(mutation, now)?;
        store.insert(stock.clone());
        Ok(stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::DomainError;
    use crate::domain::model::{BloodGroup, InventoryOperation, StockThresholds};

    fn key(bank: BloodBankId, group: BloodGroup) -> StockKey {
        StockKey::new(bank, group)
    }

    #[tokio::test]
    async fn test_find_or_create_returns_same_record() {
        let repository = InMemoryBloodStockRepository::new();
        let bank = BloodBankId::new();
        let first_touch = Utc::now();

        let created = repository
            .find_or_create(key(bank, BloodGroup::APositive), first_touch)
            .await
            .unwrap();
        let found = repository
            .find_or_create(key(bank, BloodGroup::APositive), Utc::now())
            .await
            .unwrap();

        assert_eq!(created, found);
        assert_eq!(found.last_updated(), first_touch);
        assert_eq!(repository.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_find_all_keeps_creation_order() {
        let repository = InMemoryBloodStockRepository::new();
        let bank = BloodBankId::new();
        let groups = [BloodGroup::ONegative, BloodGroup::APositive, BloodGroup::BPositive];
        for group in groups {
            repository
                .find_or_create(key(bank, group), Utc::now())
                .await
                .unwrap();
        }

        let stored: Vec<BloodGroup> = repository
            .find_all()
            .await
            .unwrap()
            .iter()
            .map(|stock| stock.blood_group())
            .collect();
        assert_eq!(stored, groups.to_vec());
    }

    #[tokio::test]
    async fn test_rejected_mutation_leaves_store_untouched() {
        let repository = InMemoryBloodStockRepository::new();
        let bank = BloodBankId::new();
        repository
            .seed(BloodStock::with_levels(
                bank,
                BloodGroup::OPositive,
                20,
                100,
                StockThresholds::default(),
                Utc::now(),
            ))
            .unwrap();
        let before = repository
            .find_by_key(key(bank, BloodGroup::OPositive))
            .await
            .unwrap();

        let result = repository
            .apply_mutation(
                key(bank, BloodGroup::OPositive),
                &StockMutation::RemoveForRequest { units: 25 },
                Utc::now(),
            )
            .await;
        assert_eq!(
            result,
            Err(StockUpdateError::Rejected(DomainError::InsufficientStock {
                available: 20,
                requested: 25
            }))
        );

        let after = repository
            .find_by_key(key(bank, BloodGroup::OPositive))
            .await
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_rejected_mutation_does_not_create_record() {
        let repository = InMemoryBloodStockRepository::new();
        let result = repository
            .apply_mutation(
                key(BloodBankId::new(), BloodGroup::ANegative),
                &StockMutation::ManualAdjustment {
                    units: 3,
                    operation: InventoryOperation::Remove,
                    raise_alert: false,
                },
                Utc::now(),
            )
            .await;
        assert!(result.is_err());
        assert!(repository.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_blood_bank_filters() {
        let repository = InMemoryBloodStockRepository::new();
        let bank = BloodBankId::new();
        repository
            .find_or_create(key(bank, BloodGroup::APositive), Utc::now())
            .await
            .unwrap();
        repository
            .find_or_create(key(BloodBankId::new(), BloodGroup::APositive), Utc::now())
            .await
            .unwrap();

        let stocks = repository.find_by_blood_bank(bank).await.unwrap();
        assert_eq!(stocks.len(), 1);
        assert_eq!(stocks[0].blood_bank(), bank);
    }
}
