use blood_stock_ledger::adapter::driven::{InMemoryBloodStockRepository, TracingLogger};
use blood_stock_ledger::application::service::{
    BloodStockLedgerService, DonationIntakeService, DonationRecord, DonationStatus, LedgerPolicy,
    StockQuery, StockReportService,
};
use blood_stock_ledger::application::ApplicationError;
use blood_stock_ledger::domain::error::DomainError;
use blood_stock_ledger::domain::model::{
    AlertSeverity, AlertType, BloodBankId, BloodGroup, BloodStock, DonationId,
    InventoryOperation, RequestId, StockKey, StockStatus, StockThresholds,
};
use blood_stock_ledger::domain::port::{BloodStockRepository, Clock};

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use tokio::sync::Barrier;

struct FixedClock(DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap()
}

// テスト用ヘルパー
struct Fixture {
    repository: Arc<InMemoryBloodStockRepository>,
    ledger: Arc<BloodStockLedgerService>,
    reports: StockReportService,
}

fn fixture(policy: LedgerPolicy) -> Fixture {
    let repository = Arc::new(InMemoryBloodStockRepository::new());
    let ledger = Arc::new(BloodStockLedgerService::new(
        repository.clone(),
        Arc::new(FixedClock(now())),
        Arc::new(TracingLogger::new()),
        policy,
    ));
    let reports = StockReportService::new(repository.clone());
    Fixture {
        repository,
        ledger,
        reports,
    }
}

fn seed(repository: &InMemoryBloodStockRepository, bank: BloodBankId, group: BloodGroup, current: u32) {
    repository
        .seed(BloodStock::with_levels(
            bank,
            group,
            current,
            100,
            StockThresholds::default(),
            now(),
        ))
        .unwrap();
}

#[tokio::test]
async fn test_remove_into_critical_scenario() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();
    seed(&f.repository, bank, BloodGroup::OPositive, 20);
    assert_eq!(
        f.ledger.get(bank, BloodGroup::OPositive).await.unwrap().status(),
        StockStatus::Low
    );

    let stock = f
        .ledger
        .remove_stock(bank, BloodGroup::OPositive, 15, RequestId::new())
        .await
        .unwrap();

    assert_eq!(stock.current_stock(), 5);
    assert_eq!(stock.utilization(), 5.0);
    assert_eq!(stock.status(), StockStatus::Critical);
    assert_eq!(stock.alerts().len(), 1);
    assert_eq!(stock.alerts()[0].alert_type(), AlertType::LowStock);
    assert_eq!(stock.alerts()[0].severity(), AlertSeverity::High);
    assert!(!stock.alerts()[0].is_resolved());
}

#[tokio::test]
async fn test_donation_scenario() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();
    seed(&f.repository, bank, BloodGroup::OPositive, 20);
    let donation_id = DonationId::new();

    let stock = f
        .ledger
        .add_stock_from_donation(
            bank,
            BloodGroup::OPositive,
            30,
            now() + Duration::days(42),
            donation_id,
        )
        .await
        .unwrap();

    assert_eq!(stock.current_stock(), 50);
    assert_eq!(stock.expiry_batches().len(), 1);
    assert_eq!(stock.expiry_batches()[0].donation_id(), donation_id);
    assert!(stock.alerts().is_empty());
}

#[tokio::test]
async fn test_insufficient_stock_scenario() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();
    seed(&f.repository, bank, BloodGroup::OPositive, 20);
    let before = f.ledger.get(bank, BloodGroup::OPositive).await.unwrap();

    let result = f
        .ledger
        .remove_stock(bank, BloodGroup::OPositive, 25, RequestId::new())
        .await;

    assert_eq!(
        result,
        Err(ApplicationError::DomainError(DomainError::InsufficientStock {
            available: 20,
            requested: 25
        }))
    );
    assert_eq!(f.ledger.get(bank, BloodGroup::OPositive).await.unwrap(), before);
}

#[tokio::test]
async fn test_reads_are_idempotent() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();
    seed(&f.repository, bank, BloodGroup::BNegative, 37);

    let first = f.ledger.get(bank, BloodGroup::BNegative).await.unwrap();
    let second = f.ledger.get(bank, BloodGroup::BNegative).await.unwrap();
    assert_eq!(first.status(), second.status());
    assert_eq!(first.utilization(), second.utilization());
}

#[tokio::test]
async fn test_reservation_limits_removal() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();
    seed(&f.repository, bank, BloodGroup::ANegative, 10);

    f.ledger
        .reserve_stock(bank, BloodGroup::ANegative, 8)
        .await
        .unwrap();
    let result = f
        .ledger
        .remove_stock(bank, BloodGroup::ANegative, 3, RequestId::new())
        .await;
    assert_eq!(
        result,
        Err(ApplicationError::DomainError(DomainError::InsufficientStock {
            available: 2,
            requested: 3
        }))
    );

    let stock = f
        .ledger
        .release_reservation(bank, BloodGroup::ANegative, 8)
        .await
        .unwrap();
    assert_eq!(stock.available_stock(), 10);
    assert!(f
        .ledger
        .release_reservation(bank, BloodGroup::ANegative, 1)
        .await
        .is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_find_or_create_yields_one_record() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();
    let tasks = 16;
    let barrier = Arc::new(Barrier::new(tasks));

    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let ledger = f.ledger.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                ledger.find_or_create(bank, BloodGroup::AbNegative).await
            })
        })
        .collect();
    let mut seen = Vec::new();
    for handle in handles {
        seen.push(handle.await.unwrap().unwrap());
    }

    // どのタスクも同じレコードを受け取る
    assert!(seen.iter().all(|stock| *stock == seen[0]));
    let stocks = f.repository.find_all().await.unwrap();
    assert_eq!(stocks.len(), 1);
    assert_eq!(stocks[0].key(), StockKey::new(bank, BloodGroup::AbNegative));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_removals_never_overdraw() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();
    seed(&f.repository, bank, BloodGroup::OPositive, 10);
    let tasks = 25;
    let barrier = Arc::new(Barrier::new(tasks));

    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let ledger = f.ledger.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                ledger
                    .remove_stock(bank, BloodGroup::OPositive, 1, RequestId::new())
                    .await
            })
        })
        .collect();

    let mut succeeded = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ApplicationError::DomainError(DomainError::InsufficientStock { available, .. })) => {
                assert_eq!(available, 0);
                rejected += 1;
            }
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    assert_eq!(succeeded, 10);
    assert_eq!(rejected, 15);
    let stock = f.ledger.get(bank, BloodGroup::OPositive).await.unwrap();
    assert_eq!(stock.current_stock(), 0);
    // 20%以下になった出庫ごとにアラートが1件ずつ
    assert_eq!(stock.alerts().len(), 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_are_not_lost() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();
    let tasks = 20;
    let barrier = Arc::new(Barrier::new(tasks));

    let handles: Vec<_> = (0..tasks)
        .map(|_| {
            let ledger = f.ledger.clone();
            let barrier = barrier.clone();
            tokio::spawn(async move {
                barrier.wait().await;
                ledger
                    .add_stock_from_donation(
                        bank,
                        BloodGroup::BPositive,
                        2,
                        now() + Duration::days(42),
                        DonationId::new(),
                    )
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stock = f.ledger.get(bank, BloodGroup::BPositive).await.unwrap();
    assert_eq!(stock.current_stock(), 40);
    assert_eq!(stock.expiry_batches().len(), 20);
}

#[tokio::test]
async fn test_manual_removal_asymmetry_is_configurable() {
    let bank = BloodBankId::new();

    let quiet = fixture(LedgerPolicy::default());
    seed(&quiet.repository, bank, BloodGroup::APositive, 20);
    let stock = quiet
        .ledger
        .update_inventory(bank, BloodGroup::APositive, 15, InventoryOperation::Remove)
        .await
        .unwrap();
    assert_eq!(stock.current_stock(), 5);
    assert!(stock.alerts().is_empty());

    let alerting = fixture(LedgerPolicy {
        raise_alert_on_manual_removal: true,
        ..LedgerPolicy::default()
    });
    seed(&alerting.repository, bank, BloodGroup::APositive, 20);
    let stock = alerting
        .ledger
        .update_inventory(bank, BloodGroup::APositive, 15, InventoryOperation::Remove)
        .await
        .unwrap();
    assert_eq!(stock.alerts().len(), 1);
    assert_eq!(stock.alerts()[0].severity(), AlertSeverity::High);
}

#[tokio::test]
async fn test_manual_add_creates_record_without_batch() {
    let f = fixture(LedgerPolicy::default());
    let bank = BloodBankId::new();

    let stock = f
        .ledger
        .update_inventory(bank, BloodGroup::ONegative, 130, InventoryOperation::Add)
        .await
        .unwrap();

    // 容量超過は許容される
    assert_eq!(stock.current_stock(), 130);
    assert_eq!(stock.capacity(), 100);
    assert!(stock.expiry_batches().is_empty());
    assert_eq!(stock.status(), StockStatus::Adequate);
}

#[tokio::test]
async fn test_donation_intake_feeds_reports() {
    let f = fixture(LedgerPolicy::default());
    let intake = DonationIntakeService::new(f.ledger.clone());
    let bank = BloodBankId::new();

    for (status, is_safe) in [
        (DonationStatus::Completed, true),
        (DonationStatus::Processed, true),
        (DonationStatus::Completed, false),
        (DonationStatus::Scheduled, true),
    ] {
        intake
            .stock_cleared_donation(&DonationRecord {
                donation_id: DonationId::new(),
                blood_bank: bank,
                blood_group: BloodGroup::OPositive,
                units_donated: 1,
                donation_date: now() - Duration::days(1),
                expiry_date: None,
                status,
                is_safe,
            })
            .await
            .unwrap();
    }

    let summary = f.reports.summary_by_query(StockQuery::for_bank(bank)).await.unwrap();
    assert_eq!(summary.total_stock, 2);
    assert_eq!(summary.total_capacity, 100);
    assert_eq!(summary.low_stock_count, 1);

    let low = f.reports.system_wide_low_stock().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].status, StockStatus::Critical);

    let expiring = f
        .ledger
        .expiring_soon(bank, BloodGroup::OPositive, Some(41))
        .await
        .unwrap();
    assert_eq!(expiring.len(), 2);
    assert!(f
        .ledger
        .expiring_soon(bank, BloodGroup::OPositive, None)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_reports_across_banks() {
    let f = fixture(LedgerPolicy::default());
    let bank_a = BloodBankId::new();
    let bank_b = BloodBankId::new();
    seed(&f.repository, bank_a, BloodGroup::APositive, 15);
    seed(&f.repository, bank_a, BloodGroup::BPositive, 60);
    seed(&f.repository, bank_b, BloodGroup::APositive, 5);

    let count = f.reports.status_count(StockQuery::all()).await.unwrap();
    assert_eq!((count.critical, count.low, count.adequate, count.total), (1, 1, 1, 3));

    let groups = f.reports.by_blood_group().await.unwrap();
    let a_positive = groups
        .iter()
        .find(|g| g.blood_group == BloodGroup::APositive)
        .unwrap();
    assert_eq!(a_positive.total_stock, 20);
    assert_eq!(a_positive.blood_bank_count, 2);
    assert_eq!(a_positive.average_utilization, 10.0);
    assert_eq!(a_positive.status, StockStatus::Critical);

    let bank_a_low = f.reports.low_stock_for_bank(bank_a).await.unwrap();
    assert_eq!(bank_a_low.len(), 1);
    assert_eq!(bank_a_low[0].blood_group, BloodGroup::APositive);
}
