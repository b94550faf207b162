use blood_stock_ledger::adapter::driven::{MySqlBloodStockRepository, SystemClock};
use blood_stock_ledger::adapter::driver::response_dto::StockReportResponse;
use blood_stock_ledger::adapter::{DatabaseConfig, DatabaseMigration};
use blood_stock_ledger::application::service::{StockQuery, StockReportService};
use blood_stock_ledger::domain::port::{BloodStockRepository, Clock};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む（RUST_LOG も含むため購読者より先に読む）
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blood_stock_ledger=info,blood_stock_report=info,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // 設定を読み込む
    let config = DatabaseConfig::from_env()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        database = %config.database,
        "データベース設定を読み込みました"
    );

    // 接続プールを作成
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.connection_string())
        .await?;
    tracing::info!("データベース接続プールを作成しました");

    // マイグレーションを実行
    DatabaseMigration::new(pool.clone()).run().await?;

    let repository: Arc<dyn BloodStockRepository> =
        Arc::new(MySqlBloodStockRepository::new(pool.clone()));
    let reports = StockReportService::new(repository);
    let clock = SystemClock::new();

    let summary = reports.summary_by_query(StockQuery::all()).await?;
    let status_count = reports.status_count(StockQuery::all()).await?;
    let low_stock = reports.system_wide_low_stock().await?;
    let by_blood_group = reports.system_wide_inventory().await?;

    if !low_stock.is_empty() {
        tracing::warn!(count = low_stock.len(), "低在庫の血液在庫があります");
    }

    let report = StockReportResponse::new(
        clock.now(),
        summary,
        status_count,
        &low_stock,
        &by_blood_group,
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    pool.close().await;
    Ok(())
}
