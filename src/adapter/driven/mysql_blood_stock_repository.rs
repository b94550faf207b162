use crate::adapter::database_error::DatabaseError;
use crate::domain::model::{
    AlertSeverity, AlertType, BloodBankId, BloodGroup, BloodStock, DonationId, ExpiryBatch,
    StockAlert, StockKey, StockMutation, StockThresholds,
};
use crate::domain::port::{BloodStockRepository, RepositoryError, StockUpdateError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

// MySQL関連のインポート
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlConnection, Pool, Row};

const STOCK_COLUMNS: &str = "id, blood_bank_id, blood_group, current_stock, reserved_stock, \
     capacity, critical_level, low_level, last_updated";

/// MySQL血液在庫リポジトリ
/// (blood_bank_id, blood_group) の一意キーでUPSERTし、
/// 更新は SELECT ... FOR UPDATE による行ロック下で行う
#[derive(Clone)]
pub struct MySqlBloodStockRepository {
    pool: Pool<MySql>,
}

impl MySqlBloodStockRepository {
    /// 新しいMySQL血液在庫リポジトリを作成
    ///
    /// # Arguments
    /// * `pool` - MySQLコネクションプール
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<MySql>, DatabaseError> {
        self.pool
            .acquire()
            .await
            .map_err(|e| DatabaseError::ConnectionError(format!("接続の取得に失敗しました: {}", e)))
    }
}

/// 在庫レコードが無ければ作成する
/// 既存レコードには何もしない
async fn upsert_empty(
    conn: &mut MySqlConnection,
    key: StockKey,
    now: DateTime<Utc>,
) -> Result<(), DatabaseError> {
    let empty = BloodStock::new(key.blood_bank, key.blood_group, now);
    sqlx::query(
        r#"
        INSERT INTO blood_stocks
            (blood_bank_id, blood_group, current_stock, reserved_stock, capacity,
             critical_level, low_level, last_updated)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        ON DUPLICATE KEY UPDATE id = id
        "#,
    )
    .bind(key.blood_bank.to_string())
    .bind(key.blood_group.as_str())
    .bind(empty.current_stock())
    .bind(empty.reserved_stock())
    .bind(empty.capacity())
    .bind(empty.thresholds().critical_level())
    .bind(empty.thresholds().low_level())
    .bind(empty.last_updated())
    .execute(&mut *conn)
    .await
    .map_err(|e| DatabaseError::from_query(e, "在庫レコードの作成に失敗しました"))?;
    Ok(())
}

/// キーで在庫レコードを読み込む
/// `for_update` が真なら行ロックを取得する
async fn load_by_key(
    conn: &mut MySqlConnection,
    key: StockKey,
    for_update: bool,
) -> Result<Option<(u64, BloodStock)>, RepositoryError> {
    let sql = format!(
        "SELECT {} FROM blood_stocks WHERE blood_bank_id = ? AND blood_group = ?{}",
        STOCK_COLUMNS,
        if for_update { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query(&sql)
        .bind(key.blood_bank.to_string())
        .bind(key.blood_group.as_str())
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DatabaseError::from_query(e, "在庫レコードの取得に失敗しました"))?;

    match row {
        Some(row) => {
            let id: u64 = row.try_get("id").map_err(fetch_failed)?;
            let stock = load_children(conn, &row).await?;
            Ok(Some((id, stock)))
        }
        None => Ok(None),
    }
}

/// 条件に一致する在庫レコードを作成順に読み込む
async fn load_many(
    conn: &mut MySqlConnection,
    blood_bank: Option<BloodBankId>,
) -> Result<Vec<BloodStock>, RepositoryError> {
    let rows = match blood_bank {
        Some(bank) => {
            let sql = format!(
                "SELECT {} FROM blood_stocks WHERE blood_bank_id = ? ORDER BY id ASC",
                STOCK_COLUMNS
            );
            sqlx::query(&sql)
                .bind(bank.to_string())
                .fetch_all(&mut *conn)
                .await
        }
        None => {
            let sql = format!("SELECT {} FROM blood_stocks ORDER BY id ASC", STOCK_COLUMNS);
            sqlx::query(&sql).fetch_all(&mut *conn).await
        }
    }
    .map_err(|e| DatabaseError::from_query(e, "在庫一覧の取得に失敗しました"))?;

    let mut stocks = Vec::with_capacity(rows.len());
    for row in &rows {
        stocks.push(load_children(conn, row).await?);
    }
    Ok(stocks)
}

/// 有効期限バッチとアラートを読み込んで集約を再構築する
async fn load_children(
    conn: &mut MySqlConnection,
    row: &MySqlRow,
) -> Result<BloodStock, RepositoryError> {
    let id: u64 = row.try_get("id").map_err(fetch_failed)?;

    let batch_rows = sqlx::query(
        "SELECT units, expiry_date, donation_id FROM blood_stock_expiry_batches \
         WHERE blood_stock_id = ? ORDER BY position ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| DatabaseError::from_query(e, "有効期限バッチの取得に失敗しました"))?;

    let alert_rows = sqlx::query(
        "SELECT alert_type, message, severity, created_at, resolved FROM blood_stock_alerts \
         WHERE blood_stock_id = ? ORDER BY position ASC",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| DatabaseError::from_query(e, "アラートの取得に失敗しました"))?;

    let expiry_batches = batch_rows
        .iter()
        .map(batch_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    let alerts = alert_rows
        .iter()
        .map(alert_from_row)
        .collect::<Result<Vec<_>, _>>()?;

    stock_from_row(row, expiry_batches, alerts)
}

fn stock_from_row(
    row: &MySqlRow,
    expiry_batches: Vec<ExpiryBatch>,
    alerts: Vec<StockAlert>,
) -> Result<BloodStock, RepositoryError> {
    let blood_bank = BloodBankId::from_string(row.try_get("blood_bank_id").map_err(fetch_failed)?)
        .map_err(|e| RepositoryError::FetchFailed(format!("血液銀行IDの解析に失敗しました: {}", e)))?;
    let blood_group = BloodGroup::from_string(row.try_get("blood_group").map_err(fetch_failed)?)
        .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;
    let thresholds = StockThresholds::new(
        row.try_get("critical_level").map_err(fetch_failed)?,
        row.try_get("low_level").map_err(fetch_failed)?,
    )
    .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;

    Ok(BloodStock::reconstruct(
        blood_bank,
        blood_group,
        row.try_get("current_stock").map_err(fetch_failed)?,
        row.try_get("reserved_stock").map_err(fetch_failed)?,
        row.try_get("capacity").map_err(fetch_failed)?,
        thresholds,
        expiry_batches,
        alerts,
        row.try_get("last_updated").map_err(fetch_failed)?,
    ))
}

fn batch_from_row(row: &MySqlRow) -> Result<ExpiryBatch, RepositoryError> {
    let donation_id = DonationId::from_string(row.try_get("donation_id").map_err(fetch_failed)?)
        .map_err(|e| RepositoryError::FetchFailed(format!("献血IDの解析に失敗しました: {}", e)))?;
    Ok(ExpiryBatch::new(
        row.try_get("units").map_err(fetch_failed)?,
        row.try_get("expiry_date").map_err(fetch_failed)?,
        donation_id,
    ))
}

fn alert_from_row(row: &MySqlRow) -> Result<StockAlert, RepositoryError> {
    let alert_type = AlertType::from_string(row.try_get("alert_type").map_err(fetch_failed)?)
        .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;
    let severity = AlertSeverity::from_string(row.try_get("severity").map_err(fetch_failed)?)
        .map_err(|e| RepositoryError::FetchFailed(e.to_string()))?;
    Ok(StockAlert::reconstruct(
        alert_type,
        row.try_get("message").map_err(fetch_failed)?,
        severity,
        row.try_get("created_at").map_err(fetch_failed)?,
        row.try_get("resolved").map_err(fetch_failed)?,
    ))
}

fn fetch_failed(e: sqlx::Error) -> RepositoryError {
    RepositoryError::FetchFailed(format!("列の読み取りに失敗しました: {}", e))
}

/// 変更後の集約を書き戻す
/// 子テーブルは削除して入れ直す
async fn store(conn: &mut MySqlConnection, id: u64, stock: &BloodStock) -> Result<(), DatabaseError> {
    sqlx::query(
        r#"
        UPDATE blood_stocks
        SET current_stock = ?, reserved_stock = ?, capacity = ?,
            critical_level = ?, low_level = ?, last_updated = ?
        WHERE id = ?
        "#,
    )
    .bind(stock.current_stock())
    .bind(stock.reserved_stock())
    .bind(stock.capacity())
    .bind(stock.thresholds().critical_level())
    .bind(stock.thresholds().low_level())
    .bind(stock.last_updated())
    .bind(id)
    .execute(&mut *conn)
    .await
    .map_err(|e| DatabaseError::from_query(e, "在庫レコードの更新に失敗しました"))?;

    sqlx::query("DELETE FROM blood_stock_expiry_batches WHERE blood_stock_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| DatabaseError::from_query(e, "有効期限バッチの削除に失敗しました"))?;

    for (position, batch) in stock.expiry_batches().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO blood_stock_expiry_batches
                (blood_stock_id, position, units, expiry_date, donation_id)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(position as u32)
        .bind(batch.units())
        .bind(batch.expiry_date())
        .bind(batch.donation_id().to_string())
        .execute(&mut *conn)
        .await
        .map_err(|e| DatabaseError::from_query(e, "有効期限バッチの保存に失敗しました"))?;
    }

    sqlx::query("DELETE FROM blood_stock_alerts WHERE blood_stock_id = ?")
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| DatabaseError::from_query(e, "アラートの削除に失敗しました"))?;

    for (position, alert) in stock.alerts().iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO blood_stock_alerts
                (blood_stock_id, position, alert_type, message, severity, created_at, resolved)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(position as u32)
        .bind(alert.alert_type().as_str())
        .bind(alert.message())
        .bind(alert.severity().as_str())
        .bind(alert.created_at())
        .bind(alert.is_resolved())
        .execute(&mut *conn)
        .await
        .map_err(|e| DatabaseError::from_query(e, "アラートの保存に失敗しました"))?;
    }

    Ok(())
}

#[async_trait]
impl BloodStockRepository for MySqlBloodStockRepository {
    async fn find_or_create(
        &self,
        key: StockKey,
        now: DateTime<Utc>,
    ) -> Result<BloodStock, RepositoryError> {
        let mut conn = self.acquire().await?;
        upsert_empty(&mut conn, key, now).await?;
        load_by_key(&mut conn, key, false)
            .await?
            .map(|(_, stock)| stock)
            .ok_or_else(|| {
                RepositoryError::FetchFailed(format!("作成した在庫レコードが見つかりません: {}", key))
            })
    }

    async fn find_by_key(&self, key: StockKey) -> Result<Option<BloodStock>, RepositoryError> {
        let mut conn = self.acquire().await?;
        Ok(load_by_key(&mut conn, key, false)
            .await?
            .map(|(_, stock)| stock))
    }

    async fn find_by_blood_bank(
        &self,
        blood_bank: BloodBankId,
    ) -> Result<Vec<BloodStock>, RepositoryError> {
        let mut conn = self.acquire().await?;
        load_many(&mut conn, Some(blood_bank)).await
    }

    async fn find_all(&self) -> Result<Vec<BloodStock>, RepositoryError> {
        let mut conn = self.acquire().await?;
        load_many(&mut conn, None).await
    }

    async fn apply_mutation(
        &self,
        key: StockKey,
        mutation: &StockMutation,
        now: DateTime<Utc>,
    ) -> Result<BloodStock, StockUpdateError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| {
                DatabaseError::ConnectionError(format!("トランザクション開始に失敗しました: {}", e))
            })
            .map_err(RepositoryError::from)?;

        upsert_empty(&mut tx, key, now)
            .await
            .map_err(RepositoryError::from)?;
        let (id, mut stock) = load_by_key(&mut tx, key, true).await?.ok_or_else(|| {
            RepositoryError::FetchFailed(format!("ロック対象の在庫レコードが見つかりません: {}", key))
        })?;

        if let Err(err) = stock.apply(mutation, now) {
            // 作成した空レコードも含めて取り消す
            tx.rollback()
                .await
                .map_err(|e| DatabaseError::from_query(e, "ロールバックに失敗しました"))
                .map_err(RepositoryError::from)?;
            return Err(err.into());
        }

        store(&mut tx, id, &stock)
            .await
            .map_err(RepositoryError::from)?;

        // トランザクションをコミット
        tx.commit()
            .await
            .map_err(|e| DatabaseError::from_query(e, "トランザクションのコミットに失敗しました"))
            .map_err(RepositoryError::from)?;

        Ok(stock)
    }
}
