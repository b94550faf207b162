use crate::adapter::database_error::DatabaseError;
use sqlx::{MySql, Pool};

/// データベースマイグレーションを管理する構造体
pub struct DatabaseMigration {
    pool: Pool<MySql>,
}

impl DatabaseMigration {
    /// 新しいDatabaseMigrationインスタンスを作成
    pub fn new(pool: Pool<MySql>) -> Self {
        Self { pool }
    }

    /// 適用するマイグレーション（実行順）
    pub fn migrations() -> [(&'static str, &'static str); 3] {
        [
            (
                "001_create_blood_stocks_table",
                include_str!("../../migrations/001_create_blood_stocks_table.sql"),
            ),
            (
                "002_create_blood_stock_expiry_batches_table",
                include_str!("../../migrations/002_create_blood_stock_expiry_batches_table.sql"),
            ),
            (
                "003_create_blood_stock_alerts_table",
                include_str!("../../migrations/003_create_blood_stock_alerts_table.sql"),
            ),
        ]
    }

    /// マイグレーションを実行
    /// べき等性を保証（CREATE TABLE IF NOT EXISTS）
    pub async fn run(&self) -> Result<(), DatabaseError> {
        for (name, migration_sql) in Self::migrations() {
            tracing::info!(migration = name, "Running migration");
            sqlx::query(migration_sql)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::MigrationError(format!("{} failed: {}", name, e)))?;
        }

        tracing::info!("All migrations completed successfully");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_idempotent_and_ordered() {
        let migrations = DatabaseMigration::migrations();
        let names: Vec<&str> = migrations.iter().map(|(name, _)| *name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        for (_, sql) in migrations {
            assert!(sql.contains("CREATE TABLE IF NOT EXISTS"));
        }
    }

    #[test]
    fn test_blood_stocks_table_has_unique_key() {
        let (_, sql) = DatabaseMigration::migrations()[0];
        assert!(sql.contains("UNIQUE KEY uq_blood_stocks_bank_group (blood_bank_id, blood_group)"));
    }
}
