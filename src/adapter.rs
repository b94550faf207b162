pub mod database_config;
pub mod database_error;
pub mod database_migration;
pub mod driven;
pub mod driver;
pub mod ledger_config;

pub use database_config::{ConfigError, DatabaseConfig};
pub use database_migration::DatabaseMigration;
pub use ledger_config::ledger_policy_from_env;
