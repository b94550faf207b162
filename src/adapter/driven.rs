// 駆動される側アダプター（リポジトリ実装など）

mod in_memory_blood_stock_repository;
mod mysql_blood_stock_repository;
mod system_clock;
mod tracing_logger;

pub use in_memory_blood_stock_repository::InMemoryBloodStockRepository;
pub use mysql_blood_stock_repository::MySqlBloodStockRepository;
pub use system_clock::SystemClock;
pub use tracing_logger::TracingLogger;
