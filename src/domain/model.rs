// ドメインモデル（エンティティと値オブジェクト）

mod value_objects;
mod stock_level;
mod stock_mutation;
mod blood_stock;

pub use value_objects::{
    BloodBankId, DonationId, RequestId,
    BloodGroup,
    StockKey,
    StockThresholds,
    ExpiryBatch,
    AlertType, AlertSeverity, StockAlert,
};

pub use stock_level::{
    at_or_below_level, derive_status, status_for_utilization, utilization, StockStatus,
};
pub use stock_mutation::{InventoryOperation, StockMutation};
pub use blood_stock::{BloodStock, DEFAULT_CAPACITY};
