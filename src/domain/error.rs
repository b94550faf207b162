/// ドメイン層のエラー型
/// ビジネスルール違反を表現する
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// 無効な数量（例: 0以下の単位数）
    #[error("Invalid quantity")]
    InvalidQuantity,
    /// 在庫不足（利用可能在庫を超える払い出し）
    #[error("Insufficient stock available. Available: {available}, Requested: {requested}")]
    InsufficientStock { available: u32, requested: u32 },
    /// 有効期限が現在時刻以前
    #[error("Expiry date must be in the future")]
    InvalidExpiryDate,
    /// 無効な値
    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
