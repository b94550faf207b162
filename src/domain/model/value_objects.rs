use crate::domain::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// 血液銀行アカウントの一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BloodBankId(Uuid);

impl BloodBankId {
    /// 新しい一意のBloodBankIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから BloodBankId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からBloodBankIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for BloodBankId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for BloodBankId {
    fn default() -> Self {
        Self::new()
    }
}

/// 献血記録の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DonationId(Uuid);

impl DonationId {
    /// 新しい一意のDonationIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから DonationId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 文字列からDonationIdを作成
    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        let uuid = Uuid::parse_str(s)?;
        Ok(Self(uuid))
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for DonationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for DonationId {
    fn default() -> Self {
        Self::new()
    }
}

/// 輸血依頼の一意識別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(Uuid);

impl RequestId {
    /// 新しい一意のRequestIdを生成
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// UUIDから RequestId を作成
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// 内部のUUIDを取得
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

/// ABO/Rh 血液型（8種類）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

impl BloodGroup {
    /// すべての血液型
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APositive,
        BloodGroup::ANegative,
        BloodGroup::BPositive,
        BloodGroup::BNegative,
        BloodGroup::AbPositive,
        BloodGroup::AbNegative,
        BloodGroup::OPositive,
        BloodGroup::ONegative,
    ];

    /// 表示用・永続化用のラベル
    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APositive => "A+",
            BloodGroup::ANegative => "A-",
            BloodGroup::BPositive => "B+",
            BloodGroup::BNegative => "B-",
            BloodGroup::AbPositive => "AB+",
            BloodGroup::AbNegative => "AB-",
            BloodGroup::OPositive => "O+",
            BloodGroup::ONegative => "O-",
        }
    }

    /// 文字列からBloodGroupを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        BloodGroup::ALL
            .iter()
            .copied()
            .find(|group| group.as_str() == s)
            .ok_or_else(|| DomainError::InvalidValue(format!("無効な血液型: {}", s)))
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 在庫レコードのキー
/// (血液銀行, 血液型) の組で在庫レコードは一意になる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockKey {
    pub blood_bank: BloodBankId,
    pub blood_group: BloodGroup,
}

impl StockKey {
    pub fn new(blood_bank: BloodBankId, blood_group: BloodGroup) -> Self {
        Self {
            blood_bank,
            blood_group,
        }
    }
}

impl fmt::Display for StockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.blood_bank, self.blood_group)
    }
}

/// 在庫ステータスの閾値（容量に対するパーセンテージ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockThresholds {
    critical_level: u32,
    low_level: u32,
}

impl StockThresholds {
    /// 危険水準のデフォルト値（%）
    pub const DEFAULT_CRITICAL_LEVEL: u32 = 10;
    /// 低水準のデフォルト値（%）
    pub const DEFAULT_LOW_LEVEL: u32 = 20;

    /// 閾値を作成
    /// 危険水準は低水準以下である必要がある
    pub fn new(critical_level: u32, low_level: u32) -> Result<Self, DomainError> {
        if critical_level > low_level {
            return Err(DomainError::InvalidValue(format!(
                "危険水準({})は低水準({})以下である必要があります",
                critical_level, low_level
            )));
        }
        Ok(Self {
            critical_level,
            low_level,
        })
    }

    /// 危険水準（%）を取得
    pub fn critical_level(&self) -> u32 {
        self.critical_level
    }

    /// 低水準（%）を取得
    pub fn low_level(&self) -> u32 {
        self.low_level
    }
}

impl Default for StockThresholds {
    fn default() -> Self {
        Self {
            critical_level: Self::DEFAULT_CRITICAL_LEVEL,
            low_level: Self::DEFAULT_LOW_LEVEL,
        }
    }
}

/// 有効期限バッチ
/// 1回の献血に由来する、同じ有効期限を持つ単位数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryBatch {
    units: u32,
    expiry_date: DateTime<Utc>,
    donation_id: DonationId,
}

impl ExpiryBatch {
    pub fn new(units: u32, expiry_date: DateTime<Utc>, donation_id: DonationId) -> Self {
        Self {
            units,
            expiry_date,
            donation_id,
        }
    }

    pub fn units(&self) -> u32 {
        self.units
    }

    pub fn expiry_date(&self) -> DateTime<Utc> {
        self.expiry_date
    }

    pub fn donation_id(&self) -> DonationId {
        self.donation_id
    }
}

/// アラート種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    ExpiringSoon,
    CriticalStock,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::LowStock => "low_stock",
            AlertType::ExpiringSoon => "expiring_soon",
            AlertType::CriticalStock => "critical_stock",
        }
    }

    /// 文字列からAlertTypeを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "low_stock" => Ok(AlertType::LowStock),
            "expiring_soon" => Ok(AlertType::ExpiringSoon),
            "critical_stock" => Ok(AlertType::CriticalStock),
            _ => Err(DomainError::InvalidValue(format!(
                "無効なアラート種別: {}",
                s
            ))),
        }
    }
}

/// アラートの重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }

    /// 文字列からAlertSeverityを作成
    pub fn from_string(s: &str) -> Result<Self, DomainError> {
        match s {
            "low" => Ok(AlertSeverity::Low),
            "medium" => Ok(AlertSeverity::Medium),
            "high" => Ok(AlertSeverity::High),
            _ => Err(DomainError::InvalidValue(format!(
                "無効なアラート重要度: {}",
                s
            ))),
        }
    }
}

/// 在庫アラート
/// 追記のみで、変更できるのは解決済みフラグだけ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAlert {
    alert_type: AlertType,
    message: String,
    severity: AlertSeverity,
    created_at: DateTime<Utc>,
    resolved: bool,
}

impl StockAlert {
    /// 未解決のアラートを作成
    pub fn new(
        alert_type: AlertType,
        message: String,
        severity: AlertSeverity,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            alert_type,
            message,
            severity,
            created_at,
            resolved: false,
        }
    }

    /// データベースから取得したデータでアラートを再構築
    pub fn reconstruct(
        alert_type: AlertType,
        message: String,
        severity: AlertSeverity,
        created_at: DateTime<Utc>,
        resolved: bool,
    ) -> Self {
        Self {
            alert_type,
            message,
            severity,
            created_at,
            resolved,
        }
    }

    pub fn alert_type(&self) -> AlertType {
        self.alert_type
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> AlertSeverity {
        self.severity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// 解決済みにする
    pub fn resolve(&mut self) {
        self.resolved = true;
    }
}
