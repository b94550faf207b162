use crate::adapter::database_config::{parse_env, ConfigError};
use crate::application::service::LedgerPolicy;

/// 台帳の動作方針を環境変数から読み取る
/// 未設定の項目は `LedgerPolicy::default()` の値を使う
pub fn ledger_policy_from_env() -> Result<LedgerPolicy, ConfigError> {
    let defaults = LedgerPolicy::default();
    Ok(LedgerPolicy {
        raise_alert_on_manual_removal: parse_env(
            "LEDGER_RAISE_ALERT_ON_MANUAL_REMOVAL",
            defaults.raise_alert_on_manual_removal,
        )?,
        expiring_soon_days: parse_env("LEDGER_EXPIRING_SOON_DAYS", defaults.expiring_soon_days)?,
        max_conflict_retries: parse_env(
            "LEDGER_MAX_CONFLICT_RETRIES",
            defaults.max_conflict_retries,
        )?,
    })
}
