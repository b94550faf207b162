use std::env;

/// データベース接続設定を管理する構造体
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub max_connections: u32,
}

/// 設定エラー
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

/// 環境変数を読み取り、未設定ならデフォルト値を解析する
pub(crate) fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

impl DatabaseConfig {
    /// 環境変数から設定を読み取る
    /// 環境変数が設定されていない場合はデフォルト値を使用
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("DATABASE_HOST").unwrap_or_else(|_| "localhost".to_string());

        let port = parse_env::<u16>("DATABASE_PORT", 3306)?;

        let database = env::var("DATABASE_NAME").unwrap_or_else(|_| "blood_bank_db".to_string());

        let username = env::var("DATABASE_USER").unwrap_or_else(|_| "blood_bank_user".to_string());

        let password =
            env::var("DATABASE_PASSWORD").unwrap_or_else(|_| "blood_bank_password".to_string());

        let max_connections = parse_env::<u32>("DATABASE_MAX_CONNECTIONS", 10)?;

        Ok(Self {
            host,
            port,
            database,
            username,
            password,
            max_connections,
        })
    }

    /// MySQL接続文字列を生成
    pub fn connection_string(&self) -> String {
        format!(
            "mysql://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }
}

// 環境変数を触るテスト同士の競合を防ぐためのロック
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
