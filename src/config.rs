use std::str::FromStr;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
}

/// How signup guards against two requests claiming the same email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignupWriteMode {
    /// Look up, then write. Two concurrent signups can both pass the lookup.
    CheckThenPut,
    /// Conditional write; the losing request sees a duplicate user.
    PutIfAbsent,
}

/// How appends to one log feed interleave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAppendMode {
    /// Plain read-modify-write; concurrent appends may lose entries.
    Unsynchronized,
    /// Appends to the same feed are serialized within this process.
    Serialized,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" => Ok(Self::Postgres),
            other => anyhow::bail!("unknown store backend: {other}"),
        }
    }
}

impl FromStr for SignupWriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "check_then_put" => Ok(Self::CheckThenPut),
            "put_if_absent" => Ok(Self::PutIfAbsent),
            other => anyhow::bail!("unknown signup write mode: {other}"),
        }
    }
}

impl FromStr for LogAppendMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unsynchronized" => Ok(Self::Unsynchronized),
            "serialized" => Ok(Self::Serialized),
            other => anyhow::bail!("unknown log append mode: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    pub append_mode: LogAppendMode,
    pub global_capacity: usize,
    pub user_capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            append_mode: LogAppendMode::Unsynchronized,
            global_capacity: 1000,
            user_capacity: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    /// When set, session tokens are HS256-signed instead of plain base64.
    pub token_secret: Option<String>,
    pub signup_mode: SignupWriteMode,
    pub log: LogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            database_url: None,
            token_secret: None,
            signup_mode: SignupWriteMode::CheckThenPut,
            log: LogConfig::default(),
        }
    }
}

fn env_parsed<T>(name: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{name}: {e}")),
        Err(_) => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let store_backend = env_parsed("STORE_BACKEND", defaults.store_backend)?;
        let database_url = std::env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL is required when STORE_BACKEND=postgres");
        }

        Ok(Self {
            host: std::env::var("APP_HOST").unwrap_or(defaults.host),
            port: env_parsed("APP_PORT", defaults.port).context("parse APP_PORT")?,
            store_backend,
            database_url,
            token_secret: std::env::var("TOKEN_SECRET").ok().filter(|s| !s.is_empty()),
            signup_mode: env_parsed("SIGNUP_WRITE_MODE", defaults.signup_mode)?,
            log: LogConfig {
                append_mode: env_parsed("LOG_APPEND_MODE", defaults.log.append_mode)?,
                global_capacity: env_parsed("GLOBAL_LOG_CAPACITY", defaults.log.global_capacity)?,
                user_capacity: env_parsed("USER_LOG_CAPACITY", defaults.log.user_capacity)?,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_parse_case_insensitively() {
        assert_eq!("Postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!(
            " put_if_absent ".parse::<SignupWriteMode>().unwrap(),
            SignupWriteMode::PutIfAbsent
        );
        assert_eq!(
            "SERIALIZED".parse::<LogAppendMode>().unwrap(),
            LogAppendMode::Serialized
        );
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let err = "redis".parse::<StoreBackend>().unwrap_err();
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn defaults_preserve_unsynchronized_behaviour() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.signup_mode, SignupWriteMode::CheckThenPut);
        assert_eq!(cfg.log.append_mode, LogAppendMode::Unsynchronized);
        assert_eq!(cfg.log.global_capacity, 1000);
        assert_eq!(cfg.log.user_capacity, 100);
        assert!(cfg.token_secret.is_none());
    }
}
