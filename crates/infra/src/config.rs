//! Store configuration, read once at start-up.

use std::time::Duration;

use thiserror::Error;

use crate::store::in_memory::DEFAULT_LOCK_TIMEOUT;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which store to run against and how.
///
/// `database_url: None` selects the in-memory store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub lock_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }
}

impl core::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("max_connections", &self.max_connections)
            .field("lock_timeout", &self.lock_timeout)
            .finish()
    }
}

impl StoreConfig {
    /// Read `DATABASE_URL`, `DB_MAX_CONNECTIONS` and `LOCK_TIMEOUT_MS` from the
    /// process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StoreConfig::from_env`], with a caller-supplied lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        config.database_url = lookup("DATABASE_URL").filter(|v| !v.trim().is_empty());

        if let Some(raw) = lookup("DB_MAX_CONNECTIONS") {
            config.max_connections = parse_positive("DB_MAX_CONNECTIONS", &raw)?;
        }
        if let Some(raw) = lookup("LOCK_TIMEOUT_MS") {
            config.lock_timeout = Duration::from_millis(parse_positive("LOCK_TIMEOUT_MS", &raw)?.into());
        }

        Ok(config)
    }
}

fn parse_positive(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: reason.to_string(),
    };
    let value: u32 = raw.trim().parse().map_err(|_| invalid("expected a positive integer"))?;
    if value == 0 {
        return Err(invalid("must be greater than zero"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_select_in_memory() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, StoreConfig::default());
        assert!(config.database_url.is_none());
        assert_eq!(config.lock_timeout, Duration::from_millis(5000));
    }

    #[test]
    fn reads_all_keys() {
        let config = StoreConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("DB_MAX_CONNECTIONS", "4"),
            ("LOCK_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/shop"));
        assert_eq!(config.max_connections, 4);
        assert_eq!(config.lock_timeout, Duration::from_millis(250));
    }

    #[test]
    fn rejects_zero_and_garbage() {
        let err = StoreConfig::from_lookup(lookup(&[("LOCK_TIMEOUT_MS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LOCK_TIMEOUT_MS", .. }));
        assert!(StoreConfig::from_lookup(lookup(&[("DB_MAX_CONNECTIONS", "many")])).is_err());
    }

    #[test]
    fn debug_output_hides_the_database_url() {
        let config = StoreConfig {
            database_url: Some("postgres://user:pw@host/db".to_string()),
            ..StoreConfig::default()
        };
        assert!(!format!("{config:?}").contains("pw"));
    }
}
