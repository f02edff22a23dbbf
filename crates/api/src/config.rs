//! Process configuration, read once at start-up.

use std::net::SocketAddr;

use thiserror::Error;

use shopfront_infra::{ConfigError, StoreConfig};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error)]
pub enum ApiConfigError {
    #[error("invalid BIND_ADDR '{0}'")]
    BindAddr(String),

    #[error(transparent)]
    Store(#[from] ConfigError),
}

#[derive(Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `true` when `JWT_SECRET` was missing and the dev default is in use.
    pub jwt_secret_is_default: bool,
    pub store: StoreConfig,
}

impl core::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_secret_is_default", &self.jwt_secret_is_default)
            .field("store", &self.store)
            .finish()
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ApiConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ApiConfigError> {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .map_err(|_| ApiConfigError::BindAddr(raw_addr.clone()))?;

        let (jwt_secret, jwt_secret_is_default) = match lookup("JWT_SECRET") {
            Some(secret) if !secret.is_empty() => (secret, false),
            _ => (DEV_JWT_SECRET.to_string(), true),
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            jwt_secret_is_default,
            store: StoreConfig::from_lookup(&lookup)?,
        })
    }
}
