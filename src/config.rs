// src/config.rs
//! Service configuration.
//!
//! Settings are read from `DOCREG_`-prefixed environment variables (loaded
//! from a `.env` file in development) on top of coded defaults. Nested
//! fields use a double-underscore separator, e.g.
//! `DOCREG_REGISTRY__PRIVATE_KEY` or `DOCREG_RATE_LIMIT__QUOTA`.
//!
//! Required (no default): `DOCREG_REGISTRY__PRIVATE_KEY` and
//! `DOCREG_REGISTRY__CONTRACT_ADDRESS`.

use crate::services::rate_limiter::{DEFAULT_QUOTA, DEFAULT_WINDOW};
use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

/// Registry client settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrySettings {
    /// zkSync RPC endpoint URL
    pub rpc_url: String,
    /// Hex-encoded signer private key
    pub private_key: String,
    /// Deployed CredentialRegistry contract address
    pub contract_address: String,
    /// Per-call deadline in seconds
    pub call_timeout_secs: u64,
    /// Transport-failure retries for read calls
    pub read_retries: u32,
}

impl RegistrySettings {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// Rate limiter settings.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// Requests admitted per actor per window
    pub quota: u32,
    /// Window duration in seconds
    pub window_secs: u64,
    /// Interval between purges of expired windows, in seconds
    pub purge_secs: u64,
}

impl RateLimitSettings {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_secs)
    }
}

/// Top-level service settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Socket address the API server binds to
    pub bind_addr: String,
    /// Path of the SQLite activity ledger database
    pub ledger_path: String,
    pub registry: RegistrySettings,
    pub rate_limit: RateLimitSettings,
}

impl Settings {
    /// Loads settings from the environment on top of coded defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("bind_addr", "127.0.0.1:3000")?
            .set_default("ledger_path", "activity.db")?
            .set_default("registry.rpc_url", "https://sepolia.era.zksync.dev")?
            .set_default("registry.call_timeout_secs", 30i64)?
            .set_default("registry.read_retries", 2i64)?
            .set_default("rate_limit.quota", DEFAULT_QUOTA as i64)?
            .set_default("rate_limit.window_secs", DEFAULT_WINDOW.as_secs() as i64)?
            .set_default("rate_limit.purge_secs", 300i64)?
            .add_source(Environment::with_prefix("DOCREG").separator("__"))
            .build()?
            .try_deserialize()
    }
}
