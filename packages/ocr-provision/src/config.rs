//! Provisioning configuration
//!
//! Process-level settings come from plain environment variables (after an
//! optional `.env`). Per-network settings live under the selected network's
//! prefix and are loaded by [`NetworkDescriptor::from_env`].

use eyre::{eyre, Result, WrapErr};
use ocr_deployer::{NetworkDescriptor, NetworkId, RetryPolicy};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

fn default_network() -> &'static str {
    "rsk_regtest"
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_tx_timeout_secs() -> u64 {
    120
}

fn default_artifacts_dir() -> &'static str {
    "./artifacts"
}

/// Process configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub network: NetworkId,
    pub retry: RetryPolicy,
    pub tx_timeout: Duration,
    pub artifacts_dir: PathBuf,
}

impl Config {
    /// Load configuration from `.env` and the environment
    pub fn load(network_override: Option<&str>) -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded .env from {:?}", path);
        }
        Self::from_lookup(network_override, |key| env::var(key).ok())
    }

    /// Build from any key lookup; `load` passes the process environment
    pub fn from_lookup<F>(network_override: Option<&str>, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = match network_override {
            Some(name) => name.to_string(),
            None => var("NETWORK").unwrap_or_else(|| default_network().to_string()),
        };
        let network: NetworkId = network.parse().wrap_err("Invalid NETWORK")?;

        let attempts = parse_or(&var, "RETRY_ATTEMPTS", default_retry_attempts())?;
        let delay_ms = parse_or(&var, "RETRY_DELAY_MS", default_retry_delay_ms())?;
        let timeout_secs = parse_or(&var, "TX_TIMEOUT_SECS", default_tx_timeout_secs())?;

        let config = Config {
            network,
            retry: RetryPolicy::new(attempts, Duration::from_millis(delay_ms)),
            tx_timeout: Duration::from_secs(timeout_secs),
            artifacts_dir: var("CONTRACT_ARTIFACTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default_artifacts_dir())),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retry.attempts == 0 {
            return Err(eyre!("RETRY_ATTEMPTS must be at least 1"));
        }
        if self.tx_timeout.is_zero() {
            return Err(eyre!("TX_TIMEOUT_SECS must be greater than 0"));
        }
        Ok(())
    }

    /// Descriptor of the selected network, from its prefixed variables
    pub fn network_descriptor(&self) -> Result<NetworkDescriptor> {
        NetworkDescriptor::from_env(self.network.clone()).wrap_err_with(|| {
            format!(
                "Failed to load network {} (variables prefixed {}_)",
                self.network,
                self.network.env_prefix()
            )
        })
    }
}

fn parse_or<F, T>(var: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| eyre!("Invalid {}: {}", key, e)),
        None => Ok(default),
    }
}
