//! Startup configuration, read once from the environment

use std::time::Duration;

use crate::chain::contracts::GasSettings;
use crate::services::oracle_registry::RegistrySettings;

pub mod contracts;

pub use contracts::ContractsConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("cannot read config file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file {path}: {source}")]
    FileFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("network {network:?} not found in {path}")]
    UnknownNetwork { network: String, path: String },
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub contracts: ContractsConfig,
    pub port: u16,
    pub oracle_count: usize,
    pub oracle_account_offset: usize,
    pub registration_gas: u64,
    pub response_gas: u64,
    pub gas_price: u64,
    pub event_poll_interval: Duration,
}

impl RelayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let oracle_count = parse_or(&lookup, "ORACLE_COUNT", 25usize)?;
        if oracle_count == 0 {
            return Err(ConfigError::Invalid {
                key: "ORACLE_COUNT",
                value: "0".to_string(),
                reason: "the oracle pool needs at least one member".to_string(),
            });
        }

        Ok(Self {
            contracts: ContractsConfig::from_lookup(&lookup)?,
            port: parse_or(&lookup, "PORT", 80u16)?,
            oracle_count,
            oracle_account_offset: parse_or(&lookup, "ORACLE_ACCOUNT_OFFSET", 20usize)?,
            registration_gas: parse_or(&lookup, "REGISTRATION_GAS", 5_000_000u64)?,
            response_gas: parse_or(&lookup, "RESPONSE_GAS", 500_000u64)?,
            gas_price: parse_or(&lookup, "GAS_PRICE", 20_000_000u64)?,
            event_poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "EVENT_POLL_INTERVAL_MS",
                1_000u64,
            )?),
        })
    }

    pub fn registry_settings(&self) -> RegistrySettings {
        RegistrySettings {
            pool_size: self.oracle_count,
            account_offset: self.oracle_account_offset,
            gas: GasSettings {
                gas: self.registration_gas,
                gas_price: self.gas_price,
            },
        }
    }

    pub fn response_gas(&self) -> GasSettings {
        GasSettings {
            gas: self.response_gas,
            gas_price: self.gas_price,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|err: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: err.to_string(),
        }),
        None => Ok(default),
    }
}
