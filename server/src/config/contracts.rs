use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::Deserialize;

use super::ConfigError;

pub const DEFAULT_RPC_URL: &str = "http://127.0.0.1:8545";
pub const DEFAULT_NETWORK: &str = "localhost";

/// Node endpoint and deployed contract addresses
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContractsConfig {
    pub rpc_url: String,
    pub app_address: Address,
    pub data_address: Address,
}

/// One network entry of the deployment config file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkEntry {
    pub url: String,
    pub app_address: Address,
    pub data_address: Address,
}

impl ContractsConfig {
    /// Environment variables win over the deployment file named by
    /// `CONFIG_FILE`; the file supplies whatever they leave out.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network = lookup("NETWORK").unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        let file_entry = match lookup("CONFIG_FILE") {
            Some(path) => Some(read_network_entry(Path::new(&path), &network)?),
            None => None,
        };

        let rpc_url = lookup("RPC_URL")
            .or_else(|| file_entry.as_ref().map(|entry| entry.url.clone()))
            .unwrap_or_else(|| DEFAULT_RPC_URL.to_string());

        let app_address = address_from(lookup, "APP_CONTRACT_ADDRESS")?
            .or_else(|| file_entry.as_ref().map(|entry| entry.app_address))
            .ok_or(ConfigError::Missing("APP_CONTRACT_ADDRESS"))?;

        let data_address = address_from(lookup, "DATA_CONTRACT_ADDRESS")?
            .or_else(|| file_entry.as_ref().map(|entry| entry.data_address))
            .ok_or(ConfigError::Missing("DATA_CONTRACT_ADDRESS"))?;

        Ok(Self {
            rpc_url,
            app_address,
            data_address,
        })
    }
}

fn address_from<F>(lookup: &F, key: &'static str) -> Result<Option<Address>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            Address::from_str(raw.trim()).map_err(|err| ConfigError::Invalid {
                key,
                value: raw.clone(),
                reason: err.to_string(),
            })
        })
        .transpose()
}

/// Reads `{ "<network>": { "url", "appAddress", "dataAddress" } }`.
pub fn read_network_entry(path: &Path, network: &str) -> Result<NetworkEntry, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::File {
        path: path.display().to_string(),
        source,
    })?;

    let mut networks: HashMap<String, NetworkEntry> =
        serde_json::from_str(&content).map_err(|source| ConfigError::FileFormat {
            path: path.display().to_string(),
            source,
        })?;

    networks
        .remove(network)
        .ok_or_else(|| ConfigError::UnknownNetwork {
            network: network.to_string(),
            path: path.display().to_string(),
        })
}
