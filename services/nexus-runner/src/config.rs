//! Runner Configuration
//!
//! Loads and validates `agent.config.json`. Every problem found here is
//! startup-fatal: the runner refuses to arm the timer on a config it
//! cannot fully trust.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nexus_types::{AddressError, AgentIdentity, AgentId, CashAddress, IdentityError, Network, PublicKey};

pub const DEFAULT_CONFIG_PATH: &str = "agent.config.json";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read configuration {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed configuration {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown network '{0}' (expected mainnet, testnet, or regtest)")]
    UnknownNetwork(String),

    #[error("invalid owner pubkey: {0}")]
    InvalidPubkey(#[from] IdentityError),

    #[error("invalid contract address: {0}")]
    InvalidAddress(#[from] AddressError),

    #[error("cycle interval must be at least 1 minute, got {0}")]
    IntervalTooShort(u64),

    #[error("agent name must not be empty")]
    EmptyName,
}

/// Shape of `agent.config.json`. Field names mirror the deployment
/// tooling that writes the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunnerConfig {
    /// Agent name; scopes memory and dashboard records.
    pub name: String,

    /// mainnet | testnet | regtest
    pub network: String,

    /// 33-byte compressed owner pubkey, hex.
    pub owner_pubkey: String,

    /// Cashaddr of the deployed covenant.
    pub contract_address: String,

    /// Compiled covenant artifact.
    #[serde(default = "default_artifact_path")]
    pub artifact_path: PathBuf,

    /// sled directory for cycle memory.
    #[serde(default = "default_memory_path")]
    pub memory_path: PathBuf,

    /// Minutes between cycles.
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,

    /// Run one cycle immediately instead of waiting a full interval.
    #[serde(default = "default_run_at_start")]
    pub run_at_start: bool,

    /// Per-transaction spend cap in satoshis.
    #[serde(default = "default_max_spend_sats")]
    pub max_spend_sats: u64,

    /// UTXO indexer / broadcast endpoint.
    pub provider_url: String,

    /// Transaction signing service endpoint.
    pub signer_url: String,

    /// Optional dashboard endpoint; reporting is disabled when unset.
    #[serde(default)]
    pub dashboard_url: Option<String>,
}

fn default_artifact_path() -> PathBuf {
    PathBuf::from("contracts/agent.json")
}

fn default_memory_path() -> PathBuf {
    PathBuf::from(".agent/memory")
}

fn default_interval_minutes() -> u64 {
    15
}

fn default_run_at_start() -> bool {
    true
}

fn default_max_spend_sats() -> u64 {
    500_000
}

impl RunnerConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyName);
        }
        if self.interval_minutes == 0 {
            return Err(ConfigError::IntervalTooShort(self.interval_minutes));
        }
        self.network()?;
        Ok(())
    }

    pub fn network(&self) -> Result<Network, ConfigError> {
        match self.network.as_str() {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            other => Err(ConfigError::UnknownNetwork(other.to_string())),
        }
    }

    /// Build the immutable identity, checking key and address shape
    /// against the configured network.
    pub fn identity(&self) -> Result<AgentIdentity, ConfigError> {
        let network = self.network()?;
        Ok(AgentIdentity {
            name: self.name.clone(),
            agent_id: AgentId::derive(&self.name),
            owner_pubkey: PublicKey::from_hex(&self.owner_pubkey)?,
            contract_address: CashAddress::parse_for_network(&self.contract_address, network)?,
            network,
        })
    }
}
