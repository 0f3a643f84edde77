//! Agent identity types
//!
//! An [`AgentIdentity`] is created once at deployment and never mutated:
//! the 20-byte agent id is etched into the on-chain identity token, and the
//! contract address is fixed by the compiled covenant plus constructor args.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::address::CashAddress;

/// Length of an agent identifier in bytes.
pub const AGENT_ID_LEN: usize = 20;

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("agent id must be {AGENT_ID_LEN} bytes of hex, got '{value}'")]
    InvalidAgentId { value: String },

    #[error("owner public key must be 33 bytes of compressed-key hex, got '{value}'")]
    InvalidPublicKey { value: String },
}

/// 20-byte identifier carried by the agent's identity token.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId([u8; AGENT_ID_LEN]);

impl AgentId {
    pub fn from_bytes(bytes: [u8; AGENT_ID_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_hex(value: &str) -> Result<Self, IdentityError> {
        let raw = hex::decode(value).map_err(|_| IdentityError::InvalidAgentId {
            value: value.to_string(),
        })?;
        let bytes: [u8; AGENT_ID_LEN] =
            raw.as_slice()
                .try_into()
                .map_err(|_| IdentityError::InvalidAgentId {
                    value: value.to_string(),
                })?;
        Ok(Self(bytes))
    }

    /// Default derivation when no explicit id was recorded at deployment:
    /// first 20 bytes of SHA-256 of the agent name.
    pub fn derive(name: &str) -> Self {
        let digest = Sha256::digest(name.as_bytes());
        let mut bytes = [0u8; AGENT_ID_LEN];
        bytes.copy_from_slice(&digest[..AGENT_ID_LEN]);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; AGENT_ID_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({})", self.to_hex())
    }
}

/// Compressed secp256k1 public key of the agent owner, kept as hex.
///
/// Key derivation and signing are external concerns; this type only
/// guards the shape (33 bytes, leading 0x02/0x03).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey(String);

impl PublicKey {
    pub fn from_hex(value: &str) -> Result<Self, IdentityError> {
        let raw = hex::decode(value).map_err(|_| IdentityError::InvalidPublicKey {
            value: value.to_string(),
        })?;
        if raw.len() != 33 || !matches!(raw[0], 0x02 | 0x03) {
            return Err(IdentityError::InvalidPublicKey {
                value: value.to_string(),
            });
        }
        Ok(Self(value.to_lowercase()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// BCH network an agent is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
}

impl Network {
    /// Cashaddr prefix for this network.
    pub fn cash_prefix(&self) -> &'static str {
        match self {
            Self::Mainnet => "bitcoincash",
            Self::Testnet => "bchtest",
            Self::Regtest => "bchreg",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "bitcoincash" => Some(Self::Mainnet),
            "bchtest" => Some(Self::Testnet),
            "bchreg" => Some(Self::Regtest),
            _ => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mainnet => write!(f, "mainnet"),
            Self::Testnet => write!(f, "testnet"),
            Self::Regtest => write!(f, "regtest"),
        }
    }
}

/// Immutable identity of one deployed agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentIdentity {
    /// Human-readable agent name; scopes memory storage and reporting.
    pub name: String,
    pub agent_id: AgentId,
    pub owner_pubkey: PublicKey,
    pub contract_address: CashAddress,
    pub network: Network,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_from_hex_roundtrip() {
        let hex = "00112233445566778899aabbccddeeff00112233";
        let id = AgentId::from_hex(hex).unwrap();
        assert_eq!(id.to_hex(), hex);
    }

    #[test]
    fn agent_id_rejects_wrong_length() {
        assert!(AgentId::from_hex("0011").is_err());
        assert!(AgentId::from_hex("not-hex").is_err());
    }

    #[test]
    fn agent_id_derivation_is_stable() {
        let a = AgentId::derive("final-bot");
        let b = AgentId::derive("final-bot");
        assert_eq!(a, b);
        assert_ne!(a, AgentId::derive("other-bot"));
    }

    #[test]
    fn public_key_shape_enforced() {
        let valid = format!("02{}", "11".repeat(32));
        assert!(PublicKey::from_hex(&valid).is_ok());
        let bad_parity = format!("04{}", "11".repeat(32));
        assert!(PublicKey::from_hex(&bad_parity).is_err());
        assert!(PublicKey::from_hex("02aabb").is_err());
    }

    #[test]
    fn network_prefixes() {
        assert_eq!(Network::Testnet.cash_prefix(), "bchtest");
        assert_eq!(Network::from_prefix("bitcoincash"), Some(Network::Mainnet));
        assert_eq!(Network::from_prefix("cashaddr"), None);
    }
}
