//! Chain-state snapshots, commitments, memory entries, and cycle outcomes

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// CashTokens NFT commitments carry at most 40 bytes.
pub const MAX_COMMITMENT_LEN: usize = 40;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommitmentError {
    #[error("commitment is not valid hex: '{value}'")]
    InvalidHex { value: String },

    #[error("commitment is {len} bytes, maximum is {MAX_COMMITMENT_LEN}")]
    TooLong { len: usize },
}

/// Opaque byte string etched into the identity token: the agent's
/// proof-of-reasoning. Empty until the agent first etches state.
/// Serialized as lowercase hex on every wire and storage surface.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct StateCommitment(Vec<u8>);

impl Serialize for StateCommitment {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for StateCommitment {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::from_hex(&value).map_err(serde::de::Error::custom)
    }
}

impl StateCommitment {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, CommitmentError> {
        if bytes.len() > MAX_COMMITMENT_LEN {
            return Err(CommitmentError::TooLong { len: bytes.len() });
        }
        Ok(Self(bytes))
    }

    pub fn from_hex(value: &str) -> Result<Self, CommitmentError> {
        let bytes = hex::decode(value).map_err(|_| CommitmentError::InvalidHex {
            value: value.to_string(),
        })?;
        Self::from_bytes(bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }
}

impl fmt::Display for StateCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "(none)")
        } else {
            write!(f, "{}", self.to_hex())
        }
    }
}

impl fmt::Debug for StateCommitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateCommitment({})", self)
    }
}

/// Snapshot of on-chain state, fetched fresh at the start of every cycle.
/// Never persisted locally; staleness is the enemy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainState {
    pub balance_sats: u64,
    pub commitment: StateCommitment,
}

/// One historical record of a past cycle, fed back into the decision prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub summary: String,
    pub timestamp: DateTime<Utc>,
}

impl MemoryEntry {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Transaction identifier returned by the network provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxId(String);

impl TxId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading 8-character prefix, for memory summaries and logs. The
    /// provider is not trusted to return pure hex, so the cut is clamped
    /// to a char boundary.
    pub fn short(&self) -> &str {
        let mut end = self.0.len().min(8);
        while !self.0.is_char_boundary(end) {
            end -= 1;
        }
        &self.0[..end]
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one orchestration pass. Drives logging, reporting, and the
/// memory summary; never persisted beyond those.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CycleOutcome {
    Executed { action: String, txid: TxId },
    Idle { reasoning: String },
    Rejected { reason: String },
    Failed { kind: String, message: String },
}

impl CycleOutcome {
    /// Human-readable line for the agent's memory window.
    pub fn summary(&self, reasoning: &str) -> String {
        match self {
            Self::Executed { action, txid } => {
                format!("{} - {} (TX: {})", action, reasoning, txid.short())
            }
            Self::Idle { .. } => format!("idle - {}", reasoning),
            Self::Rejected { reason } => format!("rejected - {}", reason),
            Self::Failed { kind, message } => format!("failed ({}) - {}", kind, message),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
