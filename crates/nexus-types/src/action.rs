//! Action catalog and decisions
//!
//! The catalog is the single source of truth for what an agent may do.
//! Both the decision parser and the constraint guard consult it, so the
//! two can never drift apart. Dispatch is a closed enum: an action the
//! compiler does not know about cannot reach the execution path.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::state::{CommitmentError, StateCommitment};

/// Parameter shape of a catalog action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Prefixed cashaddr destination.
    Address,
    /// Non-negative satoshi amount.
    Satoshis,
    /// Hex-encoded byte string.
    HexBytes,
}

/// Static description of one catalog member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    pub params: &'static [ParamKind],
    pub mutates_chain: bool,
}

/// The fixed action set. `idle` is the only non-mutating member and is
/// always a valid fallback.
const CATALOG: &[ActionSpec] = &[
    ActionSpec {
        name: "execute",
        params: &[],
        mutates_chain: true,
    },
    ActionSpec {
        name: "updateState",
        params: &[ParamKind::HexBytes],
        mutates_chain: true,
    },
    ActionSpec {
        name: "transfer",
        params: &[ParamKind::Address, ParamKind::Satoshis],
        mutates_chain: true,
    },
    ActionSpec {
        name: "withdrawFunds",
        params: &[ParamKind::Satoshis, ParamKind::Address],
        mutates_chain: true,
    },
    ActionSpec {
        name: "idle",
        params: &[],
        mutates_chain: false,
    },
];

pub struct ActionCatalog;

impl ActionCatalog {
    pub fn specs() -> &'static [ActionSpec] {
        CATALOG
    }

    pub fn lookup(name: &str) -> Option<&'static ActionSpec> {
        // "stayIdle" is the legacy spelling some prompts still produce.
        let name = if name == "stayIdle" { "idle" } else { name };
        CATALOG.iter().find(|spec| spec.name == name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("unknown action '{name}'")]
    UnknownAction { name: String },

    #[error("action '{name}' expects {expected} params, got {actual}")]
    ArityMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("param {index} of '{name}' must be a {expected:?}")]
    TypeMismatch {
        name: String,
        index: usize,
        expected: ParamKind,
    },
}

/// A member of the action catalog with its typed parameters.
///
/// Destination addresses stay as raw strings here: a decision is untrusted
/// input, and syntax checking the destination is the guard's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum AgentAction {
    Execute,
    UpdateState { state_hex: String },
    Transfer { to: String, sats: u64 },
    WithdrawFunds { sats: u64, to: String },
    Idle,
}

impl AgentAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Execute => "execute",
            Self::UpdateState { .. } => "updateState",
            Self::Transfer { .. } => "transfer",
            Self::WithdrawFunds { .. } => "withdrawFunds",
            Self::Idle => "idle",
        }
    }

    pub fn spec(&self) -> &'static ActionSpec {
        match self {
            Self::Execute => &CATALOG[0],
            Self::UpdateState { .. } => &CATALOG[1],
            Self::Transfer { .. } => &CATALOG[2],
            Self::WithdrawFunds { .. } => &CATALOG[3],
            Self::Idle => &CATALOG[4],
        }
    }

    pub fn mutates_chain(&self) -> bool {
        self.spec().mutates_chain
    }

    /// Satoshis this action intends to move, if any.
    pub fn spend_sats(&self) -> Option<u64> {
        match self {
            Self::Transfer { sats, .. } | Self::WithdrawFunds { sats, .. } => Some(*sats),
            _ => None,
        }
    }

    /// Destination address this action pays out to, if any.
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::Transfer { to, .. } | Self::WithdrawFunds { to, .. } => Some(to),
            _ => None,
        }
    }

    /// Build an action from an untrusted `{action, params}` pair, checking
    /// the name, arity, and parameter types against the catalog.
    pub fn from_raw(name: &str, params: &[serde_json::Value]) -> Result<Self, ActionParseError> {
        let spec = ActionCatalog::lookup(name).ok_or_else(|| ActionParseError::UnknownAction {
            name: name.to_string(),
        })?;
        if params.len() != spec.params.len() {
            return Err(ActionParseError::ArityMismatch {
                name: spec.name.to_string(),
                expected: spec.params.len(),
                actual: params.len(),
            });
        }

        let string_at = |index: usize| -> Result<String, ActionParseError> {
            params[index]
                .as_str()
                .map(str::to_string)
                .ok_or(ActionParseError::TypeMismatch {
                    name: spec.name.to_string(),
                    index,
                    expected: spec.params[index],
                })
        };
        let sats_at = |index: usize| -> Result<u64, ActionParseError> {
            params[index].as_u64().ok_or(ActionParseError::TypeMismatch {
                name: spec.name.to_string(),
                index,
                expected: spec.params[index],
            })
        };

        match spec.name {
            "execute" => Ok(Self::Execute),
            "updateState" => Ok(Self::UpdateState {
                state_hex: string_at(0)?,
            }),
            "transfer" => Ok(Self::Transfer {
                to: string_at(0)?,
                sats: sats_at(1)?,
            }),
            "withdrawFunds" => Ok(Self::WithdrawFunds {
                sats: sats_at(0)?,
                to: string_at(1)?,
            }),
            "idle" => Ok(Self::Idle),
            other => Err(ActionParseError::UnknownAction {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for AgentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execute => write!(f, "execute()"),
            Self::UpdateState { state_hex } => write!(f, "updateState({})", state_hex),
            Self::Transfer { to, sats } => write!(f, "transfer({}, {})", to, sats),
            Self::WithdrawFunds { sats, to } => write!(f, "withdrawFunds({}, {})", sats, to),
            Self::Idle => write!(f, "idle()"),
        }
    }
}

/// Maximum length of decision reasoning kept for audit.
pub const MAX_REASONING_LEN: usize = 500;

/// Output of the decision engine for one cycle. Treated as adversarial
/// input by everything downstream; the reasoning is audit-only and never
/// drives control flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: AgentAction,
    pub reasoning: String,
}

impl Decision {
    pub fn new(action: AgentAction, reasoning: impl Into<String>) -> Self {
        let mut reasoning: String = reasoning.into();
        if reasoning.len() > MAX_REASONING_LEN {
            let mut end = MAX_REASONING_LEN;
            while !reasoning.is_char_boundary(end) {
                end -= 1;
            }
            reasoning.truncate(end);
        }
        Self { action, reasoning }
    }

    /// Safe default when the decision backend is unavailable or malformed.
    pub fn fallback() -> Self {
        Self::new(AgentAction::Idle, "fallback: decision unavailable")
    }

    /// Commitment the identity token must carry after this decision.
    ///
    /// `updateState` etches its payload verbatim; every other mutating
    /// action chains a digest of the previous commitment, the action name,
    /// and the reasoning text (the proof-of-reasoning). Idle keeps the
    /// commitment as-is.
    pub fn planned_commitment(
        &self,
        prev: &StateCommitment,
    ) -> Result<StateCommitment, CommitmentError> {
        match &self.action {
            AgentAction::Idle => Ok(prev.clone()),
            AgentAction::UpdateState { state_hex } => StateCommitment::from_hex(state_hex),
            action => {
                let mut hasher = Sha256::new();
                hasher.update(prev.as_bytes());
                hasher.update(action.name().as_bytes());
                hasher.update(self.reasoning.as_bytes());
                let digest = hasher.finalize();
                StateCommitment::from_bytes(digest[..32].to_vec())
            }
        }
    }
}
