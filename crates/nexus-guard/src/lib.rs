//! Nexus Guard - pre-flight validator for agent decisions
//!
//! Decisions come out of a language model and are untrusted input. The
//! guard sits between the decision engine and the execution gateway and
//! is the last off-chain line before funds move. The covenant mirrors
//! parts of this policy on-chain; both share one invariant: a
//! state-mutating transaction must recreate the identity token with a
//! fresh commitment.
//!
//! # Key principle
//!
//! **Models may PROPOSE actions, never EXECUTE funds.**
//!
//! Checks:
//! - spend amount within the per-transaction limit
//! - destination syntactically valid for the agent's network
//! - mutating actions paired with a refreshed state commitment
//! - reasoning free of prompt-injection markers
//!
//! Rejections are terminal for the cycle; retry happens only via the next
//! scheduled cycle.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nexus_types::{
    AddressError, AgentAction, AgentIdentity, CashAddress, ChainState, CommitmentError, Decision,
};

/// Errors that fail a decision against policy
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("spend of {proposed} sats exceeds per-transaction limit of {limit}")]
    SpendLimitExceeded { proposed: u64, limit: u64 },

    #[error("destination rejected: {0}")]
    InvalidDestination(#[from] AddressError),

    #[error("state commitment rejected: {0}")]
    InvalidCommitment(#[from] CommitmentError),

    #[error("mutating action '{action}' does not refresh the state commitment")]
    CommitmentNotRefreshed { action: String },

    #[error("potential prompt injection in reasoning: '{pattern}'")]
    InjectionDetected { pattern: String },
}

/// Policy knobs for the guard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardPolicy {
    /// Hard per-transaction spend cap in satoshis.
    pub max_spend_sats: u64,
    /// Markers that indicate an attempt to steer the agent through its own
    /// audit trail.
    pub injection_patterns: Vec<String>,
}

impl Default for GuardPolicy {
    fn default() -> Self {
        Self {
            max_spend_sats: 500_000,
            injection_patterns: vec![
                "ignore previous".to_string(),
                "bypass".to_string(),
                "override policy".to_string(),
                "disregard".to_string(),
                "system prompt".to_string(),
                "you are now".to_string(),
            ],
        }
    }
}

/// Verdict on one proposed decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    Rejected { reason: String },
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

/// The constraint enforcer
pub struct Guard {
    policy: GuardPolicy,
}

impl Guard {
    pub fn new() -> Self {
        Self {
            policy: GuardPolicy::default(),
        }
    }

    pub fn with_policy(policy: GuardPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &GuardPolicy {
        &self.policy
    }

    /// Check a proposed decision against policy. Never panics and never
    /// errors out: every policy failure becomes a logged rejection.
    pub fn check(&self, decision: &Decision, identity: &AgentIdentity, state: &ChainState) -> Verdict {
        match self.evaluate(decision, identity, state) {
            Ok(()) => Verdict::Accepted,
            Err(err) => {
                tracing::warn!(
                    agent = %identity.name,
                    action = decision.action.name(),
                    reason = %err,
                    "decision rejected by guard"
                );
                Verdict::Rejected {
                    reason: err.to_string(),
                }
            }
        }
    }

    fn evaluate(
        &self,
        decision: &Decision,
        identity: &AgentIdentity,
        state: &ChainState,
    ) -> Result<(), GuardError> {
        // Idle is always a valid outcome of a cycle.
        if let AgentAction::Idle = decision.action {
            return Ok(());
        }

        self.check_injection(&decision.reasoning)?;

        if let Some(proposed) = decision.action.spend_sats() {
            if proposed > self.policy.max_spend_sats {
                return Err(GuardError::SpendLimitExceeded {
                    proposed,
                    limit: self.policy.max_spend_sats,
                });
            }
        }

        if let Some(destination) = decision.action.destination() {
            CashAddress::parse_for_network(destination, identity.network)?;
        }

        // Proof-of-state: a mutating transaction must re-etch the token
        // with a commitment different from the one it spends.
        let planned = decision.planned_commitment(&state.commitment)?;
        if planned.is_empty() || planned == state.commitment {
            return Err(GuardError::CommitmentNotRefreshed {
                action: decision.action.name().to_string(),
            });
        }

        Ok(())
    }

    fn check_injection(&self, text: &str) -> Result<(), GuardError> {
        let lower = text.to_lowercase();
        for pattern in &self.policy.injection_patterns {
            if lower.contains(pattern.as_str()) {
                return Err(GuardError::InjectionDetected {
                    pattern: pattern.clone(),
                });
            }
        }
        Ok(())
    }
}

impl Default for Guard {
    fn default() -> Self {
        Self::new()
    }
}
