//! Decision engine
//!
//! Builds a bounded prompt from identity, chain state, and recent memory,
//! asks the configured backend for a `{action, params, reasoning}` object,
//! and validates the answer against the action catalog. This is the trust
//! boundary of the whole system: a malformed or hostile response is an
//! expected condition, absorbed here as an idle fallback, never an error
//! the orchestrator has to handle.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use nexus_llm::{CompletionRequest, LlmRouter};
use nexus_types::{ActionCatalog, ActionParseError, AgentAction, AgentIdentity, ChainState, Decision, MemoryEntry};

/// Upper bound on one backend round-trip.
pub const DECISION_TIMEOUT: Duration = Duration::from_secs(30);

/// History entries embedded in the prompt, newest last.
const PROMPT_HISTORY_LIMIT: usize = 10;

#[derive(Error, Debug)]
enum DecisionParseError {
    #[error("response is not a JSON object: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error(transparent)]
    Action(#[from] ActionParseError),
}

#[derive(Deserialize)]
struct RawDecision {
    action: String,
    #[serde(default)]
    params: Vec<serde_json::Value>,
    #[serde(default)]
    reasoning: String,
}

/// The agent's decision engine.
pub struct AgentBrain {
    llm: LlmRouter,
    timeout: Duration,
}

impl AgentBrain {
    pub fn new(llm: LlmRouter) -> Self {
        Self {
            llm,
            timeout: DECISION_TIMEOUT,
        }
    }

    pub fn from_env() -> Self {
        Self::new(LlmRouter::from_env())
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Decide the next action. Infallible by contract: every failure mode
    /// resolves to the idle fallback.
    pub async fn decide(
        &self,
        identity: &AgentIdentity,
        state: &ChainState,
        history: &[MemoryEntry],
        trigger: &str,
    ) -> Decision {
        let request = CompletionRequest::new("Analyze state and decide next action.")
            .with_system(render_system_prompt(identity, state, history, trigger))
            .with_max_tokens(512)
            .with_json_mode();

        let content = match tokio::time::timeout(self.timeout, self.llm.complete(request)).await {
            Ok(Ok(response)) => response.content,
            Ok(Err(err)) => {
                tracing::warn!(agent = %identity.name, error = %err, "decision backend failed");
                return Decision::fallback();
            }
            Err(_) => {
                tracing::warn!(
                    agent = %identity.name,
                    timeout_secs = self.timeout.as_secs(),
                    "decision backend timed out"
                );
                return Decision::fallback();
            }
        };

        match parse_decision(&content) {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(
                    agent = %identity.name,
                    error = %err,
                    "malformed decision response, falling back to idle"
                );
                Decision::fallback()
            }
        }
    }
}

/// Strip markdown code fences some models wrap around JSON.
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
}

fn parse_decision(content: &str) -> Result<Decision, DecisionParseError> {
    let raw: RawDecision = serde_json::from_str(strip_code_fences(content))?;
    let action = AgentAction::from_raw(&raw.action, &raw.params)?;
    Ok(Decision::new(action, raw.reasoning))
}

fn render_system_prompt(
    identity: &AgentIdentity,
    state: &ChainState,
    history: &[MemoryEntry],
    trigger: &str,
) -> String {
    let mut menu = String::new();
    for spec in ActionCatalog::specs() {
        let params: Vec<String> = spec.params.iter().map(|p| format!("{:?}", p)).collect();
        menu.push_str(&format!(
            "- {}: params [{}]{}\n",
            spec.name,
            params.join(", "),
            if spec.mutates_chain {
                ""
            } else {
                " (do nothing; always safe)"
            }
        ));
    }

    let history_text = if history.is_empty() {
        String::new()
    } else {
        let start = history.len().saturating_sub(PROMPT_HISTORY_LIMIT);
        let lines: Vec<String> = history[start..]
            .iter()
            .enumerate()
            .map(|(i, entry)| format!("{}. {}", i + 1, entry.summary))
            .collect();
        format!("\nRecent History:\n{}", lines.join("\n"))
    };

    format!(
        "You are an autonomous on-chain agent on the Bitcoin Cash network.\n\
         Your goal is to manage funds, execute covenant functions, and maintain\n\
         your on-chain state commitment to achieve your mission.\n\n\
         Available Actions:\n{menu}\n\
         Strategic Guidelines:\n\
         1. Efficiency: only spend when necessary for the mission.\n\
         2. Security: never send funds to unknown or risky addresses.\n\
         3. State: refresh your state commitment to keep an on-chain audit trail.\n\n\
         Current Context:\n\
         Agent: {name}\n\
         Address: {address}\n\
         Network: {network}\n\
         Current Balance: {balance} satoshis\n\
         Current State (Commitment): {commitment}\n\
         Trigger: {trigger}\n\
         {history_text}\n\n\
         Respond ONLY with a syntactically correct JSON object:\n\
         {{\"action\": \"action_name\", \"params\": [], \"reasoning\": \"one sentence\"}}",
        menu = menu,
        name = identity.name,
        address = identity.contract_address,
        network = identity.network,
        balance = state.balance_sats,
        commitment = state.commitment,
        trigger = trigger,
        history_text = history_text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use nexus_llm::{CompletionResponse, LlmError, LlmProvider, ProviderKind};
    use nexus_types::{AgentId, CashAddress, Network, PublicKey, StateCommitment};
    use std::sync::Arc;

    fn identity() -> AgentIdentity {
        AgentIdentity {
            name: "brain-test".to_string(),
            agent_id: AgentId::derive("brain-test"),
            owner_pubkey: PublicKey::from_hex(&format!("02{}", "11".repeat(32))).unwrap(),
            contract_address: CashAddress::parse(&format!("bchtest:{}", "q".repeat(42))).unwrap(),
            network: Network::Testnet,
        }
    }

    fn state() -> ChainState {
        ChainState {
            balance_sats: 100_000,
            commitment: StateCommitment::empty(),
        }
    }

    struct Scripted {
        content: &'static str,
    }

    #[async_trait]
    impl LlmProvider for Scripted {
        fn name(&self) -> &'static str {
            "Scripted"
        }
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> nexus_llm::Result<CompletionResponse> {
            Ok(CompletionResponse::new(self.content))
        }
    }

    struct Failing;

    #[async_trait]
    impl LlmProvider for Failing {
        fn name(&self) -> &'static str {
            "Failing"
        }
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }
        async fn is_available(&self) -> bool {
            false
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> nexus_llm::Result<CompletionResponse> {
            Err(LlmError::NetworkError {
                message: "connection refused".to_string(),
            })
        }
    }

    struct Stalled;

    #[async_trait]
    impl LlmProvider for Stalled {
        fn name(&self) -> &'static str {
            "Stalled"
        }
        fn kind(&self) -> ProviderKind {
            ProviderKind::OpenAi
        }
        async fn is_available(&self) -> bool {
            true
        }
        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> nexus_llm::Result<CompletionResponse> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            unreachable!("sleep outlives every test timeout")
        }
    }

    fn brain(provider: impl LlmProvider + 'static) -> AgentBrain {
        AgentBrain::new(LlmRouter::new(Arc::new(provider)))
    }

    #[tokio::test]
    async fn well_formed_response_parses() {
        let b = brain(Scripted {
            content: r#"{"action": "transfer", "params": ["bchtest:qabc", 50000], "reasoning": "pay invoice"}"#,
        });
        let decision = b.decide(&identity(), &state(), &[], "test").await;
        assert_eq!(
            decision.action,
            AgentAction::Transfer {
                to: "bchtest:qabc".to_string(),
                sats: 50_000
            }
        );
        assert_eq!(decision.reasoning, "pay invoice");
    }

    #[tokio::test]
    async fn code_fenced_response_parses() {
        let b = brain(Scripted {
            content: "```json\n{\"action\": \"idle\", \"params\": [], \"reasoning\": \"nothing to do\"}\n```",
        });
        let decision = b.decide(&identity(), &state(), &[], "test").await;
        assert_eq!(decision.action, AgentAction::Idle);
        assert_eq!(decision.reasoning, "nothing to do");
    }

    #[tokio::test]
    async fn legacy_stay_idle_spelling_parses() {
        let b = brain(Scripted {
            content: r#"{"action": "stayIdle", "params": [], "reasoning": "holding"}"#,
        });
        let decision = b.decide(&identity(), &state(), &[], "test").await;
        assert_eq!(decision.action, AgentAction::Idle);
    }

    #[tokio::test]
    async fn garbage_falls_back_to_idle() {
        for content in [
            "The agent should probably transfer some funds.",
            "{\"action\": \"selfDestruct\", \"params\": [], \"reasoning\": \"boom\"}",
            "{\"action\": \"transfer\", \"params\": [\"addr\"], \"reasoning\": \"missing amount\"}",
            "{\"action\": \"transfer\", \"params\": [50000, \"addr\"], \"reasoning\": \"swapped\"}",
            "{}",
            "",
        ] {
            let b = brain(Scripted {
                content: Box::leak(content.to_string().into_boxed_str()),
            });
            let decision = b.decide(&identity(), &state(), &[], "test").await;
            assert_eq!(decision, Decision::fallback(), "content: {content:?}");
        }
    }

    #[tokio::test]
    async fn backend_failure_falls_back_to_idle() {
        let b = brain(Failing);
        let decision = b.decide(&identity(), &state(), &[], "test").await;
        assert_eq!(decision, Decision::fallback());
    }

    #[tokio::test]
    async fn backend_stall_hits_timeout_fallback() {
        let b = brain(Stalled).with_timeout(Duration::from_millis(50));
        let decision = b.decide(&identity(), &state(), &[], "test").await;
        assert_eq!(decision, Decision::fallback());
    }

    #[test]
    fn prompt_embeds_context_and_bounded_history() {
        let history: Vec<MemoryEntry> = (0..25)
            .map(|i| MemoryEntry::new(format!("entry {i}")))
            .collect();
        let prompt = render_system_prompt(&identity(), &state(), &history, "startup");
        assert!(prompt.contains("brain-test"));
        assert!(prompt.contains("100000 satoshis"));
        assert!(prompt.contains("Trigger: startup"));
        assert!(prompt.contains("entry 24"));
        // Only the newest PROMPT_HISTORY_LIMIT entries survive.
        assert!(!prompt.contains("entry 14"));
        assert!(prompt.contains("entry 15"));
    }

    #[test]
    fn fence_stripping() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
    }
}
