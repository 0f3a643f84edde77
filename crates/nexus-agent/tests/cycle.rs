//! End-to-end cycle tests with scripted collaborators.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use nexus_agent::{AgentBrain, CycleOrchestrator, DashboardReporter, MemoryStore};
use nexus_chain::{
    ExecutionGateway, NetworkProvider, ProviderError, SignedTransaction, Signer, SignerError,
    TokenData, TxPlan, Utxo,
};
use nexus_guard::Guard;
use nexus_llm::{
    CompletionRequest, CompletionResponse, LlmProvider, LlmRouter, ProviderKind,
};
use nexus_types::{
    AgentId, AgentIdentity, CashAddress, CycleOutcome, Network, PublicKey, StateCommitment, TxId,
};

fn testnet_addr() -> String {
    format!("bchtest:{}", "q".repeat(42))
}

fn payee_addr() -> String {
    format!("bchtest:{}", "p".repeat(42))
}

fn identity() -> AgentIdentity {
    AgentIdentity {
        name: "cycle-test".to_string(),
        agent_id: AgentId::derive("cycle-test"),
        owner_pubkey: PublicKey::from_hex(&format!("02{}", "ab".repeat(32))).unwrap(),
        contract_address: CashAddress::parse(&testnet_addr()).unwrap(),
        network: Network::Testnet,
    }
}

fn funded_utxos() -> Vec<Utxo> {
    vec![
        Utxo {
            txid: TxId::new("aa".repeat(32)),
            vout: 0,
            sats: 1_000,
            token: Some(TokenData {
                category: "cat".to_string(),
                commitment: StateCommitment::from_hex("deadbeef").unwrap(),
            }),
        },
        Utxo {
            txid: TxId::new("bb".repeat(32)),
            vout: 1,
            sats: 900_000,
            token: None,
        },
    ]
}

/// Network provider serving a fixed UTXO set and counting broadcasts.
struct ScriptedProvider {
    utxos: Result<Vec<Utxo>, String>,
    broadcasts: AtomicUsize,
}

impl ScriptedProvider {
    fn funded() -> Self {
        Self {
            utxos: Ok(funded_utxos()),
            broadcasts: AtomicUsize::new(0),
        }
    }

    fn unreachable_chain() -> Self {
        Self {
            utxos: Err("connection refused".to_string()),
            broadcasts: AtomicUsize::new(0),
        }
    }

    fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkProvider for ScriptedProvider {
    async fn get_utxos(&self, _address: &CashAddress) -> Result<Vec<Utxo>, ProviderError> {
        match &self.utxos {
            Ok(utxos) => Ok(utxos.clone()),
            Err(message) => Err(ProviderError::Network {
                message: message.clone(),
            }),
        }
    }

    async fn broadcast(&self, _tx: &SignedTransaction) -> Result<TxId, ProviderError> {
        self.broadcasts.fetch_add(1, Ordering::SeqCst);
        Ok(TxId::new("fedcba9876543210".repeat(4)))
    }
}

struct StubSigner;

#[async_trait]
impl Signer for StubSigner {
    async fn sign(&self, _plan: &TxPlan) -> Result<SignedTransaction, SignerError> {
        Ok(SignedTransaction {
            hex: "00".to_string(),
        })
    }
}

/// Decision backend returning a fixed response, counting calls and
/// keeping the prompts it was shown.
struct ScriptedModel {
    content: String,
    calls: AtomicUsize,
    prompts: std::sync::Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            calls: AtomicUsize::new(0),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LlmProvider for ScriptedModel {
    fn name(&self) -> &'static str {
        "ScriptedModel"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, request: CompletionRequest) -> nexus_llm::Result<CompletionResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .unwrap()
            .push(request.system.unwrap_or_default());
        Ok(CompletionResponse::new(self.content.clone()))
    }
}

struct Harness {
    orchestrator: CycleOrchestrator,
    provider: Arc<ScriptedProvider>,
    model: Arc<ScriptedModel>,
    _dir: tempfile::TempDir,
}

fn harness(provider: ScriptedProvider, model: ScriptedModel) -> Harness {
    let provider = Arc::new(provider);
    let model = Arc::new(model);
    let dir = tempfile::tempdir().unwrap();
    let memory = MemoryStore::open(dir.path().join("memory")).unwrap();
    let orchestrator = CycleOrchestrator::new(
        identity(),
        AgentBrain::new(LlmRouter::new(model.clone())),
        Guard::new(),
        ExecutionGateway::new(provider.clone(), Arc::new(StubSigner)),
        memory,
        DashboardReporter::disabled(),
    );
    Harness {
        orchestrator,
        provider,
        model,
        _dir: dir,
    }
}

#[tokio::test]
async fn over_limit_transfer_is_rejected_without_broadcast() {
    let h = harness(
        ScriptedProvider::funded(),
        ScriptedModel::new(format!(
            r#"{{"action": "transfer", "params": ["{}", 600000], "reasoning": "big spend"}}"#,
            payee_addr()
        )),
    );

    let outcome = h.orchestrator.run_cycle("test").await;
    match outcome {
        CycleOutcome::Rejected { reason } => assert!(reason.contains("exceeds")),
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(h.provider.broadcast_count(), 0);
    assert_eq!(h.model.call_count(), 1);

    // The rejection is remembered: the next cycle's prompt carries it.
    h.orchestrator.run_cycle("test").await;
    assert!(h.model.last_prompt().contains("rejected"));
}

#[tokio::test]
async fn in_limit_transfer_is_executed() {
    let h = harness(
        ScriptedProvider::funded(),
        ScriptedModel::new(format!(
            r#"{{"action": "transfer", "params": ["{}", 50000], "reasoning": "pay invoice"}}"#,
            payee_addr()
        )),
    );

    let outcome = h.orchestrator.run_cycle("test").await;
    match &outcome {
        CycleOutcome::Executed { action, txid } => {
            assert_eq!(action, "transfer");
            assert_eq!(txid.short(), "fedcba98");
        }
        other => panic!("expected execution, got {other:?}"),
    }
    assert_eq!(h.provider.broadcast_count(), 1);
    assert_eq!(
        outcome.summary("pay invoice"),
        "transfer - pay invoice (TX: fedcba98)"
    );

    // The memory entry records the action and the truncated txid.
    h.orchestrator.run_cycle("test").await;
    let prompt = h.model.last_prompt();
    assert!(prompt.contains("transfer - pay invoice (TX: fedcba98)"));
}

#[tokio::test]
async fn sync_failure_skips_the_model_entirely() {
    let h = harness(
        ScriptedProvider::unreachable_chain(),
        ScriptedModel::new(r#"{"action": "idle", "params": [], "reasoning": "unused"}"#),
    );

    let outcome = h.orchestrator.run_cycle("test").await;
    match outcome {
        CycleOutcome::Failed { kind, .. } => assert_eq!(kind, "state_sync"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(h.model.call_count(), 0);
    assert_eq!(h.provider.broadcast_count(), 0);
}

#[tokio::test]
async fn malformed_model_output_idles() {
    let h = harness(
        ScriptedProvider::funded(),
        ScriptedModel::new("I think we should probably send everything somewhere."),
    );

    let outcome = h.orchestrator.run_cycle("test").await;
    match outcome {
        CycleOutcome::Idle { reasoning } => assert!(reasoning.contains("fallback")),
        other => panic!("expected idle fallback, got {other:?}"),
    }
    assert_eq!(h.provider.broadcast_count(), 0);
}

#[tokio::test]
async fn idle_decision_produces_idle_outcome() {
    let h = harness(
        ScriptedProvider::funded(),
        ScriptedModel::new(r#"{"action": "idle", "params": [], "reasoning": "reserves healthy"}"#),
    );

    let outcome = h.orchestrator.run_cycle("test").await;
    assert_eq!(
        outcome,
        CycleOutcome::Idle {
            reasoning: "reserves healthy".to_string()
        }
    );
    assert_eq!(h.provider.broadcast_count(), 0);
}

#[tokio::test]
async fn update_state_refreshes_the_commitment() {
    let h = harness(
        ScriptedProvider::funded(),
        ScriptedModel::new(
            r#"{"action": "updateState", "params": ["cafebabe"], "reasoning": "milestone"}"#,
        ),
    );

    let outcome = h.orchestrator.run_cycle("test").await;
    match outcome {
        CycleOutcome::Executed { action, .. } => assert_eq!(action, "updateState"),
        other => panic!("expected execution, got {other:?}"),
    }
    assert_eq!(h.provider.broadcast_count(), 1);
}

#[tokio::test]
async fn wrong_network_destination_is_rejected() {
    let mainnet = format!("bitcoincash:{}", "q".repeat(42));
    let h = harness(
        ScriptedProvider::funded(),
        ScriptedModel::new(format!(
            r#"{{"action": "transfer", "params": ["{mainnet}", 10000], "reasoning": "cross network"}}"#
        )),
    );

    let outcome = h.orchestrator.run_cycle("test").await;
    assert!(matches!(outcome, CycleOutcome::Rejected { .. }));
    assert_eq!(h.provider.broadcast_count(), 0);
}

#[tokio::test]
async fn failing_cycle_does_not_poison_the_next() {
    let h = harness(
        ScriptedProvider::funded(),
        ScriptedModel::new(format!(
            r#"{{"action": "transfer", "params": ["{}", 600000], "reasoning": "big spend"}}"#,
            payee_addr()
        )),
    );

    let first = h.orchestrator.run_cycle("test").await;
    assert!(matches!(first, CycleOutcome::Rejected { .. }));

    // Same scripted decision, same rejection, cleanly repeated.
    let second = h.orchestrator.run_cycle("test").await;
    assert!(matches!(second, CycleOutcome::Rejected { .. }));
    assert_eq!(h.provider.broadcast_count(), 0);
    assert_eq!(h.model.call_count(), 2);
}
