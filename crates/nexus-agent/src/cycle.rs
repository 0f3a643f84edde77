//! Cycle orchestration
//!
//! One cycle runs the fixed pipeline: sync chain state, load memory,
//! decide, guard, execute (mutating actions only), remember, report.
//! The orchestrator owns the ordering and the error taxonomy; the
//! stages own their own semantics.

use nexus_chain::{ExecutionGateway, ExecutionRequest};
use nexus_guard::{Guard, Verdict};
use nexus_types::{AgentIdentity, CycleOutcome, Decision, StateCommitment};

use crate::brain::AgentBrain;
use crate::memory::MemoryStore;
use crate::report::{AgentStatus, DashboardReporter};

/// Drives one full decision cycle for a single agent.
pub struct CycleOrchestrator {
    identity: AgentIdentity,
    brain: AgentBrain,
    guard: Guard,
    gateway: ExecutionGateway,
    memory: MemoryStore,
    reporter: DashboardReporter,
}

impl CycleOrchestrator {
    pub fn new(
        identity: AgentIdentity,
        brain: AgentBrain,
        guard: Guard,
        gateway: ExecutionGateway,
        memory: MemoryStore,
        reporter: DashboardReporter,
    ) -> Self {
        Self {
            identity,
            brain,
            guard,
            gateway,
            memory,
            reporter,
        }
    }

    pub fn identity(&self) -> &AgentIdentity {
        &self.identity
    }

    pub fn reporter(&self) -> &DashboardReporter {
        &self.reporter
    }

    /// Run one cycle end to end. Never panics and never returns an
    /// error: every failure mode is folded into the outcome.
    pub async fn run_cycle(&self, trigger: &str) -> CycleOutcome {
        let agent = self.identity.name.as_str();
        tracing::info!(agent, trigger, "cycle started");

        // State sync failure means the agent is blind; skip the brain
        // entirely rather than decide on stale data.
        let state = match self.gateway.sync_state(&self.identity).await {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(agent, error = %err, "chain state sync failed");
                let outcome = CycleOutcome::Failed {
                    kind: "state_sync".to_string(),
                    message: err.to_string(),
                };
                self.finish(&outcome, "state unavailable").await;
                return outcome;
            }
        };

        tracing::info!(
            agent,
            balance_sats = state.balance_sats,
            commitment = %state.commitment,
            "chain state synced"
        );

        let history = self.memory.load(agent);
        let decision = self.brain.decide(&self.identity, &state, &history, trigger).await;
        tracing::info!(
            agent,
            ai = true,
            action = decision.action.name(),
            reasoning = %decision.reasoning,
            "decision made"
        );

        // Every decision passes the guard, idle included.
        if let Verdict::Rejected { reason } = self.guard.check(&decision, &self.identity, &state) {
            let outcome = CycleOutcome::Rejected { reason };
            self.finish(&outcome, &decision.reasoning).await;
            return outcome;
        }

        let outcome = if decision.action.mutates_chain() {
            self.execute(&decision, &state.commitment).await
        } else {
            CycleOutcome::Idle {
                reasoning: decision.reasoning.clone(),
            }
        };

        self.finish(&outcome, &decision.reasoning).await;
        outcome
    }

    async fn execute(
        &self,
        decision: &Decision,
        prev_commitment: &StateCommitment,
    ) -> CycleOutcome {
        let next_commitment = match decision.planned_commitment(prev_commitment) {
            Ok(commitment) => commitment,
            Err(err) => {
                // The guard validates commitments before this point, so
                // reaching here would mean the two disagree.
                return CycleOutcome::Failed {
                    kind: "commitment".to_string(),
                    message: err.to_string(),
                };
            }
        };

        let request = ExecutionRequest {
            action: decision.action.clone(),
            next_commitment,
        };

        match self.gateway.execute(&self.identity, &request).await {
            Ok(txid) => CycleOutcome::Executed {
                action: decision.action.name().to_string(),
                txid,
            },
            Err(err) => {
                tracing::error!(
                    agent = %self.identity.name,
                    action = decision.action.name(),
                    error = %err,
                    "execution failed"
                );
                CycleOutcome::Failed {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                }
            }
        }
    }

    /// Record the outcome in memory, then mirror it to the dashboard.
    async fn finish(&self, outcome: &CycleOutcome, reasoning: &str) {
        let agent = self.identity.name.as_str();
        let summary = outcome.summary(reasoning);
        self.memory.append(agent, summary.clone());
        tracing::info!(agent, %summary, "cycle finished");

        self.reporter.report_log(agent, &summary).await;
        let status = if outcome.is_failure() {
            AgentStatus::Error
        } else {
            AgentStatus::Online
        };
        self.reporter.report_status(agent, status).await;
    }
}
