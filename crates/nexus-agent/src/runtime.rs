//! Agent runtime loop
//!
//! Wraps the orchestrator in a fixed-interval scheduler. Ticks that
//! arrive while a cycle is still running are skipped, never queued, so
//! a slow backend can never cause a burst of back-to-back cycles.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use crate::cycle::CycleOrchestrator;
use crate::report::AgentStatus;

/// Default pause between cycles.
pub const DEFAULT_CYCLE_INTERVAL: Duration = Duration::from_secs(15 * 60);

const SCHEDULED_TRIGGER: &str = "Scheduled maintenance.";
const STARTUP_TRIGGER: &str = "Agent startup.";

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub interval: Duration,
    /// Run one cycle immediately at startup instead of waiting a full
    /// interval for the first tick.
    pub run_at_start: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_CYCLE_INTERVAL,
            run_at_start: true,
        }
    }
}

/// Long-running scheduler for one agent.
pub struct AgentRuntime {
    orchestrator: CycleOrchestrator,
    config: RuntimeConfig,
}

impl AgentRuntime {
    pub fn new(orchestrator: CycleOrchestrator) -> Self {
        Self {
            orchestrator,
            config: RuntimeConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Run cycles until `shutdown` resolves, then report offline and
    /// return. The cycle in flight (if any) completes before exit.
    pub async fn run(self, shutdown: impl Future<Output = ()>) {
        let agent = self.orchestrator.identity().name.clone();
        tracing::info!(
            agent = %agent,
            interval_secs = self.config.interval.as_secs(),
            "runtime started"
        );

        self.orchestrator
            .reporter()
            .report_agent(self.orchestrator.identity())
            .await;
        self.orchestrator
            .reporter()
            .report_status(&agent, AgentStatus::Online)
            .await;

        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tokio::pin!(shutdown);

        // The first tick fires immediately; consume it here when the
        // caller asked to wait a full interval before the first cycle.
        interval.tick().await;
        if self.config.run_at_start {
            self.orchestrator.run_cycle(STARTUP_TRIGGER).await;
        }

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.orchestrator.run_cycle(SCHEDULED_TRIGGER).await;
                }
                _ = &mut shutdown => {
                    tracing::info!(agent = %agent, "shutdown signal received");
                    break;
                }
            }
        }

        self.orchestrator
            .reporter()
            .report_status(&agent, AgentStatus::Offline)
            .await;
        tracing::info!(agent = %agent, "runtime stopped");
    }
}
