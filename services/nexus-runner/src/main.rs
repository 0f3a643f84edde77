//! Nexus Agent Runner
//!
//! Host process for one autonomous agent: loads `agent.config.json`,
//! validates identity and covenant artifact, wires the cycle pipeline,
//! and drives the scheduler until ctrl-c.
//!
//! # Usage
//!
//! ```bash
//! # Start with ./agent.config.json
//! nexus-runner
//!
//! # Custom config and a faster loop
//! nexus-runner --config deploy/treasury.json --interval 5
//!
//! # Environment overrides
//! NEXUS_LLM_PROVIDER=anthropic ANTHROPIC_API_KEY=... nexus-runner
//! ```

mod config;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nexus_agent::{
    AgentBrain, AgentRuntime, CycleOrchestrator, DashboardReporter, MemoryStore, RuntimeConfig,
};
use nexus_chain::{ContractArtifact, ExecutionGateway, RestProvider, RestSigner};
use nexus_guard::{Guard, GuardPolicy};

use crate::config::{RunnerConfig, DEFAULT_CONFIG_PATH};

/// Nexus Agent Runner - autonomous on-chain agent host
#[derive(Parser, Debug)]
#[command(name = "nexus-runner")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the agent configuration file
    #[arg(short, long, env = "NEXUS_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Override the cycle interval in minutes
    #[arg(short, long, env = "NEXUS_INTERVAL_MINUTES")]
    interval: Option<u64>,

    /// Skip the immediate startup cycle and wait a full interval first
    #[arg(long)]
    wait_first: bool,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, env = "NEXUS_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    init_logging(&args.log_level);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %args.config,
        "starting nexus agent runner"
    );

    // Everything below this point and before the runtime loop is
    // startup-fatal: a broken config or artifact exits non-zero.
    let mut config = RunnerConfig::load(&args.config)
        .with_context(|| format!("loading configuration from {}", args.config))?;
    if let Some(minutes) = args.interval {
        config.interval_minutes = minutes.max(1);
    }
    if args.wait_first {
        config.run_at_start = false;
    }

    let identity = config.identity().context("building agent identity")?;

    let artifact = ContractArtifact::from_file(&config.artifact_path)
        .with_context(|| format!("loading artifact {}", config.artifact_path.display()))?;
    anyhow::ensure!(
        artifact.has_function("execute"),
        "artifact {} exposes no execute function",
        artifact.contract_name
    );

    tracing::info!(
        agent = %identity.name,
        address = %identity.contract_address,
        network = %identity.network,
        contract = %artifact.contract_name,
        "identity validated"
    );

    let memory = MemoryStore::open(&config.memory_path)
        .with_context(|| format!("opening memory store {}", config.memory_path.display()))?;

    let gateway = ExecutionGateway::new(
        Arc::new(RestProvider::new(&config.provider_url)),
        Arc::new(RestSigner::new(&config.signer_url)),
    );

    let guard = Guard::with_policy(GuardPolicy {
        max_spend_sats: config.max_spend_sats,
        ..GuardPolicy::default()
    });

    let reporter = match &config.dashboard_url {
        Some(url) => DashboardReporter::new(url, std::env::var("AGENT_API_TOKEN").ok()),
        None => DashboardReporter::from_env(),
    };

    let brain = AgentBrain::from_env();

    let orchestrator =
        CycleOrchestrator::new(identity, brain, guard, gateway, memory, reporter);

    let runtime = AgentRuntime::new(orchestrator).with_config(RuntimeConfig {
        interval: Duration::from_secs(config.interval_minutes * 60),
        run_at_start: config.run_at_start,
    });

    tracing::info!(
        interval_minutes = config.interval_minutes,
        run_at_start = config.run_at_start,
        "runtime armed"
    );

    runtime.run(shutdown_signal()).await;

    tracing::info!("runner shutdown complete");
    Ok(())
}

fn init_logging(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .init();
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for ctrl-c, shutting down");
    }
}
