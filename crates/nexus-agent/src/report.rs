//! Dashboard reporting
//!
//! Fire-and-forget mirror of agent activity to an optional HTTP
//! dashboard. Reporting never influences the cycle: every method
//! returns unit and logs failures at warn level. When no endpoint is
//! configured the reporter is a no-op.

use std::time::Duration;

use serde::Serialize;

use nexus_types::AgentIdentity;

/// Hard cap on one report round-trip. A dashboard that accepts the
/// connection but never answers must not hold the cycle hostage.
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle state pushed to the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Online,
    Offline,
    Error,
}

#[derive(Serialize)]
struct RegisterBody<'a> {
    name: &'a str,
    address: String,
    network: String,
}

#[derive(Serialize)]
struct LogBody<'a> {
    agent: &'a str,
    message: &'a str,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    agent: &'a str,
    status: AgentStatus,
}

/// HTTP reporter for the agent dashboard. Optional and best-effort.
pub struct DashboardReporter {
    base_url: Option<String>,
    token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
}

impl DashboardReporter {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: Some(base_url.into().trim_end_matches('/').to_string()),
            token,
            client: reqwest::Client::new(),
            timeout: REPORT_TIMEOUT,
        }
    }

    /// Reporter with no endpoint; every call is a silent no-op.
    pub fn disabled() -> Self {
        Self {
            base_url: None,
            token: None,
            client: reqwest::Client::new(),
            timeout: REPORT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configure from `AGENT_API_URL` / `AGENT_API_TOKEN`, disabled when
    /// the URL is unset.
    pub fn from_env() -> Self {
        match std::env::var("AGENT_API_URL") {
            Ok(url) if !url.trim().is_empty() => {
                Self::new(url, std::env::var("AGENT_API_TOKEN").ok())
            }
            _ => Self::disabled(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    /// Register the agent at startup.
    pub async fn report_agent(&self, identity: &AgentIdentity) {
        let body = RegisterBody {
            name: &identity.name,
            address: identity.contract_address.to_string(),
            network: identity.network.to_string(),
        };
        self.post("/agents", &body).await;
    }

    /// Push one cycle summary line.
    pub async fn report_log(&self, agent: &str, message: &str) {
        let body = LogBody { agent, message };
        self.post("/agents/logs", &body).await;
    }

    /// Push a lifecycle status change.
    pub async fn report_status(&self, agent: &str, status: AgentStatus) {
        let body = StatusBody { agent, status };
        self.patch("/agents/status", &body).await;
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) {
        let Some(base) = &self.base_url else { return };
        let mut request = self.client.post(format!("{base}{path}")).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        self.dispatch(path, request).await;
    }

    async fn patch<T: Serialize>(&self, path: &str, body: &T) {
        let Some(base) = &self.base_url else { return };
        let mut request = self.client.patch(format!("{base}{path}")).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        self.dispatch(path, request).await;
    }

    async fn dispatch(&self, path: &str, request: reqwest::RequestBuilder) {
        match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(Ok(response)) => {
                if let Err(err) = response.error_for_status() {
                    tracing::warn!(path, error = %err, "dashboard report failed");
                }
            }
            Ok(Err(err)) => {
                tracing::warn!(path, error = %err, "dashboard report failed");
            }
            Err(_) => {
                tracing::warn!(
                    path,
                    timeout_secs = self.timeout.as_secs(),
                    "dashboard report timed out"
                );
            }
        }
    }
}
