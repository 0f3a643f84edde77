//! Router - selects a backend from configuration

use std::sync::Arc;

use crate::providers::*;
use crate::types::*;

/// Owns the selected backend and hands requests through to it.
pub struct LlmRouter {
    provider: Arc<dyn LlmProvider>,
    kind: ProviderKind,
}

impl LlmRouter {
    /// Wrap an explicit provider (used by tests and embedders).
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        let kind = provider.kind();
        Self { provider, kind }
    }

    /// Create a router from environment variables.
    ///
    /// Reads `NEXUS_LLM_PROVIDER` to select the backend:
    /// - `openai` / `deepseek` / `local`: OpenAI-style chat completions
    /// - `anthropic`: Anthropic messages API
    /// - `deterministic`: no model configured, always idles
    ///
    /// A selected backend with no API key degrades to deterministic.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let kind = std::env::var("NEXUS_LLM_PROVIDER")
            .ok()
            .and_then(|v| ProviderKind::parse(&v))
            .unwrap_or(ProviderKind::Deterministic);

        Self::from_kind(kind)
    }

    pub fn from_kind(kind: ProviderKind) -> Self {
        let provider: Arc<dyn LlmProvider> = match kind {
            ProviderKind::OpenAi => {
                if let Some(p) = OpenAiProvider::from_env() {
                    Arc::new(p)
                } else {
                    tracing::warn!("OpenAI API key not found, using deterministic fallback");
                    Arc::new(DeterministicProvider::new())
                }
            }
            ProviderKind::Anthropic => {
                if let Some(p) = AnthropicProvider::from_env() {
                    Arc::new(p)
                } else {
                    tracing::warn!("Anthropic API key not found, using deterministic fallback");
                    Arc::new(DeterministicProvider::new())
                }
            }
            ProviderKind::Deterministic => Arc::new(DeterministicProvider::new()),
        };

        Self::new(provider)
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    pub async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.provider.complete(request).await
    }
}

impl Default for LlmRouter {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_router_is_always_available() {
        let router = LlmRouter::from_kind(ProviderKind::Deterministic);
        assert_eq!(router.kind(), ProviderKind::Deterministic);
        assert!(router.is_available().await);

        let response = router
            .complete(CompletionRequest::new("decide"))
            .await
            .unwrap();
        assert!(response.content.contains("idle"));
    }

    #[tokio::test]
    async fn router_wraps_custom_provider() {
        struct Fixed;

        #[async_trait::async_trait]
        impl LlmProvider for Fixed {
            fn name(&self) -> &'static str {
                "Fixed"
            }
            fn kind(&self) -> ProviderKind {
                ProviderKind::OpenAi
            }
            async fn is_available(&self) -> bool {
                true
            }
            async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
                Ok(CompletionResponse::new("fixed"))
            }
        }

        let router = LlmRouter::new(Arc::new(Fixed));
        assert_eq!(router.kind(), ProviderKind::OpenAi);
        let response = router
            .complete(CompletionRequest::new("anything"))
            .await
            .unwrap();
        assert_eq!(response.content, "fixed");
    }
}
