//! Backend implementations

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::*;

/// Trait for text-generation backends
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Get the provider kind
    fn kind(&self) -> ProviderKind;

    /// Check if the provider is usable (keys present, endpoint reachable)
    async fn is_available(&self) -> bool;

    /// Complete a request, normalizing the wire envelope to plain text
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}

// ============================================================================
// OpenAI-style provider (flat `choices[0].message.content` envelope)
// ============================================================================

/// Configuration for the OpenAI-style provider. The base URL makes this
/// serve DeepSeek and local OpenAI-compatible servers as well.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
}

impl OpenAiConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            base_url: std::env::var("NEXUS_OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            api_key: Some(std::env::var("OPENAI_API_KEY").ok()?),
            model: std::env::var("NEXUS_OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
        })
    }
}

pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        Some(Self::new(OpenAiConfig::from_env()?))
    }
}

#[derive(Serialize)]
struct OpenAiChatRequest {
    model: String,
    messages: Vec<OpenAiChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Serialize, Deserialize)]
struct OpenAiChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiChatChoice {
    message: OpenAiChatMessage,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn is_available(&self) -> bool {
        self.config.api_key.as_deref().map_or(false, |k| !k.is_empty())
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let mut messages = Vec::new();
        if let Some(ref system) = request.system {
            messages.push(OpenAiChatMessage {
                role: "system".to_string(),
                content: system.clone(),
            });
        }
        messages.push(OpenAiChatMessage {
            role: "user".to_string(),
            content: request.user.clone(),
        });

        let chat_request = OpenAiChatRequest {
            model: request.model.unwrap_or_else(|| self.config.model.clone()),
            messages,
            max_tokens: request.max_tokens,
            response_format: request
                .json_mode
                .then(|| serde_json::json!({"type": "json_object"})),
        };

        let url = format!("{}/chat/completions", self.config.base_url);
        let mut req = self.client.post(&url).json(&chat_request);
        if let Some(ref key) = self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| LlmError::NetworkError {
            message: e.to_string(),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let chat_response: OpenAiChatResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                message: e.to_string(),
            })?;

        let content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "response carried no choices".to_string(),
            })?;

        Ok(CompletionResponse {
            content,
            model: chat_response.model,
        })
    }
}

// ============================================================================
// Anthropic provider (nested content-block envelope)
// ============================================================================

#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

impl AnthropicConfig {
    pub fn from_env() -> Option<Self> {
        Some(Self {
            api_key: std::env::var("ANTHROPIC_API_KEY").ok()?,
            model: std::env::var("NEXUS_ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-3-5-sonnet-20241022".to_string()),
            base_url: std::env::var("NEXUS_ANTHROPIC_BASE_URL")
                .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
        })
    }
}

pub struct AnthropicProvider {
    config: AnthropicConfig,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Option<Self> {
        Some(Self::new(AnthropicConfig::from_env()?))
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "Anthropic"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn is_available(&self) -> bool {
        !self.config.api_key.is_empty()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        // Anthropic has no response_format switch; the system prompt is
        // responsible for demanding JSON when json_mode is set.
        let system = if request.json_mode {
            Some(format!(
                "{}\n\nRespond with a single valid JSON object and nothing else.",
                request.system.clone().unwrap_or_default()
            ))
        } else {
            request.system.clone()
        };

        let wire_request = AnthropicRequest {
            model: request.model.unwrap_or_else(|| self.config.model.clone()),
            max_tokens: request.max_tokens.unwrap_or(1024),
            system,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: request.user.clone(),
            }],
        };

        let url = format!("{}/v1/messages", self.config.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&wire_request)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let wire_response: AnthropicResponse =
            response.json().await.map_err(|e| LlmError::InvalidResponse {
                message: e.to_string(),
            })?;

        let content = wire_response
            .content
            .first()
            .map(|block| block.text.clone())
            .ok_or_else(|| LlmError::InvalidResponse {
                message: "response carried no content blocks".to_string(),
            })?;

        Ok(CompletionResponse {
            content,
            model: wire_response.model,
        })
    }
}

// ============================================================================
// Deterministic provider (no network, always idles)
// ============================================================================

/// Fallback backend used when no API key is configured. Always proposes
/// the idle action, which every downstream consumer accepts trivially.
#[derive(Debug, Default, Clone)]
pub struct DeterministicProvider;

impl DeterministicProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LlmProvider for DeterministicProvider {
    fn name(&self) -> &'static str {
        "Deterministic"
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Deterministic
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse> {
        Ok(CompletionResponse::new(
            r#"{"action": "idle", "params": [], "reasoning": "deterministic backend: no model configured"}"#,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_envelope_normalizes_to_flat_content() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4o",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "{\"action\":\"idle\"}"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let parsed: OpenAiChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content,
            "{\"action\":\"idle\"}"
        );
        assert_eq!(parsed.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn anthropic_envelope_normalizes_content_blocks() {
        let raw = r#"{
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-sonnet-20241022",
            "content": [{"type": "text", "text": "{\"action\":\"idle\"}"}],
            "usage": {"input_tokens": 10, "output_tokens": 5}
        }"#;
        let parsed: AnthropicResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.content[0].text, "{\"action\":\"idle\"}");
    }

    #[test]
    fn empty_envelopes_are_invalid() {
        let raw = r#"{"choices": []}"#;
        let parsed: OpenAiChatResponse = serde_json::from_str(raw).unwrap();
        assert!(parsed.choices.first().is_none());
    }

    #[tokio::test]
    async fn deterministic_provider_always_idles() {
        let provider = DeterministicProvider::new();
        assert!(provider.is_available().await);
        let response = provider
            .complete(CompletionRequest::new("decide"))
            .await
            .unwrap();
        assert!(response.content.contains("\"idle\""));
    }
}
