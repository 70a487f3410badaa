//! Language-Model Gateway — the single point of entry for all model calls.
//!
//! ARCHITECTURAL RULE: no other module may talk to a provider API directly.
//! Components depend on the `LanguageModel` trait, carried in `AppState` as
//! `Arc<dyn LanguageModel>`, so tests can substitute a scripted gateway and
//! the provider can be swapped without touching any pipeline code.
//!
//! The model selection is an immutable constructor argument, never a
//! process-global: concurrent analysis runs cannot race on provider choice.

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// The gateway abstraction every pipeline component depends on: send a
/// prompt, get generated text back. Implementations own retries, timeouts,
/// and provider plumbing.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError>;
}

/// Calls the gateway and deserializes the text response as JSON.
/// The prompt must instruct the model to return valid JSON.
pub async fn complete_json<T: DeserializeOwned>(
    llm: &dyn LanguageModel,
    prompt: &str,
    system: &str,
) -> Result<T, LlmError> {
    let text = llm.complete(prompt, system).await?;
    let text = strip_json_fences(&text);
    serde_json::from_str(text).map_err(LlmError::Parse)
}

/// Immutable model/provider selection, fixed at client construction.
#[derive(Debug, Clone)]
pub struct ModelSelection {
    pub model: String,
    pub max_tokens: u32,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5".to_string(),
            max_tokens: 4096,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Production gateway backed by the Anthropic Messages API.
/// Retries 429 and 5xx responses with exponential backoff; every request
/// carries a bounded timeout so a hung call becomes a step failure upstream,
/// never a hang.
#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    selection: ModelSelection,
}

impl AnthropicClient {
    pub fn new(api_key: String, selection: ModelSelection, timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(timeout_secs))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
            selection,
        }
    }

    pub fn model(&self) -> &str {
        &self.selection.model
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    async fn complete(&self, prompt: &str, system: &str) -> Result<String, LlmError> {
        let request_body = AnthropicRequest {
            model: &self.selection.model,
            max_tokens: self.selection.max_tokens,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "Gateway call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Gateway API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: AnthropicResponse = response.json().await?;

            debug!(
                "Gateway call succeeded: input_tokens={}, output_tokens={}",
                parsed.usage.input_tokens, parsed.usage.output_tokens
            );

            let text = parsed
                .content
                .iter()
                .find(|b| b.block_type == "text")
                .and_then(|b| b.text.clone());

            return match text {
                Some(t) if !t.trim().is_empty() => Ok(t),
                _ => Err(LlmError::EmptyContent),
            };
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    for prefix in ["```json", "```"] {
        if let Some(stripped) = text.strip_prefix(prefix) {
            let stripped = stripped.trim_start();
            return stripped
                .strip_suffix("```")
                .map(|s| s.trim())
                .unwrap_or(stripped);
        }
    }
    text
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted gateways for unit tests. Components are tested against these
    //! instead of the live API.

    use super::*;

    /// Always returns the same canned response.
    pub struct StaticGateway(pub String);

    #[async_trait]
    impl LanguageModel for StaticGateway {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            Ok(self.0.clone())
        }
    }

    /// Routes on a substring of the prompt, so concurrent callers each get
    /// the right canned response regardless of scheduling order.
    pub struct RoutedGateway {
        routes: Vec<(&'static str, String)>,
    }

    impl RoutedGateway {
        pub fn new(routes: Vec<(&'static str, String)>) -> Self {
            Self { routes }
        }
    }

    #[async_trait]
    impl LanguageModel for RoutedGateway {
        async fn complete(&self, prompt: &str, _system: &str) -> Result<String, LlmError> {
            for (needle, response) in &self.routes {
                if prompt.contains(needle) {
                    return Ok(response.clone());
                }
            }
            Err(LlmError::EmptyContent)
        }
    }

    /// Simulates an outage: every call fails with a server error.
    pub struct DownGateway;

    #[async_trait]
    impl LanguageModel for DownGateway {
        async fn complete(&self, _prompt: &str, _system: &str) -> Result<String, LlmError> {
            Err(LlmError::Api {
                status: 503,
                message: "gateway unavailable".to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::StaticGateway;
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[derive(Deserialize)]
    struct Payload {
        value: u32,
    }

    #[tokio::test]
    async fn test_complete_json_parses_fenced_output() {
        let gateway = StaticGateway("```json\n{\"value\": 7}\n```".to_string());
        let payload: Payload = complete_json(&gateway, "prompt", "system").await.unwrap();
        assert_eq!(payload.value, 7);
    }

    #[tokio::test]
    async fn test_complete_json_surfaces_parse_error() {
        let gateway = StaticGateway("this is not json".to_string());
        let result: Result<Payload, _> = complete_json(&gateway, "prompt", "system").await;
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[test]
    fn test_default_model_selection() {
        let selection = ModelSelection::default();
        assert_eq!(selection.model, "claude-sonnet-4-5");
        assert_eq!(selection.max_tokens, 4096);
    }
}
