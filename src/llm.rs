//! Minimal client for OpenAI-compatible `/chat/completions` endpoints.
//!
//! Enrichment and outreach depend on the [`ChatClient`] trait so they can be
//! tested with canned replies and pointed at any compatible server.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::http_client::{HttpClientError, body_excerpt, build_http_client};
use crate::user_agent;

/// Default OpenAI API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Errors from chat completion calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error(
        "LLM API key is missing\n  Suggestion: export OPENAI_API_KEY or run with --offline"
    )]
    MissingApiKey,

    #[error(transparent)]
    Client(#[from] HttpClientError),

    #[error("network error calling {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("LLM endpoint returned HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("LLM response could not be decoded: {0}")]
    Decode(String),

    /// The reply had no choices or an empty message.
    #[error("LLM returned an empty completion")]
    EmptyCompletion,
}

/// One chat turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// A completion request independent of any vendor wire format.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    /// Ask the server for a JSON object response.
    pub json_mode: bool,
}

impl ChatRequest {
    #[must_use]
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            temperature: 0.4,
            json_mode: false,
        }
    }

    #[must_use]
    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Anything that can answer a chat request.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Returns the assistant message content.
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError>;

    /// Model identifier recorded alongside generated content.
    fn model(&self) -> &str;
}

#[derive(Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Bearer-authenticated client for `{base_url}/chat/completions`.
pub struct OpenAiChatClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiChatClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiChatClient {
    /// # Errors
    ///
    /// Returns [`LlmError::MissingApiKey`] for a blank key.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Same as [`OpenAiChatClient::new`].
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey);
        }
        let client = build_http_client("llm", user_agent::default_api_user_agent())?;
        Ok(Self {
            client,
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiChatClient {
    #[instrument(skip(self, request), fields(model = %self.model, messages = request.messages.len()))]
    async fn complete(&self, request: ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = CompletionBody {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            response_format: request.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|source| LlmError::Network {
                url: url.clone(),
                source: source.without_url(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::HttpStatus {
                status: status.as_u16(),
                body: body_excerpt(&text),
            });
        }

        let decoded: CompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Decode(e.without_url().to_string()))?;
        let content = decoded
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(LlmError::EmptyCompletion)?;
        debug!(chars = content.len(), "completion received");
        Ok(content)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Extracts the first balanced `{...}` object from model output.
///
/// Models wrap JSON in code fences or prose despite instructions; braces
/// inside string literals are ignored while balancing.
///
/// ```
/// use leadscout_core::llm::extract_json_object;
///
/// let raw = "Sure!\n```json\n{\"score\": 80, \"note\": \"a } inside\"}\n```";
/// assert_eq!(extract_json_object(raw), Some(r#"{"score": 80, "note": "a } inside"}"#));
/// ```
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::socket_guard::start_mock_server_or_skip;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, ResponseTemplate};

    #[test]
    fn test_extract_json_object_variants() {
        assert_eq!(extract_json_object(r#"{"a":1}"#), Some(r#"{"a":1}"#));
        assert_eq!(
            extract_json_object("```json\n{\"a\":{\"b\":2}}\n```"),
            Some(r#"{"a":{"b":2}}"#)
        );
        assert_eq!(
            extract_json_object(r#"{"s":"quote \" and { brace"}"#),
            Some(r#"{"s":"quote \" and { brace"}"#)
        );
        assert_eq!(extract_json_object("no json here"), None);
        assert_eq!(extract_json_object("{\"unterminated\": 1"), None);
    }

    #[test]
    fn test_blank_key_rejected() {
        assert!(matches!(
            OpenAiChatClient::new("  ", DEFAULT_MODEL),
            Err(LlmError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_complete_sends_json_mode_and_reads_first_choice() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "response_format": {"type": "json_object"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "{\"ok\":true}"}}]
            })))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::with_base_url("sk-test", "test-model", server.uri()).unwrap();
        let reply = client
            .complete(ChatRequest::new(vec![ChatMessage::user("hi")]).json())
            .await
            .unwrap();
        assert_eq!(reply, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_complete_maps_http_errors() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = OpenAiChatClient::with_base_url("sk-bad", "m", server.uri()).unwrap();
        match client
            .complete(ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
        {
            Err(LlmError::HttpStatus { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "invalid api key");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_error() {
        let Some(server) = start_mock_server_or_skip().await else {
            return;
        };
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&server)
            .await;

        let client = OpenAiChatClient::with_base_url("sk", "m", server.uri()).unwrap();
        let err = client
            .complete(ChatRequest::new(vec![ChatMessage::user("hi")]))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyCompletion));
    }
}
