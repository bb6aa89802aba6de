//! OpenAI-compatible backend implementation.
//!
//! Works with OpenRouter, Ollama, and any endpoint exposing the
//! `/v1/chat/completions` and `/v1/embeddings` routes.
//!
//! Supports:
//! - Chat completions, optionally constrained to a single JSON object
//!   (`response_format: json_object`) for the router and grader
//! - Embeddings for the knowledge index

use async_trait::async_trait;
use folio_core::error::InferenceError;
use folio_core::inference::*;
use folio_core::message::{Message, Role};
use serde::Deserialize;
use tracing::{debug, warn};

/// An OpenAI-compatible inference backend.
pub struct OpenAiCompatClient {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatClient {
    /// Create a new OpenAI-compatible client.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, InferenceError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| InferenceError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Create an OpenRouter client.
    pub fn openrouter(base_url: &str, api_key: impl Into<String>) -> Result<Self, InferenceError> {
        Self::new("openrouter", base_url, api_key)
    }

    /// Create an Ollama client. Ollama doesn't need a real key.
    pub fn ollama(base_url: &str) -> Result<Self, InferenceError> {
        Self::new("ollama", base_url, "ollama")
    }

    /// Convert our Message types to the wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::System => "system",
                    },
                    "content": m.content,
                })
            })
            .collect()
    }

    /// Map a non-200 status to the matching error.
    fn status_error(status: u16, body: String) -> InferenceError {
        match status {
            429 => InferenceError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => InferenceError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => {
                warn!(status, body = %body, "Backend returned error");
                InferenceError::ApiError {
                    status_code: status,
                    message: body,
                }
            }
        }
    }
}

#[async_trait]
impl InferenceClient for OpenAiCompatClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if request.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        debug!(backend = %self.name, model = %request.model, json_mode = request.json_mode, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| InferenceError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| InferenceError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        let message = Message::assistant(choice.message.content.unwrap_or_default());

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(CompletionResponse {
            message,
            usage,
            model: api_response.model,
        })
    }

    async fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, InferenceError> {
        let url = format!("{}/embeddings", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "input": request.inputs,
            "encoding_format": "float",
        });

        debug!(
            backend = %self.name,
            model = %request.model,
            count = request.inputs.len(),
            "Sending embedding request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| InferenceError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status, error_body));
        }

        let api_resp: EmbeddingApiResponse =
            response.json().await.map_err(|e| InferenceError::ApiError {
                status_code: 200,
                message: format!("Failed to parse embedding response: {e}"),
            })?;

        let embeddings = api_resp.data.into_iter().map(|d| d.embedding).collect();

        let usage = api_resp.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: 0,
            total_tokens: u.total_tokens,
        });

        Ok(EmbeddingResponse {
            embeddings,
            model: api_resp.model,
            usage,
        })
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
    #[serde(default)]
    model: String,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ApiChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingDatum>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let client =
            OpenAiCompatClient::new("test", "https://openrouter.ai/api/v1/", "key").unwrap();
        assert_eq!(client.base_url, "https://openrouter.ai/api/v1");
    }

    #[test]
    fn messages_map_to_wire_roles() {
        let msgs = vec![
            Message::system("be helpful"),
            Message::user("hi"),
            Message::assistant("hello"),
        ];
        let api = OpenAiCompatClient::to_api_messages(&msgs);
        assert_eq!(api[0]["role"], "system");
        assert_eq!(api[1]["role"], "user");
        assert_eq!(api[2]["role"], "assistant");
        assert_eq!(api[1]["content"], "hi");
    }

    #[test]
    fn rate_limit_status_maps_to_error() {
        let err = OpenAiCompatClient::status_error(429, String::new());
        assert!(matches!(err, InferenceError::RateLimited { .. }));
    }

    #[test]
    fn auth_status_maps_to_error() {
        let err = OpenAiCompatClient::status_error(401, String::new());
        assert!(matches!(err, InferenceError::AuthenticationFailed(_)));
        let err = OpenAiCompatClient::status_error(500, "boom".into());
        assert!(matches!(err, InferenceError::ApiError { status_code: 500, .. }));
    }

    #[test]
    fn response_parsing() {
        let json = r#"{
            "choices": [{"message": {"content": "{\"step\": \"chat\"}"}}],
            "model": "google/gemini-2.0-flash-lite-001",
            "usage": {"prompt_tokens": 12, "completion_tokens": 4, "total_tokens": 16}
        }"#;
        let resp: ApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.choices.len(), 1);
        assert!(resp.choices[0].message.content.as_deref().unwrap().contains("chat"));
        assert_eq!(resp.usage.as_ref().unwrap().total_tokens, 16);
    }

    #[test]
    fn embedding_response_parsing() {
        let json = r#"{
            "data": [{"embedding": [0.25, -0.5]}, {"embedding": [1.0, 0.0]}],
            "model": "text-embedding-3-small"
        }"#;
        let resp: EmbeddingApiResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.len(), 2);
        assert_eq!(resp.data[0].embedding, vec![0.25, -0.5]);
    }
}
