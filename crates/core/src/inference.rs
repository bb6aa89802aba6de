//! InferenceClient trait — the abstraction over LLM backends.
//!
//! The engine depends on three capability shapes: classify and grade
//! (completions constrained to a JSON object, parsed into typed decisions
//! by the caller), and free-form generation. All three ride on
//! `complete()`; retrieval additionally needs `embed()`.
//!
//! Implementations: OpenRouter (remote), Ollama (local), mocks in tests.

use crate::error::InferenceError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Configuration for a completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "google/gemini-2.0-flash-lite-001")
    pub model: String,

    /// The conversation messages
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Constrain the response to a single JSON object.
    /// Used by the router and grader, which parse the output into
    /// typed decisions.
    #[serde(default)]
    pub json_mode: bool,
}

fn default_temperature() -> f32 {
    0.7
}

impl CompletionRequest {
    /// A plain text-generation request.
    pub fn new(model: impl Into<String>, messages: Vec<Message>, temperature: f32) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature,
            max_tokens: None,
            json_mode: false,
        }
    }

    /// A request whose output must be a single JSON object.
    pub fn json(model: impl Into<String>, messages: Vec<Message>, temperature: f32) -> Self {
        Self {
            json_mode: true,
            ..Self::new(model, messages, temperature)
        }
    }
}

/// A complete response from a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// The generated message
    pub message: Message,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// An embedding request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// The model to use for embeddings (e.g., "text-embedding-3-small").
    pub model: String,

    /// The texts to embed.
    pub inputs: Vec<String>,
}

/// An embedding response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// The embedding vectors, one per input text.
    pub embeddings: Vec<Vec<f32>>,

    /// Which model was used.
    pub model: String,

    /// Token usage.
    pub usage: Option<Usage>,
}

/// The core InferenceClient trait.
///
/// Clients are constructed once at process start and shared across
/// concurrent turns behind an `Arc` — no per-call reinitialization.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// A human-readable name for this backend (e.g., "openrouter", "ollama").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> std::result::Result<CompletionResponse, InferenceError>;

    /// Generate embeddings for the given texts.
    ///
    /// Default implementation returns an error indicating embeddings aren't
    /// supported.
    async fn embed(
        &self,
        _request: EmbeddingRequest,
    ) -> std::result::Result<EmbeddingResponse, InferenceError> {
        Err(InferenceError::NotConfigured(format!(
            "Backend '{}' does not support embeddings",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_defaults() {
        let req = CompletionRequest::new("test-model", vec![], 0.7);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!req.json_mode);
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn json_request_sets_json_mode() {
        let req = CompletionRequest::json("test-model", vec![], 0.0);
        assert!(req.json_mode);
        assert_eq!(req.temperature, 0.0);
    }

    #[test]
    fn embedding_request_serialization() {
        let req = EmbeddingRequest {
            model: "text-embedding-3-small".into(),
            inputs: vec!["first".into(), "second".into()],
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("text-embedding-3-small"));
        assert!(json.contains("second"));
    }
}
