//! Error types for the Folio domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Folio operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Inference errors ---
    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    // --- Knowledge store errors ---
    #[error("Knowledge error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Question log errors ---
    #[error("Question log error: {0}")]
    QuestionLog(#[from] QuestionLogError),

    // --- Engine errors ---
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum InferenceError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Lookup failed: {0}")]
    LookupFailed(String),

    #[error("Embedding generation failed: {0}")]
    EmbeddingFailed(String),

    #[error("Index build failed: {0}")]
    BuildFailed(String),
}

#[derive(Debug, Error)]
pub enum QuestionLogError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Insert failed: {0}")]
    InsertFailed(String),
}

/// Errors raised while executing the decision graph for one turn.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The router or grader produced no parsable structured output.
    /// No default branch is assumed; the turn fails.
    #[error("Classification produced no parsable output: {0}")]
    Classification(String),

    #[error("Turn started with no user message")]
    EmptyTurn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inference_error_displays_correctly() {
        let err = Error::Inference(InferenceError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn classification_error_displays_correctly() {
        let err = Error::Engine(EngineError::Classification(
            "missing field `step`".into(),
        ));
        assert!(err.to_string().contains("step"));
        assert!(err.to_string().contains("parsable"));
    }
}
