//! # Folio Core
//!
//! Domain types, traits, and error definitions for the Folio portfolio
//! assistant. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod inference;
pub mod knowledge;
pub mod message;
pub mod questions;
pub mod state;

// Re-export key types at crate root for ergonomics
pub use error::{EngineError, Error, InferenceError, KnowledgeError, QuestionLogError, Result};
pub use inference::{
    CompletionRequest, CompletionResponse, EmbeddingRequest, EmbeddingResponse, InferenceClient,
    Usage,
};
pub use knowledge::{ChunkMetadata, KnowledgeChunk, Retriever};
pub use message::{Message, Role};
pub use questions::{QuestionLog, UnansweredQuestion, ANONYMOUS_ASKER};
pub use state::{Grade, GradeScore, NextAction, RouteDecision, RouteStep, TurnState};
