//! Question log — durable record of queries the assistant could not answer.

use crate::error::QuestionLogError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Asker name used when the visitor is unknown.
pub const ANONYMOUS_ASKER: &str = "Anonymous";

/// A question the assistant could not answer from the knowledge base.
/// Created once, never updated, retained indefinitely for human review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnansweredQuestion {
    pub question: String,
    pub asker_name: String,
    pub timestamp: DateTime<Utc>,
}

impl UnansweredQuestion {
    /// A question from an unidentified visitor, stamped now.
    pub fn anonymous(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            asker_name: ANONYMOUS_ASKER.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only question storage.
///
/// Each insert is an independent atomic unit; concurrent writers must not
/// corrupt or lose records.
#[async_trait]
pub trait QuestionLog: Send + Sync {
    /// The backend name (e.g., "sqlite", "in_memory").
    fn name(&self) -> &str;

    /// Record one unanswered question.
    async fn record(
        &self,
        question: &UnansweredQuestion,
    ) -> std::result::Result<(), QuestionLogError>;

    /// All recorded questions, newest first.
    async fn list(
        &self,
    ) -> std::result::Result<Vec<UnansweredQuestion>, QuestionLogError>;
}
