//! In-memory question log — the fallback when persistence fails, and a
//! convenient backend for tests.

use async_trait::async_trait;
use folio_core::error::QuestionLogError;
use folio_core::questions::{QuestionLog, UnansweredQuestion};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A question log that keeps records in a Vec.
///
/// Not durable — used so a persistence failure never blocks the reply.
pub struct InMemoryQuestionLog {
    entries: Arc<RwLock<Vec<UnansweredQuestion>>>,
}

impl InMemoryQuestionLog {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryQuestionLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionLog for InMemoryQuestionLog {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn record(&self, question: &UnansweredQuestion) -> Result<(), QuestionLogError> {
        self.entries.write().await.push(question.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UnansweredQuestion>, QuestionLogError> {
        let entries = self.entries.read().await;
        Ok(entries.iter().rev().cloned().collect())
    }
}
