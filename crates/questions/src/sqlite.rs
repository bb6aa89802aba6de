//! SQLite question log.
//!
//! One table, append-only. Each insert is an independent atomic statement;
//! concurrent writers serialize through the connection pool.

use async_trait::async_trait;
use chrono::Utc;
use folio_core::error::QuestionLogError;
use folio_core::questions::{QuestionLog, UnansweredQuestion};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A durable question log backed by a SQLite file.
pub struct SqliteQuestionLog {
    pool: SqlitePool,
}

impl SqliteQuestionLog {
    /// Open (or create) the log database at `path`.
    ///
    /// The table is created if absent. Pass `"sqlite::memory:"` for an
    /// in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, QuestionLogError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| QuestionLogError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| QuestionLogError::Storage(format!("Failed to open SQLite: {e}")))?;

        let log = Self { pool };
        log.run_migrations().await?;
        info!("Question log initialized at {path}");
        Ok(log)
    }

    async fn run_migrations(&self) -> Result<(), QuestionLogError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS unanswered_questions (
                id         INTEGER PRIMARY KEY,
                question   TEXT NOT NULL,
                asker_name TEXT,
                timestamp  TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| QuestionLogError::Storage(format!("unanswered_questions table: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl QuestionLog for SqliteQuestionLog {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn record(&self, question: &UnansweredQuestion) -> Result<(), QuestionLogError> {
        sqlx::query(
            "INSERT INTO unanswered_questions (question, asker_name, timestamp) VALUES (?1, ?2, ?3)",
        )
        .bind(&question.question)
        .bind(&question.asker_name)
        .bind(question.timestamp.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| QuestionLogError::InsertFailed(e.to_string()))?;

        debug!(question = %question.question, asker = %question.asker_name, "Recorded unanswered question");
        Ok(())
    }

    async fn list(&self) -> Result<Vec<UnansweredQuestion>, QuestionLogError> {
        let rows = sqlx::query(
            "SELECT question, asker_name, timestamp FROM unanswered_questions ORDER BY id DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| QuestionLogError::Storage(format!("SELECT failed: {e}")))?;

        rows.iter()
            .map(|row| {
                let question: String = row
                    .try_get("question")
                    .map_err(|e| QuestionLogError::Storage(format!("question column: {e}")))?;
                let asker_name: Option<String> = row
                    .try_get("asker_name")
                    .map_err(|e| QuestionLogError::Storage(format!("asker_name column: {e}")))?;
                let timestamp_str: String = row
                    .try_get("timestamp")
                    .map_err(|e| QuestionLogError::Storage(format!("timestamp column: {e}")))?;

                let timestamp = chrono::DateTime::parse_from_rfc3339(&timestamp_str)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());

                Ok(UnansweredQuestion {
                    question,
                    asker_name: asker_name.unwrap_or_default(),
                    timestamp,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::questions::ANONYMOUS_ASKER;

    async fn test_log() -> SqliteQuestionLog {
        SqliteQuestionLog::new("sqlite::memory:").await.unwrap()
    }

    #[tokio::test]
    async fn record_and_list() {
        let log = test_log().await;
        log.record(&UnansweredQuestion::anonymous("Does Michael do consulting?"))
            .await
            .unwrap();

        let questions = log.list().await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "Does Michael do consulting?");
        assert_eq!(questions[0].asker_name, ANONYMOUS_ASKER);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let log = test_log().await;
        log.record(&UnansweredQuestion::anonymous("first"))
            .await
            .unwrap();
        log.record(&UnansweredQuestion::anonymous("second"))
            .await
            .unwrap();

        let questions = log.list().await.unwrap();
        assert_eq!(questions[0].question, "second");
        assert_eq!(questions[1].question, "first");
    }

    #[tokio::test]
    async fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.db");
        let path_str = path.to_string_lossy().to_string();

        {
            let log = SqliteQuestionLog::new(&path_str).await.unwrap();
            log.record(&UnansweredQuestion::anonymous("durable?"))
                .await
                .unwrap();
        }

        let log = SqliteQuestionLog::new(&path_str).await.unwrap();
        let questions = log.list().await.unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question, "durable?");
    }

    #[tokio::test]
    async fn concurrent_inserts_all_land() {
        let log = std::sync::Arc::new(test_log().await);
        let mut handles = Vec::new();
        for i in 0..10 {
            let log = log.clone();
            handles.push(tokio::spawn(async move {
                log.record(&UnansweredQuestion::anonymous(format!("question {i}")))
                    .await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(log.list().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn backend_name() {
        let log = test_log().await;
        assert_eq!(log.name(), "sqlite");
    }
}
