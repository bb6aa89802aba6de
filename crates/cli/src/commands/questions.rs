//! `folio questions` — List logged unanswered questions for review.

use folio_config::AppConfig;
use folio_core::questions::QuestionLog;
use folio_questions::SqliteQuestionLog;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if let Some(parent) = config.questions_db.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let log = SqliteQuestionLog::new(&config.questions_db.to_string_lossy()).await?;

    let questions = log.list().await?;
    if questions.is_empty() {
        println!("No unanswered questions logged.");
        return Ok(());
    }

    println!("{} unanswered question(s):", questions.len());
    for q in questions {
        println!(
            "  [{}] {} — {}",
            q.timestamp.format("%Y-%m-%d %H:%M"),
            q.asker_name,
            q.question
        );
    }

    Ok(())
}
