//! `folio chat` — Interactive or single-message chat mode.
//!
//! This is the composition root: config → inference client → knowledge
//! index → question log → engine, all constructed once and reused for
//! every turn of the session.

use folio_config::AppConfig;
use folio_core::message::Message;
use folio_core::state::{NextAction, TurnState};
use folio_engine::{load_system_instruction, DecisionEngine, Temperatures};
use folio_knowledge::KnowledgeStoreBuilder;
use folio_questions::SqliteQuestionLog;
use std::sync::Arc;

pub async fn run(message: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let engine = build_engine().await?;

    if let Some(msg) = message {
        // Single message mode
        let state = engine.run_turn(msg, Vec::new()).await?;
        print_reply(&state);
    } else {
        // Interactive mode
        println!();
        println!("  Folio — portfolio assistant");
        println!("  Type your message and press Enter. Type 'exit' to quit.");
        println!();

        let mut history: Vec<Message> = Vec::new();
        let stdin = std::io::stdin();

        loop {
            print!("  You > ");
            use std::io::Write;
            std::io::stdout().flush()?;

            let mut line = String::new();
            if stdin.read_line(&mut line)? == 0 {
                break;
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line == "exit" || line == "quit" {
                break;
            }

            match engine.run_turn(line, history.clone()).await {
                Ok(state) => {
                    print_reply(&state);
                    // The caller accumulates history across turns
                    history = state.messages;
                }
                Err(e) => {
                    eprintln!("  Error: {e}");
                }
            }
        }
    }

    Ok(())
}

/// Construct the engine and its collaborators from configuration.
pub async fn build_engine() -> Result<DecisionEngine, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let client = folio_providers::build_from_config(&config)?;

    let builder = KnowledgeStoreBuilder::new(
        &config.knowledge.source_dir,
        &config.knowledge.index_dir,
        &config.embedding_model,
        config.knowledge.top_k,
        client.clone(),
    );
    let retriever = Arc::new(builder.build_or_load().await?);

    if let Some(parent) = config.questions_db.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let questions =
        Arc::new(SqliteQuestionLog::new(&config.questions_db.to_string_lossy()).await?);

    let system_instruction = load_system_instruction(&config.prompt_path);

    Ok(DecisionEngine::new(
        client,
        retriever,
        questions,
        config.chat_model(),
        system_instruction,
    )
    .with_temperatures(Temperatures {
        router: config.temperatures.router,
        grader: config.temperatures.grader,
        generator: config.temperatures.generator,
    }))
}

fn print_reply(state: &TurnState) {
    if let Some(reply) = state.reply() {
        println!("{}", reply.content);
    }
    if state.next_action != NextAction::None {
        println!("  [action: {}]", state.next_action.as_command());
    }
}
