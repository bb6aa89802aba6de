//! Folio CLI — the main entry point.
//!
//! Commands:
//! - `chat`      — Interactive chat or single-message mode
//! - `index`     — Build or refresh the knowledge index
//! - `questions` — List logged unanswered questions

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio — conversational assistant for a personal-portfolio website",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Build or refresh the knowledge index
    Index {
        /// Rebuild even if the index looks fresh
        #[arg(short, long)]
        force: bool,
    },

    /// List logged unanswered questions
    Questions,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Chat { message } => commands::chat::run(message).await?,
        Commands::Index { force } => commands::index::run(force).await?,
        Commands::Questions => commands::questions::run().await?,
    }

    Ok(())
}
