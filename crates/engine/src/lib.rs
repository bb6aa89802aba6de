//! Decision engine for Folio.
//!
//! Executes one turn of the assistant: classify the visitor's intent,
//! optionally retrieve and grade supporting context, and produce the reply
//! plus an optional command for the presentation layer.

pub mod engine;
pub mod prompt;

pub use engine::{DecisionEngine, Temperatures};
pub use prompt::{load_system_instruction, DEFAULT_SYSTEM_INSTRUCTION};
