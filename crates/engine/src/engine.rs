//! The decision graph that executes one turn.
//!
//! router → {retrieve → grade → {generate_good | generate_bad} | email | chat}
//!
//! Each node consumes the current `TurnState` and returns a typed delta; the
//! driver merges deltas between nodes and matches exhaustively on the
//! structured decisions, so every routing value has a compile-checked
//! transition. The engine is constructed once and shared across concurrent
//! turns.

use chrono::Utc;
use folio_core::error::{EngineError, Error};
use folio_core::inference::{CompletionRequest, InferenceClient};
use folio_core::knowledge::Retriever;
use folio_core::message::Message;
use folio_core::questions::{QuestionLog, UnansweredQuestion};
use folio_core::state::{Grade, GradeScore, NextAction, RouteDecision, RouteStep, TurnState};
use folio_questions::InMemoryQuestionLog;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-role sampling temperatures.
#[derive(Debug, Clone, Copy)]
pub struct Temperatures {
    pub router: f32,
    pub grader: f32,
    pub generator: f32,
}

impl Default for Temperatures {
    fn default() -> Self {
        Self {
            router: 0.0,
            grader: 0.5,
            generator: 0.7,
        }
    }
}

/// The decision engine: one instance per process, one `run_turn` per
/// request.
pub struct DecisionEngine {
    client: Arc<dyn InferenceClient>,
    retriever: Arc<dyn Retriever>,
    questions: Arc<dyn QuestionLog>,
    /// Where questions land when the primary log fails. Never blocks a reply.
    fallback_questions: InMemoryQuestionLog,
    chat_model: String,
    system_instruction: String,
    temperatures: Temperatures,
}

impl DecisionEngine {
    pub fn new(
        client: Arc<dyn InferenceClient>,
        retriever: Arc<dyn Retriever>,
        questions: Arc<dyn QuestionLog>,
        chat_model: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            client,
            retriever,
            questions,
            fallback_questions: InMemoryQuestionLog::new(),
            chat_model: chat_model.into(),
            system_instruction: system_instruction.into(),
            temperatures: Temperatures::default(),
        }
    }

    /// Override the per-role sampling temperatures.
    pub fn with_temperatures(mut self, temperatures: Temperatures) -> Self {
        self.temperatures = temperatures;
        self
    }

    /// Execute one turn: the new user text plus the prior history.
    ///
    /// Exactly one of the search/email/chat branches runs; `search_context`
    /// and `grade` are populated iff the search branch was taken.
    pub async fn run_turn(
        &self,
        user_input: impl Into<String>,
        history: Vec<Message>,
    ) -> Result<TurnState, Error> {
        let mut messages = history;
        messages.push(Message::user(user_input));
        let state = TurnState::new(messages);

        let decision = self.route(&state).await?;
        info!(step = ?decision.step, "Routed turn");
        let state = state.with_decision(decision.clone());

        let state = match decision.step {
            RouteStep::Search => {
                let context = self.retrieve(&decision).await?;
                let state = state.with_context(context.clone());

                let grade = self.grade(&decision.search_query, &context).await?;
                info!(score = ?grade.score, reason = %grade.reason, "Graded context");
                let state = state.with_grade(grade.clone());

                match grade.score {
                    GradeScore::Good => {
                        let reply = self
                            .generate_good(&decision.search_query, &context)
                            .await?;
                        state.with_reply(reply, NextAction::None)
                    }
                    GradeScore::Bad => {
                        let reply = self.generate_bad(&decision.search_query).await;
                        state.with_reply(reply, NextAction::None)
                    }
                }
            }
            RouteStep::Email => {
                let reply = self.email_acknowledgment();
                state.with_reply(reply, NextAction::ScrollToContact)
            }
            RouteStep::Chat => {
                let reply = self.chat(&state).await?;
                state.with_reply(reply, NextAction::None)
            }
        };

        Ok(state)
    }

    /// Classify intent from the latest message and pick the branch.
    async fn route(&self, state: &TurnState) -> Result<RouteDecision, Error> {
        let latest = state
            .latest_user_text()
            .ok_or(Error::Engine(EngineError::EmptyTurn))?;

        let instruction = format!(
            "You are a router. Classify the visitor's intent based ONLY on their LATEST message.\n\
             Ignore previous topics unless the visitor explicitly references them \
             (e.g., 'tell me more about that').\n\
             - If the visitor asks a question about Michael's background, skills, or career -> \"search\".\n\
             - If the visitor wants to send an email or contact Michael -> \"email\".\n\
             - If the visitor is just saying hello, asking 'how are you', or chatting -> \"chat\".\n\
             Respond with a single JSON object:\n\
             {{\"step\": \"search\" | \"email\" | \"chat\", \"search_query\": \"\", \
             \"email_address\": \"\", \"email_body\": \"\"}}\n\
             If \"step\" is \"search\", extract the search_query from this message.\n\
             If \"step\" is \"email\", extract the visitor's address and message when given.\n\
             The visitor just said: '{latest}'"
        );

        let mut messages = vec![Message::system(instruction)];
        messages.extend(state.messages.iter().cloned());

        let response = self
            .client
            .complete(CompletionRequest::json(
                &self.chat_model,
                messages,
                self.temperatures.router,
            ))
            .await?;

        let decision: RouteDecision = parse_structured(&response.message.content)?;
        debug!(?decision, "Router decision");
        Ok(decision)
    }

    /// Look up the knowledge base and join chunk texts into one context
    /// block. Read-only; an empty query is simply low-yield.
    async fn retrieve(&self, decision: &RouteDecision) -> Result<String, Error> {
        let query = &decision.search_query;
        debug!(query = %query, "Executing search");

        let chunks = self.retriever.lookup(query).await?;
        let context = chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        debug!(chunks = chunks.len(), context_len = context.len(), "Retrieved context");
        Ok(context)
    }

    /// Decide whether the retrieved context suffices to answer.
    ///
    /// This is the quality gate that keeps ungrounded context from turning
    /// into a hallucinated answer.
    async fn grade(&self, query: &str, context: &str) -> Result<Grade, Error> {
        let prompt = format!(
            "You are a context grader. Your goal is to determine if the provided 'Context' \
             is sufficient to answer the 'Question'.\n\
             Score 'good' if the Context contains the answer to the Question. \
             Score 'bad' if the Context is empty, irrelevant, or is not sufficient to answer \
             the Question.\n\
             Respond with a single JSON object: {{\"score\": \"good\" | \"bad\", \"reason\": \"\"}} \
             and give a reason for your verdict.\n\
             Question: {query}\n\
             Context: {context}"
        );

        let response = self
            .client
            .complete(CompletionRequest::json(
                &self.chat_model,
                vec![Message::user(prompt)],
                self.temperatures.grader,
            ))
            .await?;

        let grade: Grade = parse_structured(&response.message.content)?;
        Ok(grade)
    }

    /// Generate the final answer from sufficient context.
    async fn generate_good(&self, query: &str, context: &str) -> Result<Message, Error> {
        let current_date = Utc::now().format("%Y-%m-%d");
        let prompt = format!(
            "SYSTEM: {}\n\n\
             Answer the visitor's question based strictly on the context provided below. \
             **Synthesize a comprehensive summary** from all relevant sections in the context. \
             **DO NOT reference the context or the database in your final answer.** \
             Keep the final answer concise.\n\
             **Today's Date is: {current_date}**\n\n\
             Question: {query}\n\
             Context: {context}",
            self.system_instruction
        );

        let response = self
            .client
            .complete(CompletionRequest::new(
                &self.chat_model,
                vec![Message::user(prompt)],
                self.temperatures.generator,
            ))
            .await?;

        Ok(response.message)
    }

    /// Log the unanswered question and emit the fixed refusal.
    ///
    /// Logging failure is not allowed to block the reply: on error the
    /// question degrades to the in-memory fallback log.
    async fn generate_bad(&self, query: &str) -> Message {
        info!(query = %query, "No sufficient context, logging and offering email");

        let question = UnansweredQuestion::anonymous(query);
        if let Err(e) = self.questions.record(&question).await {
            warn!(error = %e, "Question log write failed, keeping in-memory only");
            // Infallible by construction
            let _ = self.fallback_questions.record(&question).await;
        }

        Message::assistant(format!(
            "I couldn't find specific details about '{query}' in what I know about \
             Michael Schlosser. I have logged this as an unanswered question for review. \
             Would you like to contact Michael with your question directly?"
        ))
    }

    /// The email branch never sends mail itself — it acknowledges and hands
    /// the presentation layer the contact-form redirect command.
    fn email_acknowledgment(&self) -> Message {
        Message::assistant(
            "Absolutely! I detected your intent to send an email. \
             I have scrolled down to the contact form for you. \
             Please review and send your message there.",
        )
    }

    /// Unconstrained conversational reply over the full history.
    async fn chat(&self, state: &TurnState) -> Result<Message, Error> {
        debug!("Direct chat");

        let mut messages = vec![Message::system(&self.system_instruction)];
        messages.extend(state.messages.iter().cloned());

        let response = self
            .client
            .complete(CompletionRequest::new(
                &self.chat_model,
                messages,
                self.temperatures.generator,
            ))
            .await?;

        Ok(response.message)
    }

    /// Questions that only reached the in-memory fallback log.
    pub async fn unpersisted_questions(&self) -> Vec<UnansweredQuestion> {
        self.fallback_questions.list().await.unwrap_or_default()
    }
}

/// Parse a model's structured output into a typed decision.
///
/// Tolerates a markdown code fence around the JSON; anything else that does
/// not parse is a classification failure for the turn.
fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, Error> {
    let cleaned = raw.trim();
    let cleaned = cleaned
        .strip_prefix("```json")
        .or_else(|| cleaned.strip_prefix("```"))
        .unwrap_or(cleaned);
    let cleaned = cleaned.strip_suffix("```").unwrap_or(cleaned).trim();

    if cleaned.is_empty() {
        return Err(Error::Engine(EngineError::Classification(
            "empty model output".into(),
        )));
    }

    serde_json::from_str(cleaned)
        .map_err(|e| Error::Engine(EngineError::Classification(e.to_string())))
}
