//! Turn state and the structured decisions that drive the graph.
//!
//! One turn = one `TurnState` threaded through the decision graph. Nodes
//! never mutate shared state: each consumes the current state and returns a
//! delta, and the driver merges it before the next node runs. This keeps the
//! turn's data flow auditable and each node testable in isolation.

use crate::message::{Message, Role};
use serde::{Deserialize, Serialize};

/// The branch the router selected for this turn.
///
/// Every branch point in the engine matches exhaustively on this enum;
/// adding a variant is a compile error until every transition handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStep {
    /// Informational question about the portfolio owner — retrieve first.
    Search,
    /// The visitor wants to contact the owner.
    Email,
    /// Greeting or small talk — answer directly.
    Chat,
}

/// The router's structured output. Produced once per turn, read by exactly
/// one downstream branch, never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDecision {
    pub step: RouteStep,

    /// The search query, present iff `step` is `Search`.
    #[serde(default)]
    pub search_query: String,

    /// The visitor's address, extracted iff `step` is `Email`.
    #[serde(default)]
    pub email_address: String,

    /// The message the visitor wants relayed, extracted iff `step` is `Email`.
    #[serde(default)]
    pub email_body: String,
}

/// The grader's verdict on retrieved context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeScore {
    /// The context contains the specific factual answer.
    Good,
    /// Empty, irrelevant, or insufficiently detailed.
    Bad,
}

/// The grader's structured output: a binary verdict with rationale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grade {
    pub score: GradeScore,

    #[serde(default)]
    pub reason: String,
}

/// An opaque command for the presentation layer.
///
/// The engine never interprets these; the front end does (e.g. scrolling
/// to the contact form). The wire value is `as_command()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    #[default]
    None,
    ScrollToContact,
}

impl NextAction {
    /// The command string consumed by the front end.
    pub fn as_command(&self) -> &'static str {
        match self {
            NextAction::None => "none",
            NextAction::ScrollToContact => "SCROLL_TO_CONTACT",
        }
    }
}

/// The state of one turn as it moves through the decision graph.
///
/// `search_context` and `grade` are populated iff the search branch ran.
/// An empty `search_context` string is meaningful: the lookup returned
/// nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    /// Conversation timeline: prior history plus this turn's user message,
    /// append-only.
    pub messages: Vec<Message>,

    /// Set by the router.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<RouteDecision>,

    /// Set by the retrieve node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_context: Option<String>,

    /// Set by the grade node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,

    /// Set by the email branch; `None` otherwise.
    #[serde(default)]
    pub next_action: NextAction,
}

impl TurnState {
    /// Seed a turn from the accumulated conversation.
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            decision: None,
            search_context: None,
            grade: None,
            next_action: NextAction::default(),
        }
    }

    /// The latest user message's text, if any.
    pub fn latest_user_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// The final assistant reply of this turn, if one was produced.
    pub fn reply(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.role == Role::Assistant)
    }

    /// Merge the router's delta.
    pub fn with_decision(mut self, decision: RouteDecision) -> Self {
        self.decision = Some(decision);
        self
    }

    /// Merge the retrieve node's delta.
    pub fn with_context(mut self, context: String) -> Self {
        self.search_context = Some(context);
        self
    }

    /// Merge the grade node's delta.
    pub fn with_grade(mut self, grade: Grade) -> Self {
        self.grade = Some(grade);
        self
    }

    /// Merge a terminal node's delta: the reply, and optionally a command
    /// for the presentation layer.
    pub fn with_reply(mut self, reply: Message, next_action: NextAction) -> Self {
        self.messages.push(reply);
        self.next_action = next_action;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_decision_parses_from_model_output() {
        let json = r#"{"step": "search", "search_query": "Michael's skills"}"#;
        let decision: RouteDecision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.step, RouteStep::Search);
        assert_eq!(decision.search_query, "Michael's skills");
        assert!(decision.email_address.is_empty());
    }

    #[test]
    fn route_decision_missing_step_is_an_error() {
        let json = r#"{"search_query": "something"}"#;
        assert!(serde_json::from_str::<RouteDecision>(json).is_err());
    }

    #[test]
    fn grade_parses_from_model_output() {
        let json = r#"{"score": "bad", "reason": "context is empty"}"#;
        let grade: Grade = serde_json::from_str(json).unwrap();
        assert_eq!(grade.score, GradeScore::Bad);
        assert_eq!(grade.reason, "context is empty");
    }

    #[test]
    fn next_action_commands() {
        assert_eq!(NextAction::None.as_command(), "none");
        assert_eq!(NextAction::ScrollToContact.as_command(), "SCROLL_TO_CONTACT");
        assert_eq!(NextAction::default(), NextAction::None);
    }

    #[test]
    fn latest_user_text_skips_assistant_messages() {
        let state = TurnState::new(vec![
            Message::user("first question"),
            Message::assistant("an answer"),
            Message::user("second question"),
        ]);
        assert_eq!(state.latest_user_text(), Some("second question"));
    }

    #[test]
    fn deltas_merge_without_touching_history() {
        let state = TurnState::new(vec![Message::user("hi")]);
        let state = state.with_decision(RouteDecision {
            step: RouteStep::Chat,
            search_query: String::new(),
            email_address: String::new(),
            email_body: String::new(),
        });
        assert_eq!(state.messages.len(), 1);

        let state = state.with_reply(Message::assistant("hello!"), NextAction::None);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.reply().unwrap().content, "hello!");
        assert!(state.search_context.is_none());
        assert!(state.grade.is_none());
    }
}
