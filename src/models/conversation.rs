use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::enums::Role;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TurnError {
    #[error("User turn text is empty")]
    EmptyText,
}

/// A single utterance in a triage conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
    pub timestamp: NaiveDateTime,
}

impl ConversationTurn {
    /// Validate and timestamp a user turn. Text is trimmed; empty text is rejected.
    pub fn user(text: &str) -> Result<Self, TurnError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyText);
        }
        Ok(Self {
            role: Role::User,
            text: text.to_string(),
            timestamp: Local::now().naive_local(),
        })
    }

    pub fn assistant(text: &str) -> Self {
        Self {
            role: Role::Assistant,
            text: text.trim().to_string(),
            timestamp: Local::now().naive_local(),
        }
    }
}

/// Chronological, append-only transcript of a triage session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ConversationTurn>", into = "Vec<ConversationTurn>")]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a transcript received from a host, re-validating every user turn.
    pub fn from_turns(turns: Vec<ConversationTurn>) -> Result<Self, TurnError> {
        if turns
            .iter()
            .any(|t| t.role == Role::User && t.text.trim().is_empty())
        {
            return Err(TurnError::EmptyText);
        }
        Ok(Self { turns })
    }

    pub fn push_user(&mut self, text: &str) -> Result<(), TurnError> {
        self.turns.push(ConversationTurn::user(text)?);
        Ok(())
    }

    /// Append an assistant turn. Blank text is ignored.
    pub fn push_assistant(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.turns.push(ConversationTurn::assistant(text));
        }
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn user_turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter().filter(|t| t.role == Role::User)
    }

    pub fn assistant_turns(&self) -> impl DoubleEndedIterator<Item = &ConversationTurn> {
        self.turns.iter().filter(|t| t.role == Role::Assistant)
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.text.as_str())
    }

    /// Render as "User: ..." / "Assistant: ..." lines for prompting.
    pub fn transcript(&self) -> String {
        self.turns
            .iter()
            .map(|t| format!("{}: {}", role_label(t.role), t.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "User",
        Role::Assistant => "Assistant",
    }
}

impl TryFrom<Vec<ConversationTurn>> for Conversation {
    type Error = TurnError;

    fn try_from(turns: Vec<ConversationTurn>) -> Result<Self, Self::Error> {
        Self::from_turns(turns)
    }
}

impl From<Conversation> for Vec<ConversationTurn> {
    fn from(conversation: Conversation) -> Self {
        conversation.turns
    }
}
