use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::prompts::GREETING;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the conversation. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// State of a single conversation.
///
/// History is append-only and always starts with the assistant greeting.
/// The resume text is stored at most once and is never cleared, so
/// `resume_available()` is derived from it rather than tracked separately.
#[derive(Debug, Clone)]
pub struct SessionState {
    history: Vec<ConversationTurn>,
    resume_text: Option<String>,
    started_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
}

impl SessionState {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            history: vec![ConversationTurn::assistant(GREETING)],
            resume_text: None,
            started_at: now,
            last_active: now,
        }
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn resume_available(&self) -> bool {
        self.resume_text.is_some()
    }

    pub fn resume_text(&self) -> Option<&str> {
        self.resume_text.as_deref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    /// The newest turn, when it is a user turn that never got a reply.
    pub fn unanswered_user_turn(&self) -> Option<&ConversationTurn> {
        self.history.last().filter(|t| t.role == Role::User)
    }

    pub(crate) fn push(&mut self, turn: ConversationTurn) {
        self.history.push(turn);
    }

    /// Stores the extracted resume. Returns false, leaving state untouched,
    /// if a resume was already recorded for this session.
    pub(crate) fn record_resume(&mut self, text: String) -> bool {
        if self.resume_text.is_some() {
            return false;
        }
        self.resume_text = Some(text);
        true
    }

    pub(crate) fn touch(&mut self) {
        self.last_active = Utc::now();
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}
