//! Append-only question/answer history.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

/// Who produced a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ChatRole {
    /// The person asking.
    User,
    /// The query engine.
    Assistant,
}

/// One message in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatTurn {
    /// Author of the turn.
    pub role: ChatRole,
    /// Message text.
    pub text: String,
    /// Follow-ups offered with an assistant answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_questions: Option<Vec<String>>,
    /// Set when the question could not be answered.
    #[serde(default)]
    pub error: bool,
}

impl ChatTurn {
    /// A question from the user.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            suggested_questions: None,
            error: false,
        }
    }

    /// A successful answer.
    #[must_use]
    pub fn assistant(text: impl Into<String>, suggested_questions: Vec<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            suggested_questions: Some(suggested_questions),
            error: false,
        }
    }

    /// An answer reporting a failure.
    #[must_use]
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
            suggested_questions: None,
            error: true,
        }
    }
}

/// Session chat log. Turns can be appended or cleared, never edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    /// Appends a turn.
    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turns have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Removes every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_turn_order() {
        let mut history = ChatHistory::default();
        history.push(ChatTurn::user("What is the overall BLI?"));
        history.push(ChatTurn::assistant("0.2500", vec!["Next?".to_string()]));
        history.push(ChatTurn::failure("no data"));

        let roles: Vec<ChatRole> = history.turns().iter().map(|t| t.role).collect();
        assert_eq!(roles, [ChatRole::User, ChatRole::Assistant, ChatRole::Assistant]);
        assert!(history.turns()[2].error);
        assert!(!history.turns()[1].error);

        history.clear();
        assert!(history.is_empty());
    }

    #[test]
    fn user_turns_omit_suggestions_when_serialized() {
        let json = serde_json::to_value(ChatTurn::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("suggestedQuestions").is_none());
        assert_eq!(json["error"], false);
    }
}
