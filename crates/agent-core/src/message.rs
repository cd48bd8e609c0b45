//! Conversation Turns
//!
//! Ordered turn model for the single conversation the dispatch loop
//! owns. Turns are only ever appended, never rolled back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::EngineResponse;

/// Outbound payload for one turn.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Outbound {
    /// Free text: the system prompt on the first turn, and again on any
    /// turn that produced no operation result.
    Prompt(String),

    /// Structured result of the previous operation, keyed by its full
    /// name (the `{operationName: value}` wrapper on the wire).
    OperationResult { name: String, value: Value },
}

/// A single turn in the conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum Turn {
    Outbound(Outbound),
    Inbound(EngineResponse),
}

/// Append-only conversation history, owned by the dispatch loop.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. The only mutation the conversation supports.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// All turns, oldest first.
    #[must_use]
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The most recent turn.
    #[must_use]
    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    /// Number of turns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversation_appends_in_order() {
        let mut conversation = Conversation::new();
        conversation.push(Turn::Outbound(Outbound::Prompt("go".into())));
        conversation.push(Turn::Inbound(EngineResponse::default()));
        conversation.push(Turn::Outbound(Outbound::OperationResult {
            name: "alpha_ping_tool".into(),
            value: json!("pong"),
        }));

        assert_eq!(conversation.len(), 3);
        assert!(matches!(
            conversation.last(),
            Some(Turn::Outbound(Outbound::OperationResult { name, .. })) if name == "alpha_ping_tool"
        ));
    }
}
