//! Reasoning Engine Contract
//!
//! Strategy trait hiding the conversational backend. The dispatch loop
//! works exclusively through this interface, so transports can be
//! swapped without touching agent logic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::capability::PendingCall;
use crate::error::Result;
use crate::message::Turn;

/// One part of an inbound engine response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResponsePart {
    /// Free-text content, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Requested operation call, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub call: Option<PendingCall>,
}

impl ResponsePart {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: Some(content.into()),
            call: None,
        }
    }

    #[must_use]
    pub fn call(call: PendingCall) -> Self {
        Self {
            text: None,
            call: Some(call),
        }
    }
}

/// Inbound response: an ordered sequence of parts, at most one of
/// which is acted upon per turn.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineResponse {
    pub parts: Vec<ResponsePart>,
}

impl EngineResponse {
    /// First requested call, if any. Later calls in the same response
    /// are discarded by the dispatch loop.
    #[must_use]
    pub fn first_call(&self) -> Option<&PendingCall> {
        self.parts.iter().find_map(|part| part.call.as_ref())
    }

    /// Number of requested calls across all parts.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.parts.iter().filter(|part| part.call.is_some()).count()
    }

    /// Concatenated free text across all parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

/// Strategy trait for the reasoning engine driving the agent.
#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    /// Send the conversation so far and obtain the next response.
    ///
    /// Errors map onto the agent taxonomy: `ResourceExhausted` for
    /// capacity limits (absorbed by the channel), `Engine` for
    /// server-side and transport faults (skips the turn).
    async fn send(&self, history: &[Turn]) -> Result<EngineResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::JsonMap;

    #[test]
    fn first_call_picks_the_first_part_carrying_one() {
        let response = EngineResponse {
            parts: vec![
                ResponsePart::text("thinking"),
                ResponsePart::call(PendingCall::new("alpha_ping_tool", JsonMap::new())),
                ResponsePart::call(PendingCall::new("beta_pong_tool", JsonMap::new())),
            ],
        };

        assert_eq!(response.call_count(), 2);
        assert_eq!(response.first_call().unwrap().name, "alpha_ping_tool");
    }

    #[test]
    fn empty_response_has_no_call() {
        let response = EngineResponse::default();
        assert!(response.first_call().is_none());
        assert_eq!(response.text(), "");
    }
}
