//! Rate-Limited Engine Channel
//!
//! Throttling wrapper around the reasoning-engine transport. Enforces
//! a minimum spacing between two consecutive underlying sends and
//! absorbs resource-exhaustion failures by retrying the same request
//! until the transport answers with anything else.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::engine::{EngineResponse, ReasoningEngine};
use crate::error::Result;
use crate::message::Turn;

/// Rate-limited channel to the reasoning engine.
///
/// Single-writer: the dispatch loop is the only caller, so the
/// limiter state needs no synchronization.
pub struct RateLimitedChannel {
    engine: Arc<dyn ReasoningEngine>,
    interval: Duration,
    last_attempt: Option<Instant>,
}

impl RateLimitedChannel {
    pub fn new(engine: Arc<dyn ReasoningEngine>, interval: Duration) -> Self {
        Self {
            engine,
            interval,
            last_attempt: None,
        }
    }

    /// Send the conversation through the underlying transport.
    ///
    /// Waits out the remainder of the spacing interval first. On a
    /// resource-exhaustion failure the request is retried on the next
    /// interval boundary, indefinitely; the first non-exhaustion
    /// outcome (success or a different error class) is returned to
    /// the caller unmodified.
    pub async fn send(&mut self, history: &[Turn]) -> Result<EngineResponse> {
        let mut attempts: u64 = 0;

        loop {
            if let Some(last) = self.last_attempt {
                let elapsed = last.elapsed();
                if elapsed < self.interval {
                    tokio::time::sleep(self.interval - elapsed).await;
                }
            }

            // Every attempt counts against the spacing budget,
            // successful or not.
            self.last_attempt = Some(Instant::now());
            attempts += 1;

            match self.engine.send(history).await {
                Err(err) if err.is_resource_exhaustion() => {
                    tracing::warn!(attempt = attempts, error = %err, "engine rate limited, retrying");
                }
                outcome => return outcome,
            }
        }
    }

    /// Configured minimum spacing between underlying sends.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}
