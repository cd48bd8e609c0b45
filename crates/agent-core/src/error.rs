//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// Reasoning-engine transport hit a capacity limit (retried by the channel)
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Server-side fault from the reasoning engine (skips the turn)
    #[error("Engine error: {0}")]
    Engine(String),

    /// Two capability providers declared the same identity
    #[error("Duplicate capability id: {0}")]
    DuplicateCapability(String),

    /// A provider claimed the reserved built-in namespace
    #[error("Capability id '{0}' is reserved")]
    ReservedNamespace(String),

    /// Two advertised operations share a name
    #[error("Duplicate operation name: {0}")]
    DuplicateOperation(String),

    /// An advertised operation name does not carry its owner's routing prefix
    #[error("Operation '{operation}' cannot route back to capability '{capability}'")]
    Unroutable {
        capability: String,
        operation: String,
    },

    /// No capability registered under the requested id
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// The capability does not expose the requested operation
    #[error("Unknown operation '{operation}' on capability '{capability}'")]
    UnknownOperation {
        capability: String,
        operation: String,
    },

    /// Arguments supplied by the engine do not satisfy the operation schema
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Capability invocation failed
    #[error("Capability error: {0}")]
    Capability(String),

    /// Configuration error (missing credentials, bad values)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AgentError {
    /// The transient capacity-limit class absorbed by the rate-limited channel.
    #[must_use]
    pub const fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::ResourceExhausted(_))
    }

    /// Faults that abort startup; everything else is absorbed once the loop runs.
    #[must_use]
    pub const fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::DuplicateCapability(_)
                | Self::ReservedNamespace(_)
                | Self::DuplicateOperation(_)
                | Self::Unroutable { .. }
                | Self::Config(_)
        )
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Capability(err.to_string())
    }
}
