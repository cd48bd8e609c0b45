//! Error Types for Capability Providers

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CapabilityError>;

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("RPC error: {0}")]
    Rpc(String),
}

impl From<CapabilityError> for AgentError {
    fn from(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Config(msg) => Self::Config(msg),
            CapabilityError::InvalidArgument(msg) => Self::InvalidArguments(msg),
            other => Self::Capability(other.to_string()),
        }
    }
}
