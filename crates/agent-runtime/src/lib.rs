//! # agent-runtime
//!
//! Reasoning-engine transports for the autonomous agent.
//!
//! ## Transports
//!
//! - **Gemini** (default): `generateContent` REST API with function
//!   calling
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::GeminiEngine;
//!
//! let engine = GeminiEngine::from_env(catalog.specs())?;
//! let channel = RateLimitedChannel::new(Arc::new(engine), interval);
//! ```

pub mod gemini;

pub use gemini::{GeminiConfig, GeminiEngine};

// Re-export core types for convenience
pub use agent_core::{
    AgentError, Capability, CapabilityRegistry, DispatchLoop, EngineResponse, RateLimitedChannel,
    ReasoningEngine, Result, ToolCatalog,
};
