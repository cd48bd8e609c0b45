//! # agent-core
//!
//! Capability registry and dispatch loop for an autonomous agent.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      DispatchLoop                            │
//! │  ┌──────────────┐  ┌─────────────┐  ┌────────────────────┐   │
//! │  │ Capability   │  │    Tool     │  │  RateLimitedChannel│   │
//! │  │ Registry     │──│   Catalog   │──│  → ReasoningEngine │   │
//! │  └──────────────┘  └─────────────┘  └────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Providers implement the [`Capability`] trait and are assembled into
//! a [`CapabilityRegistry`] at startup (fail-fast). The [`ToolCatalog`]
//! flattens their advertised operations, plus the agent's `core`
//! built-ins, into one unique-name set handed to the engine transport.
//! The [`DispatchLoop`] then cycles: send state to the engine through
//! the [`RateLimitedChannel`], route at most one requested call per
//! response to its provider, feed the result back. Every fault past
//! startup is absorbed as a skipped turn; only cancellation stops it.

pub mod capability;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod message;
pub mod runloop;
pub mod throttle;

pub use capability::{
    Capability, CapabilityRegistry, JsonMap, OperationSpec, ParamKind, ParamSpec, PendingCall,
    CORE_NAMESPACE, TOOL_SUFFIX,
};
pub use catalog::{ToolCatalog, SLEEP_OPERATION};
pub use engine::{EngineResponse, ReasoningEngine, ResponsePart};
pub use error::{AgentError, Result};
pub use message::{Conversation, Outbound, Turn};
pub use runloop::DispatchLoop;
pub use throttle::RateLimitedChannel;
