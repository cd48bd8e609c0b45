//! Capability System
//!
//! Capability providers declare their invocable operations statically
//! and are assembled into a registry at startup. The operation name
//! carries the routing key: the token before the first `_` is the id
//! of the owning provider.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{AgentError, Result};

/// Suffix marking a declared operation as advertised to the reasoning engine.
///
/// Anything a provider declares without this suffix is a private member
/// and never appears in the tool catalog.
pub const TOOL_SUFFIX: &str = "_tool";

/// Reserved namespace for the agent's own built-in operations.
pub const CORE_NAMESPACE: &str = "core";

/// Argument mapping as supplied by the reasoning engine.
pub type JsonMap = Map<String, Value>;

/// Primitive parameter kinds exposable in an operation schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
}

/// One declared parameter of an operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name
    pub name: String,

    /// Primitive kind
    pub kind: ParamKind,

    /// Human-readable description (shown to the engine)
    pub description: String,

    /// Whether the engine must supply this parameter
    #[serde(default)]
    pub required: bool,
}

/// A named, schema-described callable action belonging to a provider
/// or to the built-in namespace.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OperationSpec {
    /// Globally unique full name, `{providerId}_{verb}_tool`
    pub name: String,

    /// Human-readable description used when advertising the operation
    pub description: String,

    /// Declared parameters
    #[serde(default)]
    pub params: Vec<ParamSpec>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    /// Append a parameter (builder style).
    #[must_use]
    pub fn param(
        mut self,
        name: impl Into<String>,
        kind: ParamKind,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.params.push(ParamSpec {
            name: name.into(),
            kind,
            description: description.into(),
            required,
        });
        self
    }

    /// Whether this operation is advertised to the engine.
    #[must_use]
    pub fn is_advertised(&self) -> bool {
        self.name.ends_with(TOOL_SUFFIX)
    }

    /// Routing key: the token before the first separator.
    #[must_use]
    pub fn provider_prefix(&self) -> &str {
        self.name.split('_').next().unwrap_or("")
    }
}

/// A requested operation invocation extracted from one engine response.
///
/// Lives for a single loop iteration; never persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingCall {
    /// Full operation name
    pub name: String,

    /// Argument mapping supplied by the engine
    #[serde(default)]
    pub args: JsonMap,
}

impl PendingCall {
    pub fn new(name: impl Into<String>, args: JsonMap) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// Provider id this call routes to.
    #[must_use]
    pub fn provider_id(&self) -> &str {
        self.name.split('_').next().unwrap_or("")
    }
}

/// Capability provider contract.
///
/// Construction happens before registration and must either fully
/// succeed or fail; a provider handed to the registry is ready to
/// serve every operation it declares.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Identity token, unique across the registry (compared lowercased).
    fn id(&self) -> &str;

    /// Declared operations, in advertisement order.
    fn operations(&self) -> Vec<OperationSpec>;

    /// Invoke an operation by its full name with engine-supplied arguments.
    ///
    /// The return value must be representable as JSON; it becomes the
    /// structured result fed back to the engine on the next turn.
    async fn invoke(&self, operation: &str, args: &JsonMap) -> Result<Value>;
}

/// Registry of capability providers, keyed by lowercased id.
///
/// Assembled once at startup and read-only afterwards.
pub struct CapabilityRegistry {
    providers: Vec<Arc<dyn Capability>>,
    index: HashMap<String, usize>,
}

impl CapabilityRegistry {
    /// Assemble the registry from already-constructed providers.
    ///
    /// Fails on a duplicate id or on a provider claiming the reserved
    /// `core` namespace: the agent never starts with an ambiguous
    /// routing table.
    pub fn load(providers: Vec<Arc<dyn Capability>>) -> Result<Self> {
        let mut index = HashMap::with_capacity(providers.len());

        for (position, provider) in providers.iter().enumerate() {
            let id = provider.id().to_lowercase();

            if id == CORE_NAMESPACE {
                return Err(AgentError::ReservedNamespace(id));
            }
            if index.insert(id.clone(), position).is_some() {
                return Err(AgentError::DuplicateCapability(id));
            }

            tracing::info!(capability = %id, "loaded capability");
        }

        Ok(Self { providers, index })
    }

    /// Look up a provider by id (case-insensitive).
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Capability>> {
        self.index
            .get(&id.to_lowercase())
            .map(|&position| &self.providers[position])
    }

    /// Providers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Capability>> {
        self.providers.iter()
    }

    /// Number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct StubCapability {
        id: &'static str,
    }

    #[async_trait]
    impl Capability for StubCapability {
        fn id(&self) -> &str {
            self.id
        }

        fn operations(&self) -> Vec<OperationSpec> {
            Vec::new()
        }

        async fn invoke(&self, _operation: &str, _args: &JsonMap) -> Result<Value> {
            Ok(json!(null))
        }
    }

    #[test]
    fn load_keys_providers_by_lowercased_id() {
        let registry = CapabilityRegistry::load(vec![
            Arc::new(StubCapability { id: "Alpha" }),
            Arc::new(StubCapability { id: "beta" }),
        ])
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.get("alpha").is_some());
        assert!(registry.get("ALPHA").is_some());
        assert!(registry.get("gamma").is_none());
    }

    #[test]
    fn duplicate_ids_fail_load() {
        let result = CapabilityRegistry::load(vec![
            Arc::new(StubCapability { id: "alpha" }),
            Arc::new(StubCapability { id: "Alpha" }),
        ]);

        assert!(matches!(result, Err(AgentError::DuplicateCapability(id)) if id == "alpha"));
    }

    #[test]
    fn reserved_namespace_fails_load() {
        let result = CapabilityRegistry::load(vec![Arc::new(StubCapability { id: "core" })]);

        assert!(matches!(result, Err(AgentError::ReservedNamespace(_))));
    }

    #[test]
    fn pending_call_routing_key_is_first_token() {
        let call = PendingCall::new("alpha_ping_tool", JsonMap::new());
        assert_eq!(call.provider_id(), "alpha");

        let builtin = PendingCall::new("core_sleep", JsonMap::new());
        assert_eq!(builtin.provider_id(), "core");
    }

    #[test]
    fn operation_spec_marker_and_prefix() {
        let op = OperationSpec::new("alpha_ping_tool", "Ping").param(
            "count",
            ParamKind::Integer,
            "How many",
            false,
        );
        assert!(op.is_advertised());
        assert_eq!(op.provider_prefix(), "alpha");
        assert_eq!(op.params.len(), 1);

        let private = OperationSpec::new("alpha_helper", "Internal");
        assert!(!private.is_advertised());
    }
}
