//! Tool Catalog
//!
//! Flattens every advertised operation from every provider, plus the
//! agent's own built-ins, into one addressable namespace with unique
//! names. Built once at startup, immutable afterwards; the ordered
//! spec set is handed read-only to the engine transport.

use std::collections::HashSet;

use crate::capability::{CapabilityRegistry, OperationSpec, ParamKind};
use crate::error::{AgentError, Result};

/// Full name of the built-in pause primitive.
pub const SLEEP_OPERATION: &str = "core_sleep";

/// Immutable, ordered set of every operation advertised to the engine.
pub struct ToolCatalog {
    specs: Vec<OperationSpec>,
}

impl ToolCatalog {
    /// Build the catalog from the loaded registry.
    ///
    /// Selects exactly the declared operations carrying the tool
    /// marker; any other declared member stays private. Appends the
    /// `core` built-ins and verifies global name uniqueness.
    pub fn build(registry: &CapabilityRegistry) -> Result<Self> {
        let mut specs = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for provider in registry.iter() {
            let id = provider.id().to_lowercase();

            for spec in provider.operations() {
                if !spec.is_advertised() {
                    tracing::debug!(member = %spec.name, capability = %id, "not advertised");
                    continue;
                }
                // The name must route back to its owner, or the engine
                // could request an operation nothing can serve.
                if spec.provider_prefix() != id {
                    return Err(AgentError::Unroutable {
                        capability: id,
                        operation: spec.name,
                    });
                }
                if !seen.insert(spec.name.clone()) {
                    return Err(AgentError::DuplicateOperation(spec.name));
                }
                specs.push(spec);
            }
        }

        for spec in builtin_operations() {
            if !seen.insert(spec.name.clone()) {
                return Err(AgentError::DuplicateOperation(spec.name));
            }
            specs.push(spec);
        }

        tracing::info!(operations = specs.len(), "tool catalog built");
        Ok(Self { specs })
    }

    /// Advertised operations, providers in registration order, built-ins last.
    #[must_use]
    pub fn specs(&self) -> &[OperationSpec] {
        &self.specs
    }

    /// Whether an operation name is in the catalog.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.specs.iter().any(|spec| spec.name == name)
    }

    /// All advertised names, in catalog order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Number of advertised operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Built-in operations owned by the agent itself, namespaced under the
/// reserved `core` id.
fn builtin_operations() -> Vec<OperationSpec> {
    vec![OperationSpec::new(
        SLEEP_OPERATION,
        "Pause the agent for a number of seconds before the next turn",
    )
    .param(
        "seconds",
        ParamKind::Number,
        "How long to sleep, in seconds",
        true,
    )]
}
