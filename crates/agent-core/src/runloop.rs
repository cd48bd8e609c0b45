//! Dispatch Loop
//!
//! The orchestrator: drives the single conversation with the reasoning
//! engine turn by turn, extracts at most one requested operation call
//! per response, routes it to its capability provider (or the built-in
//! namespace) and feeds the result back on the next turn.
//!
//! Past startup, every fault is absorbed locally: a transport fault or
//! a failed invocation costs one turn, never the loop. Only the
//! cancellation token ends the run.

use std::time::Duration;

use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::capability::{CapabilityRegistry, PendingCall, CORE_NAMESPACE};
use crate::catalog::{ToolCatalog, SLEEP_OPERATION};
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Outbound, Turn};
use crate::throttle::RateLimitedChannel;

/// Upper bound on a requested sleep, so one bad argument cannot stall
/// the agent for hours.
const MAX_SLEEP_SECS: f64 = 900.0;

/// The agent's dispatch loop.
pub struct DispatchLoop {
    registry: CapabilityRegistry,
    catalog: ToolCatalog,
    channel: RateLimitedChannel,
    conversation: Conversation,
    system_prompt: String,
    cancel: CancellationToken,
}

impl DispatchLoop {
    pub fn new(
        registry: CapabilityRegistry,
        catalog: ToolCatalog,
        channel: RateLimitedChannel,
        system_prompt: impl Into<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry,
            catalog,
            channel,
            conversation: Conversation::new(),
            system_prompt: system_prompt.into(),
            cancel,
        }
    }

    /// Run until cancelled.
    ///
    /// The token is observed between iterations only; an in-flight
    /// send or invocation finishes before the loop stops.
    pub async fn run(mut self) -> Result<()> {
        tracing::info!(
            capabilities = self.registry.len(),
            operations = self.catalog.len(),
            "agent running"
        );

        let mut pending: Option<Outbound> = None;

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("agent stopped");
                return Ok(());
            }

            let outbound = pending
                .take()
                .unwrap_or_else(|| Outbound::Prompt(self.system_prompt.clone()));
            self.conversation.push(Turn::Outbound(outbound));

            let response = match self.channel.send(self.conversation.turns()).await {
                Ok(response) => response,
                Err(err) => {
                    // Transient engine fault: skip this turn, keep looping.
                    tracing::warn!(error = %err, "engine call failed, skipping turn");
                    continue;
                }
            };

            if response.call_count() > 1 {
                tracing::debug!(
                    discarded = response.call_count() - 1,
                    "multiple calls in one response, acting on the first"
                );
            }
            let call = response.first_call().cloned();
            self.conversation.push(Turn::Inbound(response));

            let Some(call) = call else {
                // No action this turn; the next iteration re-sends the prompt.
                continue;
            };

            match self.dispatch(&call).await {
                Ok(value) => {
                    tracing::info!(operation = %call.name, "operation completed");
                    pending = Some(Outbound::OperationResult {
                        name: call.name,
                        value,
                    });
                }
                Err(err) => {
                    tracing::warn!(operation = %call.name, error = %err, "operation failed, skipping turn");
                }
            }
        }
    }

    /// Resolve and invoke a single requested call.
    async fn dispatch(&self, call: &PendingCall) -> Result<Value> {
        let provider_id = call.provider_id();

        if provider_id == CORE_NAMESPACE {
            return self.invoke_builtin(call).await;
        }

        let provider = self
            .registry
            .get(provider_id)
            .ok_or_else(|| AgentError::UnknownCapability(provider_id.to_string()))?;

        provider.invoke(&call.name, &call.args).await
    }

    /// Built-in operations under the reserved `core` namespace.
    async fn invoke_builtin(&self, call: &PendingCall) -> Result<Value> {
        match call.name.as_str() {
            SLEEP_OPERATION => {
                let seconds = call
                    .args
                    .get("seconds")
                    .and_then(Value::as_f64)
                    .ok_or_else(|| {
                        AgentError::InvalidArguments(
                            "core_sleep requires a numeric 'seconds'".into(),
                        )
                    })?;
                if !(0.0..=MAX_SLEEP_SECS).contains(&seconds) {
                    return Err(AgentError::InvalidArguments(format!(
                        "seconds out of range: {seconds}"
                    )));
                }

                tracing::info!(seconds, "sleeping");
                tokio::time::sleep(Duration::from_secs_f64(seconds)).await;
                Ok(json!({ "slept_secs": seconds }))
            }
            other => Err(AgentError::UnknownOperation {
                capability: CORE_NAMESPACE.into(),
                operation: other.into(),
            }),
        }
    }

    /// The conversation so far (read-only).
    #[must_use]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// The advertised operation set.
    #[must_use]
    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{Capability, JsonMap, OperationSpec};
    use crate::engine::{EngineResponse, ReasoningEngine, ResponsePart};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    /// Replays scripted responses and snapshots the history of every
    /// send; cancels the loop once the script is exhausted.
    struct ScriptedEngine {
        script: Mutex<Vec<Result<EngineResponse>>>,
        histories: Mutex<Vec<Vec<Turn>>>,
        cancel: CancellationToken,
    }

    impl ScriptedEngine {
        fn new(script: Vec<Result<EngineResponse>>, cancel: CancellationToken) -> Self {
            Self {
                script: Mutex::new(script),
                histories: Mutex::new(Vec::new()),
                cancel,
            }
        }

        fn histories(&self) -> Vec<Vec<Turn>> {
            self.histories.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ReasoningEngine for ScriptedEngine {
        async fn send(&self, history: &[Turn]) -> Result<EngineResponse> {
            self.histories.lock().unwrap().push(history.to_vec());
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                self.cancel.cancel();
                return Ok(EngineResponse::default());
            }
            script.remove(0)
        }
    }

    /// Counts invocations and replays a fixed outcome.
    struct RecordingCapability {
        id: &'static str,
        operations: Vec<OperationSpec>,
        outcome: fn() -> Result<Value>,
        invocations: Mutex<Vec<(String, JsonMap)>>,
    }

    impl RecordingCapability {
        fn ping(outcome: fn() -> Result<Value>) -> Self {
            Self {
                id: "alpha",
                operations: vec![OperationSpec::new("alpha_ping_tool", "Ping")],
                outcome,
                invocations: Mutex::new(Vec::new()),
            }
        }

        fn invocation_count(&self) -> usize {
            self.invocations.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Capability for RecordingCapability {
        fn id(&self) -> &str {
            self.id
        }

        fn operations(&self) -> Vec<OperationSpec> {
            self.operations.clone()
        }

        async fn invoke(&self, operation: &str, args: &JsonMap) -> Result<Value> {
            self.invocations
                .lock()
                .unwrap()
                .push((operation.to_string(), args.clone()));
            (self.outcome)()
        }
    }

    fn call_response(name: &str) -> Result<EngineResponse> {
        Ok(EngineResponse {
            parts: vec![ResponsePart::call(PendingCall::new(name, JsonMap::new()))],
        })
    }

    fn build_loop(
        capability: Arc<RecordingCapability>,
        script: Vec<Result<EngineResponse>>,
    ) -> (DispatchLoop, Arc<ScriptedEngine>) {
        let cancel = CancellationToken::new();
        let engine = Arc::new(ScriptedEngine::new(script, cancel.clone()));
        let registry = CapabilityRegistry::load(vec![capability as Arc<dyn Capability>]).unwrap();
        let catalog = ToolCatalog::build(&registry).unwrap();
        let channel = RateLimitedChannel::new(engine.clone(), Duration::ZERO);
        let agent = DispatchLoop::new(registry, catalog, channel, "system prompt", cancel);
        (agent, engine)
    }

    fn last_outbound(history: &[Turn]) -> &Outbound {
        match history.last().unwrap() {
            Turn::Outbound(outbound) => outbound,
            Turn::Inbound(_) => panic!("expected an outbound turn"),
        }
    }

    #[tokio::test]
    async fn invoked_result_becomes_the_next_outbound_payload() {
        let capability = Arc::new(RecordingCapability::ping(|| Ok(json!("pong"))));
        let (agent, engine) =
            build_loop(capability.clone(), vec![call_response("alpha_ping_tool")]);

        agent.run().await.unwrap();

        assert_eq!(capability.invocation_count(), 1);
        let histories = engine.histories();
        assert_eq!(histories.len(), 2);
        assert!(matches!(
            last_outbound(&histories[0]),
            Outbound::Prompt(prompt) if prompt == "system prompt"
        ));
        assert!(matches!(
            last_outbound(&histories[1]),
            Outbound::OperationResult { name, value }
                if name == "alpha_ping_tool" && *value == json!("pong")
        ));
    }

    #[tokio::test]
    async fn failed_invocation_skips_the_turn_and_reuses_the_prompt() {
        let capability = Arc::new(RecordingCapability::ping(|| {
            Err(AgentError::Capability("boom".into()))
        }));
        let (agent, engine) =
            build_loop(capability.clone(), vec![call_response("alpha_ping_tool")]);

        agent.run().await.unwrap();

        assert_eq!(capability.invocation_count(), 1);
        let histories = engine.histories();
        assert!(matches!(
            last_outbound(&histories[1]),
            Outbound::Prompt(prompt) if prompt == "system prompt"
        ));
    }

    #[tokio::test]
    async fn unknown_provider_id_is_skipped_without_invoking_anything() {
        let capability = Arc::new(RecordingCapability::ping(|| Ok(json!("pong"))));
        let (agent, engine) =
            build_loop(capability.clone(), vec![call_response("ghost_do_tool")]);

        agent.run().await.unwrap();

        assert_eq!(capability.invocation_count(), 0);
        assert!(matches!(
            last_outbound(&engine.histories()[1]),
            Outbound::Prompt(_)
        ));
    }

    #[tokio::test]
    async fn server_fault_on_send_skips_the_turn_and_keeps_looping() {
        let capability = Arc::new(RecordingCapability::ping(|| Ok(json!("pong"))));
        let (agent, engine) = build_loop(
            capability,
            vec![
                Err(AgentError::Engine("500".into())),
                Ok(EngineResponse::default()),
            ],
        );

        agent.run().await.unwrap();

        // The loop survived the fault and sent the prompt again.
        let histories = engine.histories();
        assert!(histories.len() >= 2);
        assert!(matches!(last_outbound(&histories[1]), Outbound::Prompt(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn core_sleep_routes_to_the_builtin_never_a_provider() {
        let capability = Arc::new(RecordingCapability::ping(|| Ok(json!("pong"))));
        let mut args = JsonMap::new();
        args.insert("seconds".into(), json!(2.0));
        let (agent, engine) = build_loop(
            capability.clone(),
            vec![Ok(EngineResponse {
                parts: vec![ResponsePart::call(PendingCall::new("core_sleep", args))],
            })],
        );

        agent.run().await.unwrap();

        assert_eq!(capability.invocation_count(), 0);
        assert!(matches!(
            last_outbound(&engine.histories()[1]),
            Outbound::OperationResult { name, value }
                if name == "core_sleep" && value["slept_secs"] == json!(2.0)
        ));
    }

    #[tokio::test]
    async fn only_the_first_call_of_a_multi_call_response_is_acted_upon() {
        let capability = Arc::new(RecordingCapability::ping(|| Ok(json!("pong"))));
        let response = EngineResponse {
            parts: vec![
                ResponsePart::call(PendingCall::new("alpha_ping_tool", JsonMap::new())),
                ResponsePart::call(PendingCall::new("ghost_do_tool", JsonMap::new())),
            ],
        };
        let (agent, engine) = build_loop(capability.clone(), vec![Ok(response)]);

        agent.run().await.unwrap();

        let invocations = capability.invocations.lock().unwrap().clone();
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].0, "alpha_ping_tool");
        assert!(matches!(
            last_outbound(&engine.histories()[1]),
            Outbound::OperationResult { name, .. } if name == "alpha_ping_tool"
        ));
    }

    #[tokio::test]
    async fn cancellation_stops_the_loop_cleanly() {
        let capability = Arc::new(RecordingCapability::ping(|| Ok(json!("pong"))));
        let (agent, engine) = build_loop(capability, Vec::new());

        // The scripted engine cancels on its first (empty-script) send.
        agent.run().await.unwrap();
        assert_eq!(engine.histories().len(), 1);
    }
}
