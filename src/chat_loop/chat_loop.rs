//! Chat loop driver
//!
//! # ChatLoop
//!
//! Drives one top-level call through as many streaming rounds as the
//! server's tool requests need:
//!
//! 1. Build the request from the history and the advertised tool schemas
//! 2. Let every pre-request hook rewrite it, then send it
//! 3. Decode and interpret the response, folding events into the aggregate
//!    and queueing tool calls that have a local callback
//! 4. If the round finished asking for tools, run the queued callbacks one
//!    after another, append their outcomes as an assistant turn, repeat
//! 5. Otherwise, or at the round cap, finalize
//!
//! Tools-exhausted reports are held back and emitted once, after the last
//! round.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::deferred::{ChatStream, DeferredResponse};
use super::lifecycle::{LifecycleEvent, LifecycleKind};
use super::loop_state::RoundState;
use crate::aggregate::AggregatedResponse;
use crate::config::{ClientConfig, LoopConfig};
use crate::error::ClientError;
use crate::events::{EventInterpreter, StreamEvent, ToolResult};
use crate::observer::{Observers, Subscription};
use crate::plugins::PluginRegistry;
use crate::request::{ChatMessage, JsonRequestBuilder, RequestBuilder, ToolInvocation};
use crate::stream::decode_stream;
use crate::transport::{HttpTransport, Transport};

/// Multi-round chat loop
#[derive(Clone)]
pub struct ChatLoop {
    transport: Arc<dyn Transport>,
    builder: Arc<dyn RequestBuilder>,
    registry: Arc<RwLock<PluginRegistry>>,
    config: LoopConfig,
    lifecycle: Observers<LifecycleEvent>,
}

impl std::fmt::Debug for ChatLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatLoop")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl ChatLoop {
    /// Create loop with the default JSON request builder
    pub fn new(transport: Arc<dyn Transport>, registry: Arc<RwLock<PluginRegistry>>) -> Self {
        Self {
            transport,
            builder: Arc::new(JsonRequestBuilder::new()),
            registry,
            config: LoopConfig::default(),
            lifecycle: Observers::new(),
        }
    }

    /// Build HTTP transport and request builder from configuration
    pub fn from_config(
        config: &ClientConfig,
        registry: Arc<RwLock<PluginRegistry>>,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        let transport = config.endpoint.headers.iter().fold(
            HttpTransport::new(config.endpoint.url.clone()).with_timeout(config.endpoint.timeout()),
            |t, (name, value)| t.with_header(name.clone(), value.clone()),
        );

        Ok(Self::new(Arc::new(transport), registry)
            .with_builder(JsonRequestBuilder::with_fields(config.request.fields.clone()))
            .with_config(config.chat_loop.clone()))
    }

    /// Replace the request builder
    pub fn with_builder(mut self, builder: impl RequestBuilder + 'static) -> Self {
        self.builder = Arc::new(builder);
        self
    }

    /// Replace the loop configuration
    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Shared plugin registry
    pub fn registry(&self) -> Arc<RwLock<PluginRegistry>> {
        Arc::clone(&self.registry)
    }

    /// Loop configuration
    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    /// Listen for one lifecycle event kind
    pub fn subscribe<F>(&self, kind: LifecycleKind, listener: F) -> Subscription
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.lifecycle.subscribe(kind, listener)
    }

    /// Listen for every lifecycle event
    pub fn subscribe_all<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.lifecycle.subscribe_all(listener)
    }

    /// Buffered mode: run to completion and return the aggregate
    pub async fn run(&self, messages: Vec<ChatMessage>) -> Result<AggregatedResponse, ClientError> {
        let ChatStream { mut events, response } = self.stream(messages);
        while events.next().await.is_some() {}
        response.await
    }

    /// Streaming mode: events as they arrive plus the deferred aggregate
    ///
    /// Nothing is sent until `events` is polled.
    pub fn stream(&self, messages: Vec<ChatMessage>) -> ChatStream {
        let transport = Arc::clone(&self.transport);
        let builder = Arc::clone(&self.builder);
        let registry = Arc::clone(&self.registry);
        let config = self.config.clone();
        let lifecycle = self.lifecycle.clone();
        let (tx, response) = DeferredResponse::channel();
        let run_id = Uuid::new_v4().to_string();

        let events = async_stream::stream! {
            let mut state = RoundState::new(messages);
            let mut aggregate = AggregatedResponse::new();
            let mut interpreter = EventInterpreter::new();

            lifecycle.emit(&LifecycleEvent::StreamStart {
                run_id: run_id.clone(),
                messages: state.messages.len(),
            });

            let outcome: Result<(), ClientError> = 'rounds: loop {
                state.begin_round();
                let round = state.round;

                // Snapshot what the registry contributes to this round
                let (tools, hooks, callable) = {
                    let registry = registry.read().await;
                    (registry.tool_schemas(), registry.hooks(), registry.callable_tools())
                };
                debug!(
                    run_id = %run_id,
                    round,
                    messages = state.messages.len(),
                    tools = tools.len(),
                    "starting round"
                );

                let mut request = match builder.build(&state.messages, &tools) {
                    Ok(request) => request,
                    Err(e) => break 'rounds Err(e),
                };
                for (plugin, hook) in &hooks {
                    if let Err(e) = hook.pre_request(&mut request).await {
                        warn!(run_id = %run_id, plugin = %plugin, error = %e, "pre-request hook failed");
                        break 'rounds Err(ClientError::Hook {
                            plugin: plugin.clone(),
                            message: e.to_string(),
                        });
                    }
                }

                let source = match transport.send(&request).await {
                    Ok(source) => source,
                    Err(err) => {
                        error!(run_id = %run_id, round, error = %err, "transport failed");
                        if err.is_timeout() {
                            lifecycle.emit(&LifecycleEvent::Timeout { round, message: err.to_string() });
                        }
                        yield StreamEvent::Error(err.to_string());
                        break 'rounds Err(err.into());
                    }
                };

                let mut frames = decode_stream(source);
                while let Some(item) = frames.next().await {
                    let frame = match item {
                        Ok(frame) => frame,
                        Err(err) => {
                            // The error frame describing this was already yielded
                            error!(run_id = %run_id, round, error = %err, "stream failed");
                            if err.is_timeout() {
                                lifecycle.emit(&LifecycleEvent::Timeout { round, message: err.to_string() });
                            }
                            break 'rounds Err(err.into());
                        }
                    };

                    for event in interpreter.interpret(&frame) {
                        match &event {
                            StreamEvent::MaxToolsReached(report) => {
                                state.record_exhausted(report);
                                continue;
                            }
                            StreamEvent::ToolCall(call) if callable.contains(&call.name) => {
                                state.add_pending(call);
                            }
                            StreamEvent::ToolResult(result) => state.resolve(&result.call_id),
                            StreamEvent::Finish(info) => state.record_finish(&info.reason),
                            StreamEvent::Text(text) => state.push_text(text),
                            _ => {}
                        }
                        aggregate.apply(&event);
                        yield event;
                    }
                }

                aggregate.rounds = round;

                if !state.wants_tools(&config.tool_finish_reasons) || state.pending().is_empty() {
                    break 'rounds Ok(());
                }
                if state.cap_reached(config.max_rounds) {
                    info!(
                        run_id = %run_id,
                        round,
                        pending = state.pending().len(),
                        "round cap reached, pending tool calls not executed"
                    );
                    aggregate.round_cap_reached = true;
                    break 'rounds Ok(());
                }

                let mut invocations = Vec::new();
                for call in state.take_pending() {
                    lifecycle.emit(&LifecycleEvent::ToolStart { round, call: call.clone() });

                    let callback = registry.read().await.callback(&call.name);
                    let started = Instant::now();
                    let (output, ok) = match callback {
                        Some(callback) => match callback.call(call.arguments.clone()).await {
                            Ok(value) => (value, true),
                            Err(e) => (json!({ "error": e.to_string() }), false),
                        },
                        None => (
                            json!({ "error": format!("no callback registered for '{}'", call.name) }),
                            false,
                        ),
                    };
                    let elapsed_ms = started.elapsed().as_millis() as u64;

                    if ok {
                        info!(run_id = %run_id, tool = %call.name, call_id = %call.call_id, elapsed_ms, "tool executed");
                    } else {
                        warn!(run_id = %run_id, tool = %call.name, call_id = %call.call_id, elapsed_ms, output = %output, "tool failed");
                    }

                    let result = ToolResult::new(call.call_id.clone(), call.name.clone(), output.clone());
                    lifecycle.emit(&LifecycleEvent::ToolEnd {
                        round,
                        result: result.clone(),
                        elapsed_ms,
                        ok,
                    });

                    invocations.push(ToolInvocation {
                        call_id: call.call_id,
                        name: call.name,
                        arguments: call.arguments,
                        output,
                    });

                    interpreter.note_tool_activity();
                    let event = StreamEvent::ToolResult(result);
                    aggregate.apply(&event);
                    yield event;
                }
                state.append_tool_turn(invocations);
            };

            match outcome {
                Ok(()) => {
                    if let Some(report) = state.take_exhausted() {
                        info!(
                            run_id = %run_id,
                            occurrences = report.occurrences,
                            tools_executed = report.tools_executed,
                            "tool limit reached"
                        );
                        lifecycle.emit(&LifecycleEvent::MaxToolsReached(report.clone()));
                        let event = StreamEvent::MaxToolsReached(report);
                        aggregate.apply(&event);
                        yield event;
                    }

                    let hooks = registry.read().await.hooks();
                    for (plugin, hook) in hooks {
                        if let Err(e) = hook.post_response(&aggregate).await {
                            warn!(run_id = %run_id, plugin = %plugin, error = %e, "post-response hook failed");
                        }
                    }

                    lifecycle.emit(&LifecycleEvent::StreamEnd {
                        response: Box::new(aggregate.clone()),
                    });
                    let _ = tx.send(Ok(aggregate));
                }
                Err(err) => {
                    if !matches!(err, ClientError::Transport(_)) {
                        yield StreamEvent::Error(err.to_string());
                    }
                    let _ = tx.send(Err(err));
                }
            }
        };

        ChatStream {
            events: events.boxed(),
            response,
        }
    }
}
