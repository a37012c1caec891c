//! Execution engine — single calls, concurrent batches, conversational turns.
//!
//! Entry points:
//!   - `execute_call`: one tool through the full enforcement pipeline
//!   - `execute_batch`: up to 8 calls concurrently, results in request order
//!   - `run_turn`: bounded request/respond rounds against a model provider,
//!     streaming events to the caller as they happen
//!
//! A turn is sequential across rounds (each round depends on the previous
//! round's tool output) but batch items within a round run concurrently.
//! Nothing here throws past the engine boundary except `InvalidActor` and
//! `BatchLimitExceeded`, both raised before side effects.

pub mod model;

pub use model::{ChatMessage, ChatRole, ModelProvider, ModelReply, ScriptedProvider, ToolCallRequest};

use crate::actor::{resolve, AccessLevel, Actor};
use crate::enforcer::{AccessEnforcer, AuditSink, ToolOutcome};
use crate::tools::ToolCatalog;
use crate::types::{EngineConfig, Error, Result};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

// =============================================================================
// Batch results
// =============================================================================

/// Aggregate result of a batch request.
///
/// `success` is true iff at least one item succeeded; partial success is a
/// valid terminal state, not an error. `results[i]` always corresponds to
/// the i-th request, regardless of completion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub success: bool,
    pub results: Vec<ToolOutcome>,
}

// =============================================================================
// Turn events and results
// =============================================================================

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStopReason {
    /// The model produced a final answer with no further tool requests.
    Completed,
    /// The round cap was reached; the last partial answer is returned.
    RoundLimit,
    /// The model provider failed; the last partial answer is returned.
    ModelError,
}

/// Incremental event streamed to the caller while a turn runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TurnEvent {
    RoundStarted { round: u32 },
    AnswerDelta { text: String },
    ToolStarted { tool_name: String },
    ToolFinished {
        tool_name: String,
        success: bool,
        duration_ms: u64,
    },
    Completed { stop_reason: TurnStopReason },
}

/// Terminal result of a conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResult {
    pub answer: String,
    pub rounds: u32,
    pub tool_calls: u32,
    pub stop_reason: TurnStopReason,
}

// =============================================================================
// Engine
// =============================================================================

/// Capability-scoped tool execution engine.
///
/// The catalog is immutable after construction and shared read-only across
/// concurrent calls; per-call state lives entirely on the stack.
#[derive(Debug)]
pub struct ExecutionEngine {
    catalog: Arc<ToolCatalog>,
    enforcer: AccessEnforcer,
    config: EngineConfig,
}

impl ExecutionEngine {
    pub fn new(catalog: Arc<ToolCatalog>, audit: Arc<dyn AuditSink>, config: EngineConfig) -> Self {
        let enforcer = AccessEnforcer::new(audit, config.call_timeout);
        Self {
            catalog,
            enforcer,
            config,
        }
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Bounded channel sized for turn event streaming.
    pub fn event_channel(&self) -> (mpsc::Sender<TurnEvent>, mpsc::Receiver<TurnEvent>) {
        mpsc::channel(self.config.stream_channel_capacity)
    }

    // =========================================================================
    // Single call
    // =========================================================================

    /// Execute one tool call through admission, scoping, redaction, and audit.
    ///
    /// Errors only on a malformed actor; every tool-level failure comes back
    /// as a structured [`ToolOutcome`].
    pub async fn execute_call(
        &self,
        actor: &Actor,
        tool_name: &str,
        args: Value,
    ) -> Result<ToolOutcome> {
        let level = resolve(actor)?;
        Ok(self
            .enforcer
            .execute(&self.catalog, actor, level, tool_name, args)
            .await)
    }

    // =========================================================================
    // Batch call
    // =========================================================================

    /// Execute a batch of tool calls concurrently, preserving request order.
    ///
    /// Rejects the whole batch before any execution when it exceeds the size
    /// cap. Per-item failures (unknown names, denials, handler errors) never
    /// abort the batch.
    pub async fn execute_batch(
        &self,
        actor: &Actor,
        calls: Vec<ToolCallRequest>,
    ) -> Result<BatchOutcome> {
        let level = resolve(actor)?;

        if calls.len() > self.config.max_batch_size {
            return Err(Error::batch_limit(format!(
                "{} calls requested, maximum is {}",
                calls.len(),
                self.config.max_batch_size
            )));
        }

        let results = self.run_concurrent(actor, level, calls).await;
        let success = results.iter().any(|r| r.success);
        Ok(BatchOutcome { success, results })
    }

    /// Fan the calls out concurrently; `join_all` keeps request order.
    async fn run_concurrent(
        &self,
        actor: &Actor,
        level: AccessLevel,
        calls: Vec<ToolCallRequest>,
    ) -> Vec<ToolOutcome> {
        let futures: Vec<_> = calls
            .into_iter()
            .map(|call| async move {
                self.enforcer
                    .execute(&self.catalog, actor, level, &call.tool_name, call.args)
                    .await
            })
            .collect();
        join_all(futures).await
    }

    // =========================================================================
    // Turn
    // =========================================================================

    /// Drive one conversational turn against a model provider.
    ///
    /// The actor sees only the tools admissible at its level; tool results
    /// are fed back into the next round. Ends on a final answer, on the
    /// round cap (returning the last partial answer), or on a provider
    /// failure. Events stream over `events`; a closed receiver stops
    /// streaming but never stops in-flight tool execution.
    pub async fn run_turn(
        &self,
        actor: &Actor,
        user_message: &str,
        provider: &dyn ModelProvider,
        events: mpsc::Sender<TurnEvent>,
    ) -> Result<TurnResult> {
        let level = resolve(actor)?;
        let tool_prompt = self.catalog.generate_prompt(level);

        let mut conversation = vec![ChatMessage::user(user_message)];
        let mut answer = String::new();
        let mut tool_calls_total: u32 = 0;
        let mut streaming = true;
        let mut round: u32 = 0;

        loop {
            round += 1;
            emit(&events, &mut streaming, TurnEvent::RoundStarted { round }).await;

            let reply = match provider.next_reply(&conversation, &tool_prompt).await {
                Ok(reply) => reply,
                Err(err) => {
                    tracing::error!(round, error = %err, "model provider failed");
                    return self
                        .finish_turn(
                            &events,
                            &mut streaming,
                            answer,
                            round,
                            tool_calls_total,
                            TurnStopReason::ModelError,
                        )
                        .await;
                }
            };

            let (text, calls, parallel) = match reply {
                ModelReply::Final { text } => {
                    if !text.is_empty() {
                        emit(
                            &events,
                            &mut streaming,
                            TurnEvent::AnswerDelta { text: text.clone() },
                        )
                        .await;
                        answer = text;
                    }
                    return self
                        .finish_turn(
                            &events,
                            &mut streaming,
                            answer,
                            round,
                            tool_calls_total,
                            TurnStopReason::Completed,
                        )
                        .await;
                }
                ModelReply::ToolCalls {
                    text,
                    calls,
                    parallel,
                } => (text, calls, parallel),
            };

            if let Some(text) = text {
                if !text.is_empty() {
                    emit(
                        &events,
                        &mut streaming,
                        TurnEvent::AnswerDelta { text: text.clone() },
                    )
                    .await;
                    conversation.push(ChatMessage::assistant(text.clone()));
                    answer = text;
                }
            }

            // Zero tool requests means the model is done, whatever it called
            // the reply.
            if calls.is_empty() {
                return self
                    .finish_turn(
                        &events,
                        &mut streaming,
                        answer,
                        round,
                        tool_calls_total,
                        TurnStopReason::Completed,
                    )
                    .await;
            }

            if calls.len() > self.config.max_batch_size {
                tracing::warn!(
                    round,
                    requested = calls.len(),
                    cap = self.config.max_batch_size,
                    "round tool-call cap exceeded, nothing executed"
                );
                conversation.push(ChatMessage::tool(
                    serde_json::json!({
                        "error": format!(
                            "batch limit exceeded: {} calls requested, maximum is {}",
                            calls.len(),
                            self.config.max_batch_size
                        )
                    })
                    .to_string(),
                ));
                continue;
            }

            tool_calls_total += calls.len() as u32;

            let concurrent = parallel && calls.len() > 1;
            let outcomes = if concurrent {
                for call in &calls {
                    emit(
                        &events,
                        &mut streaming,
                        TurnEvent::ToolStarted {
                            tool_name: call.tool_name.clone(),
                        },
                    )
                    .await;
                }
                self.run_concurrent(actor, level, calls).await
            } else {
                let mut outcomes = Vec::with_capacity(calls.len());
                for call in calls {
                    emit(
                        &events,
                        &mut streaming,
                        TurnEvent::ToolStarted {
                            tool_name: call.tool_name.clone(),
                        },
                    )
                    .await;
                    let outcome = self
                        .enforcer
                        .execute(&self.catalog, actor, level, &call.tool_name, call.args)
                        .await;
                    emit(
                        &events,
                        &mut streaming,
                        TurnEvent::ToolFinished {
                            tool_name: outcome.tool_name.clone(),
                            success: outcome.success,
                            duration_ms: outcome.duration_ms,
                        },
                    )
                    .await;
                    outcomes.push(outcome);
                }
                outcomes
            };

            // Concurrent path still reports completion in request order.
            if concurrent {
                for outcome in &outcomes {
                    emit(
                        &events,
                        &mut streaming,
                        TurnEvent::ToolFinished {
                            tool_name: outcome.tool_name.clone(),
                            success: outcome.success,
                            duration_ms: outcome.duration_ms,
                        },
                    )
                    .await;
                }
            }

            for outcome in outcomes {
                let content = serde_json::to_string(&outcome)
                    .unwrap_or_else(|_| format!("{{\"tool_name\":\"{}\"}}", outcome.tool_name));
                conversation.push(ChatMessage::tool(content));
            }

            if round >= self.config.max_turn_rounds {
                tracing::warn!(round, "turn round limit reached, returning partial answer");
                return self
                    .finish_turn(
                        &events,
                        &mut streaming,
                        answer,
                        round,
                        tool_calls_total,
                        TurnStopReason::RoundLimit,
                    )
                    .await;
            }
        }
    }

    async fn finish_turn(
        &self,
        events: &mpsc::Sender<TurnEvent>,
        streaming: &mut bool,
        answer: String,
        rounds: u32,
        tool_calls: u32,
        stop_reason: TurnStopReason,
    ) -> Result<TurnResult> {
        emit(events, streaming, TurnEvent::Completed { stop_reason }).await;
        Ok(TurnResult {
            answer,
            rounds,
            tool_calls,
            stop_reason,
        })
    }
}

/// Forward an event unless the stream has already failed.
///
/// A transport error is logged once and ends the stream; output already sent
/// stays intact and in-flight tool work continues.
async fn emit(events: &mpsc::Sender<TurnEvent>, streaming: &mut bool, event: TurnEvent) {
    if *streaming && events.send(event).await.is_err() {
        tracing::warn!("turn event receiver dropped, streaming stopped");
        *streaming = false;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::PlatformRole;
    use crate::enforcer::{FailureKind, MemoryAuditSink};
    use crate::tools::{DataSensitivity, ToolDefinition, ToolHandler};
    use crate::types::UserId;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Handler that sleeps for the duration given in its args, then echoes
    /// its index. Used to randomize completion order.
    struct SleepyHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ToolHandler for SleepyHandler {
        async fn run(&self, args: Value, _actor: &Actor) -> crate::types::Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = args.get("delay_ms").and_then(Value::as_u64).unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(json!({"index": args.get("index").cloned().unwrap_or(Value::Null)}))
        }
    }

    fn engine_with_sleepy(calls: Arc<AtomicUsize>) -> ExecutionEngine {
        use crate::tools::{ParamDef, ParamType};

        let optional_int = |name: &str| ParamDef {
            name: name.to_string(),
            param_type: ParamType::Optional(Box::new(ParamType::Int)),
            description: String::new(),
            default: None,
        };

        let mut catalog = ToolCatalog::new();
        catalog
            .register(ToolDefinition {
                name: "probe".to_string(),
                description: "latency probe".to_string(),
                params: vec![optional_int("index"), optional_int("delay_ms")],
                allowed_levels: vec![AccessLevel::GlobalAdmin],
                requires_region_scope: false,
                requires_tenant_scope: false,
                sensitivity: DataSensitivity::Low,
                handler: Arc::new(SleepyHandler { calls }),
            })
            .unwrap();
        ExecutionEngine::new(
            Arc::new(catalog),
            Arc::new(MemoryAuditSink::new()),
            EngineConfig::default(),
        )
    }

    fn global_admin() -> Actor {
        Actor::PlatformUser {
            user_id: UserId::from_string("u-g".into()).unwrap(),
            email: "root@platform.example".into(),
            role: PlatformRole::GlobalAdmin,
            licensee_id: None,
            assigned_region_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_batch_preserves_request_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_sleepy(Arc::clone(&calls));
        let actor = global_admin();

        // Later requests finish first.
        let requests: Vec<ToolCallRequest> = (0u64..5)
            .map(|i| ToolCallRequest {
                tool_name: "probe".to_string(),
                args: json!({"index": i, "delay_ms": (5 - i) * 20}),
            })
            .collect();

        let batch = engine.execute_batch(&actor, requests).await.unwrap();
        assert!(batch.success);
        assert_eq!(batch.results.len(), 5);
        for (i, outcome) in batch.results.iter().enumerate() {
            assert_eq!(
                outcome.data.as_ref().unwrap()["index"],
                json!(i as u64),
                "result {} out of order",
                i
            );
        }
    }

    #[tokio::test]
    async fn test_batch_over_cap_rejected_before_execution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_sleepy(Arc::clone(&calls));
        let actor = global_admin();

        let requests: Vec<ToolCallRequest> = (0..9)
            .map(|_| ToolCallRequest {
                tool_name: "probe".to_string(),
                args: json!({}),
            })
            .collect();

        let result = engine.execute_batch(&actor, requests).await;
        assert!(matches!(result, Err(Error::BatchLimitExceeded(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_batch_partial_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_sleepy(Arc::clone(&calls));
        let actor = global_admin();

        let requests = vec![
            ToolCallRequest {
                tool_name: "probe".to_string(),
                args: json!({}),
            },
            ToolCallRequest {
                tool_name: "no_such_tool".to_string(),
                args: json!({}),
            },
        ];

        let batch = engine.execute_batch(&actor, requests).await.unwrap();
        assert!(batch.success);
        assert!(batch.results[0].success);
        assert!(!batch.results[1].success);
        assert_eq!(
            batch.results[1].error.as_ref().unwrap().kind,
            FailureKind::UnknownTool
        );
    }

    #[tokio::test]
    async fn test_invalid_actor_aborts_batch() {
        let engine = engine_with_sleepy(Arc::new(AtomicUsize::new(0)));
        let actor = Actor::PlatformUser {
            user_id: UserId::from_string("u-x".into()).unwrap(),
            email: "licensee@platform.example".into(),
            role: PlatformRole::RegionalLicensee,
            licensee_id: None,
            assigned_region_ids: vec![],
        };
        let result = engine.execute_batch(&actor, vec![]).await;
        assert!(matches!(result, Err(Error::InvalidActor(_))));
    }

    #[tokio::test]
    async fn test_turn_runs_tools_then_answers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_sleepy(Arc::clone(&calls));
        let actor = global_admin();

        let provider = ScriptedProvider::new(vec![
            ModelReply::ToolCalls {
                text: Some("Checking...".to_string()),
                calls: vec![ToolCallRequest {
                    tool_name: "probe".to_string(),
                    args: json!({"index": 0}),
                }],
                parallel: false,
            },
            ModelReply::Final {
                text: "All done.".to_string(),
            },
        ]);

        let (tx, mut rx) = engine.event_channel();
        let result = engine
            .run_turn(&actor, "run the probe", &provider, tx)
            .await
            .unwrap();

        assert_eq!(result.stop_reason, TurnStopReason::Completed);
        assert_eq!(result.answer, "All done.");
        assert_eq!(result.rounds, 2);
        assert_eq!(result.tool_calls, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut saw_tool_finished = false;
        let mut saw_completed = false;
        while let Some(event) = rx.recv().await {
            match event {
                TurnEvent::ToolFinished { success, .. } => {
                    saw_tool_finished = true;
                    assert!(success);
                }
                TurnEvent::Completed { stop_reason } => {
                    saw_completed = true;
                    assert_eq!(stop_reason, TurnStopReason::Completed);
                }
                _ => {}
            }
        }
        assert!(saw_tool_finished);
        assert!(saw_completed);
    }

    #[tokio::test]
    async fn test_turn_round_limit_returns_partial_answer() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_sleepy(Arc::clone(&calls));
        let actor = global_admin();

        // A provider that never stops asking for tools.
        let replies: Vec<ModelReply> = (0..20)
            .map(|i| ModelReply::ToolCalls {
                text: Some(format!("working ({})", i)),
                calls: vec![ToolCallRequest {
                    tool_name: "probe".to_string(),
                    args: json!({}),
                }],
                parallel: false,
            })
            .collect();
        let provider = ScriptedProvider::new(replies);

        let (tx, mut rx) = engine.event_channel();
        let drain = tokio::spawn(async move { while rx.recv().await.is_some() {} });

        let result = engine
            .run_turn(&actor, "loop forever", &provider, tx)
            .await
            .unwrap();
        drain.await.unwrap();

        assert_eq!(result.stop_reason, TurnStopReason::RoundLimit);
        assert_eq!(result.rounds, 10);
        assert_eq!(result.answer, "working (9)");
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn test_turn_survives_dropped_receiver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with_sleepy(Arc::clone(&calls));
        let actor = global_admin();

        let provider = ScriptedProvider::new(vec![
            ModelReply::ToolCalls {
                text: None,
                calls: vec![ToolCallRequest {
                    tool_name: "probe".to_string(),
                    args: json!({}),
                }],
                parallel: false,
            },
            ModelReply::Final {
                text: "finished without listeners".to_string(),
            },
        ]);

        let (tx, rx) = engine.event_channel();
        drop(rx); // client went away mid-stream

        let result = engine
            .run_turn(&actor, "keep going", &provider, tx)
            .await
            .unwrap();

        // In-flight tool work completed even though nobody was listening.
        assert_eq!(result.stop_reason, TurnStopReason::Completed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_turn_model_error_returns_partial() {
        struct FailingProvider;

        #[async_trait]
        impl ModelProvider for FailingProvider {
            async fn next_reply(
                &self,
                _conversation: &[ChatMessage],
                _tool_prompt: &str,
            ) -> crate::types::Result<ModelReply> {
                Err(Error::internal("provider unreachable"))
            }
        }

        let engine = engine_with_sleepy(Arc::new(AtomicUsize::new(0)));
        let actor = global_admin();
        let (tx, _rx) = engine.event_channel();

        let result = engine
            .run_turn(&actor, "hello", &FailingProvider, tx)
            .await
            .unwrap();
        assert_eq!(result.stop_reason, TurnStopReason::ModelError);
        assert!(result.answer.is_empty());
    }
}
