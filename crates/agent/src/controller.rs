//! The finite-state driver for one agent run.
//!
//! ```text
//! Idle --start--> Planning
//! Planning --direct-answer chosen--> Finished
//! Planning --plan parsed--> (loop begins)
//! loop, i = 1..max_steps, while state != Finished:
//!   Thinking --no calls--> (no-op) --> next i
//!   Thinking --calls proposed--> Executing
//!   Executing --terminate sentinel--> Finished
//!   Executing --otherwise--> next i
//! after loop (budget exhausted) --> Finished
//! any uncaught failure --> Error (terminal)
//! ```
//!
//! The loop always terminates in `Finished` or `Error`; errors propagate to
//! the spawning trigger and are never retried internally — a new run needs
//! a new external trigger.

use crate::dispatch::ToolDispatcher;
use crate::engine::DecisionEngine;
use crate::model::ModelSettings;
use crate::planner::{PlanCompiler, PlanOutcome};
use crate::runner::AgentProfile;
use crate::session::{AgentState, Session};
use chrono::Utc;
use mindloop_config::RunConfig;
use mindloop_core::error::Error;
use mindloop_core::event::{DomainEvent, EventBus};
use mindloop_core::message::{Message, Role, SessionId};
use mindloop_core::store::MessageStore;
use mindloop_core::tool::ToolRegistry;
use mindloop_stream::{StreamBroadcaster, StreamEvent, StreamEventKind};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Drives one session through plan compilation and the think/execute cycle.
pub struct AgentLoopController {
    session: Session,
    profile: AgentProfile,
    settings: ModelSettings,
    tools: Arc<ToolRegistry>,
    planner: PlanCompiler,
    engine: DecisionEngine,
    dispatcher: ToolDispatcher,
    broadcaster: Arc<StreamBroadcaster>,
    store: Arc<dyn MessageStore>,
    events: Arc<EventBus>,
    max_steps: u32,
}

impl AgentLoopController {
    pub fn new(
        profile: AgentProfile,
        session_id: SessionId,
        settings: ModelSettings,
        tools: Arc<ToolRegistry>,
        broadcaster: Arc<StreamBroadcaster>,
        store: Arc<dyn MessageStore>,
        events: Arc<EventBus>,
        run: &RunConfig,
    ) -> Self {
        let session = Session::new(session_id, &profile.system_prompt, run.max_messages);
        Self {
            planner: PlanCompiler::new(settings.clone()),
            engine: DecisionEngine::new(settings.clone()),
            dispatcher: ToolDispatcher::new(tools.clone(), events.clone()),
            session,
            profile,
            settings,
            tools,
            broadcaster,
            store,
            events,
            max_steps: run.max_steps,
        }
    }

    /// The session being driven.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Run the loop for one user input.
    ///
    /// Fails with `InvalidState` — leaving state untouched — when the
    /// session is not Idle, protecting against re-entrant or concurrent
    /// starts. Otherwise the run always ends in `Finished` or `Error`.
    pub async fn run(&mut self, user_input: &str) -> Result<(), Error> {
        if self.session.state() != AgentState::Idle {
            warn!(
                session_id = %self.session.id,
                state = %self.session.state(),
                "Rejected start on non-idle session"
            );
            return Err(Error::InvalidState(self.session.state().to_string()));
        }

        info!(session_id = %self.session.id, "Agent run started");
        self.events.publish(DomainEvent::RunStarted {
            session_id: self.session.id.clone(),
            timestamp: Utc::now(),
        });

        match self.drive(user_input).await {
            Ok(()) => {
                info!(
                    session_id = %self.session.id,
                    steps = self.session.step_count,
                    "Agent run finished"
                );
                self.publish_completed(false);
                Ok(())
            }
            Err(e) => {
                self.session.fail();
                error!(session_id = %self.session.id, error = %e, "Agent run failed");
                self.publish_completed(true);
                Err(e)
            }
        }
    }

    async fn drive(&mut self, user_input: &str) -> Result<(), Error> {
        self.enter(AgentState::Planning, StreamEventKind::AiPlanning)
            .await?;

        let outcome = self
            .planner
            .compile(
                user_input,
                &self.profile.description,
                &self.session.memory.snapshot(),
                &self.tools,
            )
            .await?;

        match outcome {
            PlanOutcome::DirectAnswer => {
                self.stream_direct_answer(user_input).await?;
                self.session.transition(AgentState::Finished)?;
            }
            PlanOutcome::Compiled(plan) => {
                info!(session_id = %self.session.id, steps = plan.len(), "Plan compiled");
                self.events.publish(DomainEvent::PlanCompiled {
                    session_id: self.session.id.clone(),
                    steps: plan.len(),
                    timestamp: Utc::now(),
                });
                self.session.plan = Some(plan.clone());
                // The plan instruction itself is never stored; only the
                // user's actual input enters memory.
                self.session.memory.append(Message::user(user_input));
                self.run_loop(&plan).await?;
            }
        }

        self.broadcaster
            .send(&self.session.id, StreamEvent::done())
            .await?;
        Ok(())
    }

    /// The think/execute cycle under the step budget.
    async fn run_loop(&mut self, plan: &mindloop_core::plan::Plan) -> Result<(), Error> {
        for step in 1..=self.max_steps {
            self.session.step_count = step;
            self.enter(AgentState::Thinking, StreamEventKind::AiThinking)
                .await?;
            debug!(session_id = %self.session.id, step, "Decision round");

            let decision = self
                .engine
                .think(
                    &self.session.memory.snapshot(),
                    plan,
                    &self.profile.knowledge_bases,
                    &self.tools,
                )
                .await?;

            if !decision.has_tool_calls {
                // No-op at the execution stage; the step is still consumed.
                debug!(session_id = %self.session.id, step, "No tool calls proposed");
                continue;
            }

            self.enter(AgentState::Executing, StreamEventKind::AiExecuting)
                .await?;
            let outcome = self
                .dispatcher
                .execute(&mut self.session.memory, &decision.message)
                .await?;

            if outcome.terminated {
                info!(session_id = %self.session.id, step, "Terminate sentinel executed");
                self.session.transition(AgentState::Finished)?;
                return Ok(());
            }
        }

        info!(
            session_id = %self.session.id,
            steps = self.session.step_count,
            "Step budget exhausted"
        );
        self.session.transition(AgentState::Finished)?;
        Ok(())
    }

    /// Stream the direct answer to the subscriber while durably logging it
    /// through the persistence collaborator.
    async fn stream_direct_answer(&mut self, user_input: &str) -> Result<(), Error> {
        let message_id = self
            .store
            .create_message(&self.session.id, Role::Assistant, "")
            .await?;

        let mut messages = self.session.memory.snapshot();
        messages.push(Message::user(user_input));

        let mut request = self.settings.request(messages);
        request.stream = true;

        let mut rx = self.settings.provider.stream(request).await?;
        debug!(session_id = %self.session.id, message_id = %message_id, "Streaming direct answer");

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(text) = chunk.content
                && !text.is_empty()
            {
                self.broadcaster
                    .send(
                        &self.session.id,
                        StreamEvent::content(text.clone(), message_id.clone()),
                    )
                    .await?;
                self.store.append_to_message(&message_id, &text).await?;
            }
        }

        Ok(())
    }

    /// Transition and announce the new stage on the stream.
    async fn enter(&mut self, state: AgentState, kind: StreamEventKind) -> Result<(), Error> {
        self.session.transition(state)?;
        self.events.publish(DomainEvent::StateChanged {
            session_id: self.session.id.clone(),
            state: state.to_string(),
            timestamp: Utc::now(),
        });
        self.broadcaster
            .send(&self.session.id, StreamEvent::stage(kind))
            .await?;
        Ok(())
    }

    fn publish_completed(&self, failed: bool) {
        self.events.publish(DomainEvent::RunCompleted {
            session_id: self.session.id.clone(),
            steps_used: self.session.step_count,
            failed,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use mindloop_core::provider::ProviderResponse;
    use mindloop_tools::{ToolDeps, build_registry};
    use tokio::sync::mpsc;

    const PLAN_JSON: &str =
        r#"{"steps": [{"id": 1, "target": "Write the file", "detail": "Create hello.txt"}]}"#;

    struct Harness {
        controller: AgentLoopController,
        broadcaster: Arc<StreamBroadcaster>,
        store: Arc<RecordingStore>,
        session_id: SessionId,
        _workspace: tempfile::TempDir,
    }

    fn harness(
        responses: Vec<ProviderResponse>,
        allowed_tools: &[&str],
        max_steps: u32,
        max_messages: usize,
    ) -> Harness {
        let workspace = tempfile::tempdir().unwrap();
        let deps = ToolDeps {
            database: None,
            retriever: None,
            workspace_root: workspace.path().to_path_buf(),
        };
        let allowed: Vec<String> = allowed_tools.iter().map(|s| s.to_string()).collect();
        let tools = Arc::new(build_registry(&allowed, &deps));

        let profile = AgentProfile {
            id: "agent-1".into(),
            name: "Test Agent".into(),
            description: "An agent used in tests".into(),
            system_prompt: "You are a test agent.".into(),
            allowed_tools: allowed,
            knowledge_bases: vec![],
        };

        let broadcaster = Arc::new(StreamBroadcaster::new());
        let store = Arc::new(RecordingStore::new());
        let session_id = SessionId::from("session-1");
        let settings = ModelSettings::new(
            Arc::new(SequentialMockProvider::new(responses)),
            "mock-model",
        );
        let run = RunConfig {
            max_steps,
            max_messages,
        };

        let controller = AgentLoopController::new(
            profile,
            session_id.clone(),
            settings,
            tools,
            broadcaster.clone(),
            store.clone(),
            Arc::new(EventBus::default()),
            &run,
        );

        Harness {
            controller,
            broadcaster,
            store,
            session_id,
            _workspace: workspace,
        }
    }

    fn drain(rx: &mut mpsc::Receiver<StreamEvent>) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn kinds(events: &[StreamEvent]) -> Vec<StreamEventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[tokio::test]
    async fn direct_answer_scenario() {
        // "写一个 hello world 文件" needs no decomposition in this script:
        // planning picks the sentinel, the answer streams, the run finishes
        // with zero tool executions and zero steps.
        let mut h = harness(
            vec![
                make_tool_call_response(
                    vec![make_tool_call("direct_answer", serde_json::json!({}))],
                    "",
                ),
                make_text_response("好的，这就是一个 hello world 文件的内容。"),
            ],
            &[],
            20,
            20,
        );
        let mut rx = h.broadcaster.connect(&h.session_id).await;

        h.controller.run("写一个 hello world 文件").await.unwrap();

        assert_eq!(h.controller.session().state(), AgentState::Finished);
        assert_eq!(h.controller.session().step_count, 0);

        let events = drain(&mut rx);
        let kinds = kinds(&events);
        assert_eq!(
            kinds,
            vec![
                StreamEventKind::Connected,
                StreamEventKind::AiPlanning,
                StreamEventKind::AiGeneratedContent,
                StreamEventKind::AiDone,
            ]
        );

        // Exactly one streamed answer, durably logged chunk by chunk
        let content: String = events
            .iter()
            .filter(|e| e.kind == StreamEventKind::AiGeneratedContent)
            .map(|e| e.payload.content.clone())
            .collect();
        assert_eq!(content, "好的，这就是一个 hello world 文件的内容。");

        let stored = h.store.messages();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role, Role::Assistant);
        assert_eq!(stored[0].content, content);

        // Content events correlate to the stored message
        let correlation = events
            .iter()
            .find(|e| e.kind == StreamEventKind::AiGeneratedContent)
            .and_then(|e| e.metadata.correlation_id.clone());
        assert_eq!(correlation.as_deref(), Some(stored[0].id.as_str()));
    }

    #[tokio::test]
    async fn start_on_non_idle_session_fails_and_leaves_state() {
        let mut h = harness(
            vec![
                make_tool_call_response(
                    vec![make_tool_call("direct_answer", serde_json::json!({}))],
                    "",
                ),
                make_text_response("done"),
            ],
            &[],
            20,
            20,
        );
        let _rx = h.broadcaster.connect(&h.session_id).await;

        h.controller.run("hi").await.unwrap();
        assert_eq!(h.controller.session().state(), AgentState::Finished);

        let err = h.controller.run("again").await.unwrap_err();
        assert!(matches!(err, Error::InvalidState(_)));
        assert_eq!(h.controller.session().state(), AgentState::Finished);
    }

    #[tokio::test]
    async fn planning_protocol_violation_ends_in_error() {
        let mut h = harness(
            vec![make_tool_call_response(
                vec![make_tool_call("file_write", serde_json::json!({"path": "x"}))],
                "",
            )],
            &["file_write"],
            20,
            20,
        );
        let mut rx = h.broadcaster.connect(&h.session_id).await;

        let err = h.controller.run("do something").await.unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
        assert_eq!(h.controller.session().state(), AgentState::Error);

        // No terminal AI_DONE event for a failed run
        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| e.kind == StreamEventKind::AiDone));
    }

    #[tokio::test]
    async fn malformed_plan_ends_in_error() {
        let mut h = harness(
            vec![make_text_response("Step one: think about it. Step two: do it.")],
            &[],
            20,
            20,
        );
        let _rx = h.broadcaster.connect(&h.session_id).await;

        let err = h.controller.run("do something").await.unwrap_err();
        assert!(matches!(err, Error::PlanParse(_)));
        assert_eq!(h.controller.session().state(), AgentState::Error);
    }

    #[tokio::test]
    async fn two_rounds_with_terminate_finishes_at_step_two() {
        let mut h = harness(
            vec![
                make_text_response(PLAN_JSON),
                make_tool_call_response(
                    vec![make_tool_call(
                        "file_write",
                        serde_json::json!({"path": "hello.txt", "content": "hello world"}),
                    )],
                    "Writing the file now",
                ),
                make_tool_call_response(
                    vec![make_tool_call("terminate", serde_json::json!({}))],
                    "All tasks are complete",
                ),
            ],
            &["file_write"],
            20,
            20,
        );
        let mut rx = h.broadcaster.connect(&h.session_id).await;
        let workspace = h._workspace.path().to_path_buf();

        h.controller.run("write a hello world file").await.unwrap();

        assert_eq!(h.controller.session().state(), AgentState::Finished);
        assert_eq!(h.controller.session().step_count, 2);

        // The tool actually ran
        assert_eq!(
            std::fs::read_to_string(workspace.join("hello.txt")).unwrap(),
            "hello world"
        );

        let events = drain(&mut rx);
        assert_eq!(
            kinds(&events),
            vec![
                StreamEventKind::Connected,
                StreamEventKind::AiPlanning,
                StreamEventKind::AiThinking,
                StreamEventKind::AiExecuting,
                StreamEventKind::AiThinking,
                StreamEventKind::AiExecuting,
                StreamEventKind::AiDone,
            ]
        );
        assert!(events.last().unwrap().payload.done);
    }

    #[tokio::test]
    async fn budget_exhaustion_with_noop_tool_calls() {
        // max_steps = 3, the model never terminates and keeps proposing a
        // harmless listing call: the run finishes via budget exhaustion.
        let think = || {
            make_tool_call_response(
                vec![make_tool_call("file_list", serde_json::json!({}))],
                "Let me look around again",
            )
        };
        let mut h = harness(
            vec![make_text_response(PLAN_JSON), think(), think(), think()],
            &["file_list"],
            3,
            20,
        );
        let mut rx = h.broadcaster.connect(&h.session_id).await;

        h.controller.run("look around").await.unwrap();

        assert_eq!(h.controller.session().state(), AgentState::Finished);
        assert_eq!(h.controller.session().step_count, 3);

        let events = drain(&mut rx);
        let executing = events
            .iter()
            .filter(|e| e.kind == StreamEventKind::AiExecuting)
            .count();
        assert_eq!(executing, 3);
        assert_eq!(events.last().unwrap().kind, StreamEventKind::AiDone);
    }

    #[tokio::test]
    async fn no_call_rounds_consume_the_budget() {
        let mut h = harness(
            vec![
                make_text_response(PLAN_JSON),
                make_text_response("Still thinking about step one."),
                make_text_response("Nothing actionable yet."),
            ],
            &[],
            2,
            20,
        );
        let mut rx = h.broadcaster.connect(&h.session_id).await;

        h.controller.run("ponder").await.unwrap();

        assert_eq!(h.controller.session().state(), AgentState::Finished);
        assert_eq!(h.controller.session().step_count, 2);

        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| e.kind == StreamEventKind::AiExecuting));
        let thinking = events
            .iter()
            .filter(|e| e.kind == StreamEventKind::AiThinking)
            .count();
        assert_eq!(thinking, 2);
    }

    #[tokio::test]
    async fn memory_stays_bounded_across_rounds() {
        let think = || {
            make_tool_call_response(
                vec![make_tool_call("file_list", serde_json::json!({}))],
                "Checking the directory",
            )
        };
        let mut h = harness(
            vec![make_text_response(PLAN_JSON), think(), think(), think(), think()],
            &["file_list"],
            4,
            6,
        );
        let _rx = h.broadcaster.connect(&h.session_id).await;

        h.controller.run("list things").await.unwrap();

        assert!(h.controller.session().memory.len() <= 6);
        assert_eq!(h.controller.session().state(), AgentState::Finished);
    }

    #[tokio::test]
    async fn run_without_subscriber_fails_hard() {
        let mut h = harness(vec![make_text_response(PLAN_JSON)], &[], 20, 20);
        // No connect: the first stage announcement has nowhere to go.
        let err = h.controller.run("hello").await.unwrap_err();
        assert!(matches!(err, Error::Channel(_)));
        assert_eq!(h.controller.session().state(), AgentState::Error);
    }

    #[tokio::test]
    async fn dispatch_failure_ends_in_error() {
        // The model proposes a tool that is not registered: fatal.
        let mut h = harness(
            vec![
                make_text_response(PLAN_JSON),
                make_tool_call_response(
                    vec![make_tool_call("ghost_tool", serde_json::json!({}))],
                    "Calling something that does not exist",
                ),
            ],
            &[],
            20,
            20,
        );
        let _rx = h.broadcaster.connect(&h.session_id).await;

        let err = h.controller.run("go").await.unwrap_err();
        assert!(matches!(err, Error::Dispatch(_)));
        assert_eq!(h.controller.session().state(), AgentState::Error);
    }
}
