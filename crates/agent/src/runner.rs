//! Run triggering — the bridge between an external "new message" event and
//! one driven controller.
//!
//! Each event spawns a dedicated task that builds a fresh controller for
//! the session and drives it to a terminal state. Different sessions run
//! fully in parallel with no shared mutable state; within one run, stages
//! are strictly sequential. Failures are logged here and never retried —
//! recovery requires a fresh externally-triggered run.

use crate::controller::AgentLoopController;
use crate::model::ModelSettings;
use mindloop_config::RunConfig;
use mindloop_core::event::EventBus;
use mindloop_core::knowledge::KnowledgeBase;
use mindloop_core::message::SessionId;
use mindloop_core::store::MessageStore;
use mindloop_stream::StreamBroadcaster;
use mindloop_tools::ToolDeps;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

/// Configuration of one agent: identity, behavior, and capabilities.
///
/// Profiles are owned by the persistence collaborator; the runtime receives
/// them fully resolved (allowed tools and knowledge bases included).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub system_prompt: String,

    /// Optional tools this agent may use, by name. Fixed sentinel tools
    /// are always present regardless.
    #[serde(default)]
    pub allowed_tools: Vec<String>,

    /// Knowledge bases this agent may search.
    #[serde(default)]
    pub knowledge_bases: Vec<KnowledgeBase>,
}

/// The external trigger: a new user message for a session.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub session_id: SessionId,
    pub user_input: String,
}

/// Builds one controller per run from the shared collaborators.
///
/// ```no_run
/// use mindloop_agent::{AgentProfile, ChatEvent, ModelSettings, SessionFactory, spawn_run};
/// use mindloop_config::AppConfig;
/// use mindloop_core::event::EventBus;
/// use mindloop_core::message::SessionId;
/// use mindloop_providers::OpenAiCompatProvider;
/// use mindloop_stream::StreamBroadcaster;
/// use mindloop_tools::ToolDeps;
/// use std::sync::Arc;
///
/// # async fn wire(store: Arc<dyn mindloop_core::store::MessageStore>) -> Result<(), Box<dyn std::error::Error>> {
/// let config = AppConfig::load_from(std::path::Path::new("mindloop.toml"))?;
/// let provider = Arc::new(OpenAiCompatProvider::deepseek(config.api_key.clone().unwrap_or_default())?);
/// let settings = ModelSettings::new(provider, &config.default_model)
///     .with_temperature(config.default_temperature)
///     .with_max_tokens(config.default_max_tokens);
///
/// let factory = Arc::new(SessionFactory::new(
///     settings,
///     config.run.clone(),
///     ToolDeps {
///         database: None,
///         retriever: None,
///         workspace_root: std::env::current_dir()?,
///     },
///     Arc::new(StreamBroadcaster::new()),
///     store,
///     Arc::new(EventBus::default()),
/// ));
///
/// let profile = AgentProfile {
///     id: "agent-1".into(),
///     name: "Analyst".into(),
///     description: "Answers questions about the orders database".into(),
///     system_prompt: "You are a careful data analyst.".into(),
///     allowed_tools: vec!["database_query".into()],
///     knowledge_bases: vec![],
/// };
///
/// spawn_run(
///     factory,
///     profile,
///     ChatEvent {
///         session_id: SessionId::new(),
///         user_input: "How many orders came in last week?".into(),
///     },
/// );
/// # Ok(())
/// # }
/// ```
pub struct SessionFactory {
    settings: ModelSettings,
    run: RunConfig,
    tool_deps: ToolDeps,
    broadcaster: Arc<StreamBroadcaster>,
    store: Arc<dyn MessageStore>,
    events: Arc<EventBus>,
}

impl SessionFactory {
    pub fn new(
        settings: ModelSettings,
        run: RunConfig,
        tool_deps: ToolDeps,
        broadcaster: Arc<StreamBroadcaster>,
        store: Arc<dyn MessageStore>,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            settings,
            run,
            tool_deps,
            broadcaster,
            store,
            events,
        }
    }

    /// Assemble a controller for one run: fixed tools plus the profile's
    /// optional tools, a fresh session seeded with the system prompt.
    pub fn create(&self, profile: &AgentProfile, session_id: SessionId) -> AgentLoopController {
        let tools = Arc::new(mindloop_tools::build_registry(
            &profile.allowed_tools,
            &self.tool_deps,
        ));
        AgentLoopController::new(
            profile.clone(),
            session_id,
            self.settings.clone(),
            tools,
            self.broadcaster.clone(),
            self.store.clone(),
            self.events.clone(),
            &self.run,
        )
    }
}

/// Handle a chat event by driving one run on a dedicated task.
///
/// The spawning caller is decoupled from the run; errors are logged and not
/// retried.
pub fn spawn_run(
    factory: Arc<SessionFactory>,
    profile: AgentProfile,
    event: ChatEvent,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut controller = factory.create(&profile, event.session_id.clone());
        if let Err(e) = controller.run(&event.user_input).await {
            error!(
                session_id = %event.session_id,
                error = %e,
                "Agent run failed; a new run requires a fresh trigger"
            );
        }
    })
}
