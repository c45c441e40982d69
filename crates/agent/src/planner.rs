//! Plan compilation — the first model call of every run.
//!
//! The planning model is given one legal shortcut: invoking the
//! `direct_answer` sentinel with no other tool calls. Otherwise it must
//! return a document matching the plan schema and nothing else. Any other
//! tool call at this stage is a protocol violation and aborts the run.

use crate::model::ModelSettings;
use mindloop_core::error::Error;
use mindloop_core::message::Message;
use mindloop_core::plan::Plan;
use mindloop_core::tool::ToolRegistry;
use mindloop_tools::DIRECT_ANSWER;
use tracing::{debug, info};

/// Compiles a user request into a plan, or decides to answer directly.
pub struct PlanCompiler {
    settings: ModelSettings,
}

/// What the planning stage decided.
#[derive(Debug)]
pub enum PlanOutcome {
    /// The request needs no task decomposition; answer immediately and end
    /// the run without entering the step loop.
    DirectAnswer,
    /// A plan was compiled; the step loop begins.
    Compiled(Plan),
}

fn plan_instruction(user_input: &str, agent_description: &str) -> String {
    format!(
        "You are a task-planning assistant. Based on the information below, \
         produce a multi-step task plan for this conversation.\n\
         \n\
         - User input: {user_input}\n\
         - Agent description: {agent_description}\n\
         \n\
         Requirements:\n\
         - If the user's input contains no task that needs to be decomposed \
         and executed, answer directly in natural language by invoking the \
         `direct_answer` tool, and call no other tool.\n\
         - If the input does need to be decomposed into tasks, return \
         strictly the JSON format below and nothing else: no explanatory \
         text, only a valid JSON string.\n\
         \n\
         JSON format:\n\
         {{\n\
           \"steps\": [\n\
             {{\"id\": 1, \"target\": \"goal of the first step\", \"detail\": \"how to reach the goal, in detail\"}},\n\
             {{\"id\": 2, \"target\": \"goal of the second step\", \"detail\": \"how to reach the goal, in detail\"}}\n\
           ]\n\
         }}\n"
    )
}

impl PlanCompiler {
    pub fn new(settings: ModelSettings) -> Self {
        Self { settings }
    }

    /// Issue the single planning completion and interpret the outcome.
    pub async fn compile(
        &self,
        user_input: &str,
        agent_description: &str,
        memory: &[Message],
        tools: &ToolRegistry,
    ) -> Result<PlanOutcome, Error> {
        let mut messages = memory.to_vec();
        messages.push(Message::system(plan_instruction(user_input, agent_description)));

        let mut request = self.settings.request(messages);
        request.tools = tools.definitions();

        let response = self.settings.provider.complete(request).await?;

        if response.has_tool_calls() {
            if response
                .message
                .tool_calls
                .iter()
                .any(|tc| tc.name == DIRECT_ANSWER)
            {
                info!("Planner chose to answer directly");
                return Ok(PlanOutcome::DirectAnswer);
            }
            let names: Vec<&str> = response
                .message
                .tool_calls
                .iter()
                .map(|tc| tc.name.as_str())
                .collect();
            return Err(Error::ProtocolViolation(format!(
                "only '{DIRECT_ANSWER}' may be called while planning, got: {}",
                names.join(", ")
            )));
        }

        let plan = Plan::parse(&response.message.content)
            .map_err(|e| Error::PlanParse(e.to_string()))?;
        debug!(steps = plan.len(), "Plan parsed");
        Ok(PlanOutcome::Compiled(plan))
    }
}
