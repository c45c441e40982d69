//! The execution stage — runs one round's proposed tool calls.
//!
//! Calls run sequentially in the order proposed, never concurrently: tool
//! side effects (writes against shared external resources) must not
//! interleave. A single call failing is converted to an error string in the
//! round's result; a registry miss or malformed arguments abort the run.
//!
//! After the round, memory is rebuilt wholesale: prior context + the
//! assistant's tool-call message + one aggregated tool-response message.
//! This caps context growth independent of raw append volume.

use chrono::Utc;
use mindloop_core::error::{Error, ToolError};
use mindloop_core::event::{DomainEvent, EventBus};
use mindloop_core::message::Message;
use mindloop_core::tool::{ToolCall, ToolRegistry};
use mindloop_memory::SessionMemory;
use mindloop_tools::TERMINATE;
use std::sync::Arc;
use tracing::{debug, warn};

/// Runs proposed tool calls and folds the results into memory.
pub struct ToolDispatcher {
    tools: Arc<ToolRegistry>,
    events: Arc<EventBus>,
}

/// What one execution round did.
#[derive(Debug)]
pub struct DispatchOutcome {
    /// How many tool calls were executed.
    pub executed: usize,

    /// Whether the `terminate` sentinel was among them — the only in-loop
    /// path to early, successful completion.
    pub terminated: bool,
}

impl ToolDispatcher {
    pub fn new(tools: Arc<ToolRegistry>, events: Arc<EventBus>) -> Self {
        Self { tools, events }
    }

    /// Execute the decision's tool calls and rebuild memory from the
    /// round's transcript. With zero calls this is a no-op.
    pub async fn execute(
        &self,
        memory: &mut SessionMemory,
        decision: &Message,
    ) -> Result<DispatchOutcome, Error> {
        if decision.tool_calls.is_empty() {
            return Ok(DispatchOutcome {
                executed: 0,
                terminated: false,
            });
        }

        let prior = memory.snapshot();
        let mut result_lines = Vec::with_capacity(decision.tool_calls.len());
        let mut terminated = false;

        for tc in &decision.tool_calls {
            let arguments: serde_json::Value = if tc.arguments.trim().is_empty() {
                serde_json::json!({})
            } else {
                serde_json::from_str(&tc.arguments).map_err(|e| {
                    Error::Dispatch(format!(
                        "arguments for '{}' are not valid JSON: {e}",
                        tc.name
                    ))
                })?
            };

            let call = ToolCall {
                id: tc.id.clone(),
                name: tc.name.clone(),
                arguments,
            };

            let start = std::time::Instant::now();
            let result = self.tools.execute(&call).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(tool_result) => {
                    debug!(tool = %tc.name, success = tool_result.success, "Tool executed");
                    self.events.publish(DomainEvent::ToolExecuted {
                        tool_name: tc.name.clone(),
                        success: tool_result.success,
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    result_lines.push(format!("Tool {} returned: {}", tc.name, tool_result.output));
                }
                Err(ToolError::NotFound(name)) => {
                    return Err(Error::Dispatch(format!("tool not found: {name}")));
                }
                Err(e) => {
                    // A single tool failing does not abort the run; the
                    // model sees the error text and can recover.
                    warn!(tool = %tc.name, error = %e, "Tool execution failed");
                    self.events.publish(DomainEvent::ToolExecuted {
                        tool_name: tc.name.clone(),
                        success: false,
                        duration_ms,
                        timestamp: Utc::now(),
                    });
                    result_lines.push(format!("Tool {} failed: {e}", tc.name));
                }
            }

            if tc.name == TERMINATE {
                terminated = true;
            }
        }

        let mut transcript = prior;
        transcript.push(decision.clone());
        transcript.push(Message::tool_result(None, result_lines.join("\n")));
        memory.replace(transcript);

        Ok(DispatchOutcome {
            executed: decision.tool_calls.len(),
            terminated,
        })
    }
}
