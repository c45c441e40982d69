//! Sentinel tools — fixed tools whose invocation carries loop-control
//! meaning rather than doing external work.
//!
//! `direct_answer` is only legal during planning: it tells the loop the
//! request needs no task decomposition. `terminate` is the in-loop signal
//! that every planned task is done. Executing either is a no-op; the loop
//! reacts to the call itself.

use async_trait::async_trait;
use mindloop_core::error::ToolError;
use mindloop_core::tool::{Tool, ToolCategory, ToolResult};

/// Name of the direct-answer sentinel.
pub const DIRECT_ANSWER: &str = "direct_answer";

/// Name of the terminate sentinel.
pub const TERMINATE: &str = "terminate";

fn empty_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

pub struct DirectAnswerTool;

#[async_trait]
impl Tool for DirectAnswerTool {
    fn name(&self) -> &str {
        DIRECT_ANSWER
    }

    fn description(&self) -> &str {
        "Invoke this tool when the user's request does not need to be broken \
         down into tasks and can be answered directly."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Fixed
    }

    fn parameters_schema(&self) -> serde_json::Value {
        empty_schema()
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: String::new(),
        })
    }
}

pub struct TerminateTool;

#[async_trait]
impl Tool for TerminateTool {
    fn name(&self) -> &str {
        TERMINATE
    }

    fn description(&self) -> &str {
        "Invoke this tool when you believe every task has been completed and \
         the run should end."
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Fixed
    }

    fn parameters_schema(&self) -> serde_json::Value {
        empty_schema()
    }

    async fn execute(
        &self,
        _arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: String::new(),
        })
    }
}
