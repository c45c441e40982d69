//! File read tool — read a file inside the workspace root.

use crate::workspace::resolve_within;
use async_trait::async_trait;
use mindloop_core::error::ToolError;
use mindloop_core::tool::{Tool, ToolResult};
use std::path::PathBuf;

pub const NAME: &str = "file_read";

pub struct FileReadTool {
    root: PathBuf,
}

impl FileReadTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Read the contents of a file. The path is relative to the agent's workspace directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to read, relative to the workspace"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let resolved = match resolve_within(&self.root, path) {
            Ok(p) => p,
            Err(reason) => {
                return Ok(ToolResult {
                    call_id: String::new(),
                    success: false,
                    output: format!("Access denied: {reason}"),
                });
            }
        };

        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(ToolResult {
                call_id: String::new(),
                success: true,
                output: content,
            }),
            Err(e) => Ok(ToolResult {
                call_id: String::new(),
                success: false,
                output: format!("Failed to read file '{path}': {e}"),
            }),
        }
    }
}
