//! File write tool — create or overwrite a file inside the workspace root.

use crate::workspace::resolve_within;
use async_trait::async_trait;
use mindloop_core::error::ToolError;
use mindloop_core::tool::{Tool, ToolResult};
use std::path::PathBuf;
use tracing::info;

pub const NAME: &str = "file_write";

pub struct FileWriteTool {
    root: PathBuf,
}

impl FileWriteTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for FileWriteTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Write content to a file, creating it (and any parent directories) if needed \
         and overwriting it otherwise. Set append to true to add to the end instead. \
         The path is relative to the agent's workspace directory."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The file path to write, relative to the workspace"
                },
                "content": {
                    "type": "string",
                    "description": "The content to write"
                },
                "append": {
                    "type": "boolean",
                    "description": "Append to the file instead of overwriting (default false)",
                    "default": false
                }
            },
            "required": ["path", "content"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let path = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;
        let content = arguments["content"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' argument".into()))?;
        let append = arguments["append"].as_bool().unwrap_or(false);

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

        if let Some(parent) = resolved.parent()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            return Ok(ToolResult {
                call_id: String::new(),
                success: false,
                output: format!("Failed to create parent directories for '{path}': {e}"),
            });
        }

        let write_result = if append {
            match tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&resolved)
                .await
            {
                Ok(mut file) => tokio::io::AsyncWriteExt::write_all(&mut file, content.as_bytes())
                    .await,
                Err(e) => Err(e),
            }
        } else {
            tokio::fs::write(&resolved, content).await
        };

        match write_result {
            Ok(()) => {
                info!(path = %path, append, "Wrote file");
                Ok(ToolResult {
                    call_id: String::new(),
                    success: true,
                    output: format!("Successfully wrote file: {path}"),
                })
            }
            Err(e) => Ok(ToolResult {
                call_id: String::new(),
                success: false,
                output: format!("Failed to write file '{path}': {e}"),
            }),
        }
    }
}
