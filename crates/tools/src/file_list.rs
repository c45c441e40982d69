//! File list tool — list a directory inside the workspace root.

use crate::workspace::resolve_within;
use async_trait::async_trait;
use mindloop_core::error::ToolError;
use mindloop_core::tool::{Tool, ToolResult};
use std::path::PathBuf;

pub const NAME: &str = "file_list";

pub struct FileListTool {
    root: PathBuf,
}

impl FileListTool {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

fn format_size(size: u64) -> String {
    if size < 1024 {
        format!("{size} B")
    } else if size < 1024 * 1024 {
        format!("{:.2} KB", size as f64 / 1024.0)
    } else {
        format!("{:.2} MB", size as f64 / (1024.0 * 1024.0))
    }
}

#[async_trait]
impl Tool for FileListTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "List the files and subdirectories of a directory. The path is relative to the \
         agent's workspace directory; omit it to list the workspace root."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "The directory to list, relative to the workspace (default: the workspace root)"
                }
            }
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let path = arguments["path"].as_str().unwrap_or("");

        let resolved = if path.trim().is_empty() {
            self.root.clone()
        } else {
            match resolve_within(&self.root, path) {
                Ok(p) => p,
                Err(reason) => {
                    return Ok(ToolResult {
                        call_id: String::new(),
                        success: false,
                        output: format!("Access denied: {reason}"),
                    });
                }
            }
        };

        let mut read_dir = match tokio::fs::read_dir(&resolved).await {
            Ok(rd) => rd,
            Err(e) => {
                return Ok(ToolResult {
                    call_id: String::new(),
                    success: false,
                    output: format!("Failed to list directory '{path}': {e}"),
                });
            }
        };

        let mut items = Vec::new();
        while let Ok(Some(entry)) = read_dir.next_entry().await {
            let name = entry.file_name().to_string_lossy().into_owned();
            match entry.metadata().await {
                Ok(meta) if meta.is_dir() => items.push(format!("[DIR]  {name}")),
                Ok(meta) => items.push(format!("[FILE] {name} ({})", format_size(meta.len()))),
                Err(_) => items.push(format!("[FILE] {name}")),
            }
        }
        items.sort();

        let output = if items.is_empty() {
            "Directory is empty.".to_string()
        } else {
            items.join("\n")
        };

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
        })
    }
}
