//! Knowledge search tool — similarity search through the retrieval
//! collaborator.
//!
//! The embedding model and vector index live behind the
//! `KnowledgeRetriever` trait; this tool only forwards the query and joins
//! the returned snippets.

use async_trait::async_trait;
use mindloop_core::error::ToolError;
use mindloop_core::knowledge::KnowledgeRetriever;
use mindloop_core::tool::{Tool, ToolResult};
use std::sync::Arc;
use tracing::debug;

pub const NAME: &str = "knowledge_search";

pub struct KnowledgeSearchTool {
    retriever: Arc<dyn KnowledgeRetriever>,
}

impl KnowledgeSearchTool {
    pub fn new(retriever: Arc<dyn KnowledgeRetriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for KnowledgeSearchTool {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Retrieve relevant content from a knowledge base. Pass the id of one of the \
         knowledge bases available to this agent and a search query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "knowledge_base_id": {
                    "type": "string",
                    "description": "The id of the knowledge base to search"
                },
                "query": {
                    "type": "string",
                    "description": "What to look for"
                }
            },
            "required": ["knowledge_base_id", "query"]
        })
    }

    async fn execute(
        &self,
        arguments: serde_json::Value,
    ) -> std::result::Result<ToolResult, ToolError> {
        let kb_id = arguments["knowledge_base_id"].as_str().ok_or_else(|| {
            ToolError::InvalidArguments("Missing 'knowledge_base_id' argument".into())
        })?;
        let query = arguments["query"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'query' argument".into()))?;

        let snippets = self
            .retriever
            .similarity_search(kb_id, query)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: NAME.into(),
                reason: e.to_string(),
            })?;

        debug!(kb_id = %kb_id, hits = snippets.len(), "Knowledge search completed");

        let output = if snippets.is_empty() {
            "No matching content found.".to_string()
        } else {
            snippets.join("\n")
        };

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output,
        })
    }
}
