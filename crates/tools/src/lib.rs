//! Built-in tool implementations for mindloop.
//!
//! Two kinds of tools exist:
//! - **Fixed** sentinel tools (`direct_answer`, `terminate`) that carry
//!   loop-control meaning and are present in every session.
//! - **Optional** tools (database query, filesystem access, knowledge
//!   search) registered only when an agent profile names them.

pub mod database_query;
pub mod file_list;
pub mod file_read;
pub mod file_write;
pub mod knowledge_search;
pub mod sentinel;

mod workspace;

use mindloop_core::knowledge::KnowledgeRetriever;
use mindloop_core::tool::ToolRegistry;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

pub use sentinel::{DIRECT_ANSWER, TERMINATE};

/// Backends the optional tools are built against.
pub struct ToolDeps {
    /// Postgres pool for the database query tool.
    pub database: Option<sqlx::PgPool>,

    /// Retrieval collaborator for the knowledge search tool.
    pub retriever: Option<Arc<dyn KnowledgeRetriever>>,

    /// Root directory the filesystem tools are confined to.
    pub workspace_root: PathBuf,
}

/// Create a registry holding only the fixed sentinel tools.
pub fn fixed_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(sentinel::DirectAnswerTool));
    registry.register(Box::new(sentinel::TerminateTool));
    registry
}

/// Create the registry for one session: every fixed tool, plus the optional
/// tools the agent profile names. Unknown names and tools whose backend is
/// not configured are skipped with a warning.
pub fn build_registry(allowed: &[String], deps: &ToolDeps) -> ToolRegistry {
    let mut registry = fixed_registry();

    for name in allowed {
        match name.as_str() {
            database_query::NAME => {
                if let Some(pool) = &deps.database {
                    registry.register(Box::new(database_query::DatabaseQueryTool::new(
                        pool.clone(),
                    )));
                } else {
                    warn!(tool = %name, "Skipping tool: no database configured");
                }
            }
            file_read::NAME => {
                registry.register(Box::new(file_read::FileReadTool::new(
                    deps.workspace_root.clone(),
                )));
            }
            file_write::NAME => {
                registry.register(Box::new(file_write::FileWriteTool::new(
                    deps.workspace_root.clone(),
                )));
            }
            file_list::NAME => {
                registry.register(Box::new(file_list::FileListTool::new(
                    deps.workspace_root.clone(),
                )));
            }
            knowledge_search::NAME => {
                if let Some(retriever) = &deps.retriever {
                    registry.register(Box::new(knowledge_search::KnowledgeSearchTool::new(
                        retriever.clone(),
                    )));
                } else {
                    warn!(tool = %name, "Skipping tool: no knowledge retriever configured");
                }
            }
            other => {
                warn!(tool = %other, "Skipping unknown tool in agent profile");
            }
        }
    }

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps() -> ToolDeps {
        ToolDeps {
            database: None,
            retriever: None,
            workspace_root: std::env::temp_dir(),
        }
    }

    #[test]
    fn fixed_registry_holds_both_sentinels() {
        let registry = fixed_registry();
        assert!(registry.resolve(DIRECT_ANSWER).is_some());
        assert!(registry.resolve(TERMINATE).is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn build_registry_adds_allowed_optional_tools() {
        let allowed = vec!["file_read".to_string(), "file_write".to_string()];
        let registry = build_registry(&allowed, &deps());
        assert!(registry.resolve("file_read").is_some());
        assert!(registry.resolve("file_write").is_some());
        assert!(registry.resolve("file_list").is_none());
        // Sentinels come along regardless
        assert!(registry.resolve(TERMINATE).is_some());
    }

    #[test]
    fn build_registry_skips_unconfigured_backends() {
        let allowed = vec!["database_query".to_string(), "knowledge_search".to_string()];
        let registry = build_registry(&allowed, &deps());
        assert!(registry.resolve("database_query").is_none());
        assert!(registry.resolve("knowledge_search").is_none());
    }

    #[test]
    fn build_registry_ignores_unknown_names() {
        let allowed = vec!["time_travel".to_string()];
        let registry = build_registry(&allowed, &deps());
        assert_eq!(registry.len(), 2); // sentinels only
    }
}
