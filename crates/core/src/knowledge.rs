//! Knowledge retrieval collaborator.
//!
//! The embedding model and vector index behind similarity search live
//! outside this runtime; the loop only consumes them through this trait,
//! via the knowledge search tool.

use crate::error::KnowledgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Descriptor of a knowledge base an agent may search.
///
/// The descriptors (not the contents) are injected into the decision
/// instruction so the model knows what it can look up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    pub description: String,
}

impl KnowledgeBase {
    /// Render a descriptor list for prompt injection.
    pub fn render_list(kbs: &[KnowledgeBase]) -> String {
        if kbs.is_empty() {
            return "(none)".into();
        }
        kbs.iter()
            .map(|kb| format!("- {} (id: {}): {}", kb.name, kb.id, kb.description))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// The retrieval collaborator behind the knowledge search tool.
#[async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Return the most similar content snippets for a query, best first.
    async fn similarity_search(
        &self,
        knowledge_base_id: &str,
        query: &str,
    ) -> std::result::Result<Vec<String>, KnowledgeError>;
}
