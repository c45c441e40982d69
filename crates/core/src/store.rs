//! Persistence collaborator for durable assistant output.
//!
//! The runtime owns no storage. While an answer streams to the subscriber,
//! it is also logged through this trait: one `create_message` up front,
//! then `append_to_message` per chunk. CRUD of sessions and messages is the
//! collaborator's business entirely.

use crate::error::StoreError;
use crate::message::{Role, SessionId};
use async_trait::async_trait;

/// The message persistence collaborator.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Create a message record and return its id.
    async fn create_message(
        &self,
        session_id: &SessionId,
        role: Role,
        content: &str,
    ) -> std::result::Result<String, StoreError>;

    /// Append text to an existing message record.
    async fn append_to_message(
        &self,
        message_id: &str,
        text: &str,
    ) -> std::result::Result<(), StoreError>;
}
