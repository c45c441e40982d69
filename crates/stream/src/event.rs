//! Stream event wire schema.
//!
//! Events exist only on the wire — they are produced by the loop, pushed
//! through the broadcaster, and framed by whatever transport the caller
//! attached. The `AI_*` kinds mark loop stages; `AI_GENERATED_CONTENT`
//! carries answer text, correlated to the durable message record the
//! persistence collaborator created for it.

use serde::{Deserialize, Serialize};

/// The kind tag of a stream event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamEventKind {
    /// Answer text chunk
    AiGeneratedContent,
    /// The run entered the planning stage
    AiPlanning,
    /// A decision round started
    AiThinking,
    /// A tool round started
    AiExecuting,
    /// The run finished
    AiDone,
    /// Subscribe-time handshake; sent once by `connect`, never by the loop
    Connected,
}

/// The event payload: text plus a completion flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamPayload {
    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub done: bool,
}

/// Event metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamMetadata {
    /// Id of the durable message record this event's content belongs to.
    #[serde(
        rename = "correlationId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub correlation_id: Option<String>,
}

/// A single event pushed to a session's subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    #[serde(rename = "type")]
    pub kind: StreamEventKind,

    pub payload: StreamPayload,

    #[serde(default)]
    pub metadata: StreamMetadata,
}

impl StreamEvent {
    /// An answer text chunk, correlated to a durable message record.
    pub fn content(text: impl Into<String>, correlation_id: impl Into<String>) -> Self {
        Self {
            kind: StreamEventKind::AiGeneratedContent,
            payload: StreamPayload {
                content: text.into(),
                done: false,
            },
            metadata: StreamMetadata {
                correlation_id: Some(correlation_id.into()),
            },
        }
    }

    /// A stage marker (`AI_PLANNING`, `AI_THINKING`, `AI_EXECUTING`).
    pub fn stage(kind: StreamEventKind) -> Self {
        Self {
            kind,
            payload: StreamPayload::default(),
            metadata: StreamMetadata::default(),
        }
    }

    /// The terminal event: `AI_DONE` with `done: true`.
    pub fn done() -> Self {
        Self {
            kind: StreamEventKind::AiDone,
            payload: StreamPayload {
                content: String::new(),
                done: true,
            },
            metadata: StreamMetadata::default(),
        }
    }

    /// The subscribe-time handshake.
    pub(crate) fn connected() -> Self {
        Self {
            kind: StreamEventKind::Connected,
            payload: StreamPayload {
                content: "connected".into(),
                done: false,
            },
            metadata: StreamMetadata::default(),
        }
    }
}
