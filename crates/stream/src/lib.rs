//! # mindloop Stream
//!
//! The push channel that exposes a running session's progress to its one
//! listener: the `StreamEvent` wire schema and the `StreamBroadcaster`
//! registry of live per-session subscriber channels.
//!
//! Delivery is not best-effort: sending to a session with no registered
//! subscriber is a hard failure, and events generated while disconnected
//! are lost — there is no replay.

mod broadcaster;
mod event;

pub use broadcaster::StreamBroadcaster;
pub use event::{StreamEvent, StreamEventKind, StreamMetadata, StreamPayload};
