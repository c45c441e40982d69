//! Error types for the mindloop domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all mindloop operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Session lifecycle ---
    #[error("invalid session state: expected Idle, session was {0}")]
    InvalidState(String),

    #[error("protocol violation during planning: {0}")]
    ProtocolViolation(String),

    #[error("plan parse failure: {0}")]
    PlanParse(String),

    #[error("tool dispatch failed: {0}")]
    Dispatch(String),

    // --- Provider errors ---
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Stream channel errors ---
    #[error("stream channel error: {0}")]
    Channel(#[from] ChannelError),

    // --- Persistence collaborator ---
    #[error("message store error: {0}")]
    Store(#[from] StoreError),

    // --- Knowledge retrieval collaborator ---
    #[error("knowledge retrieval error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Serialization ---
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("network error: {0}")]
    Network(String),
}

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("no subscriber registered for session {0}")]
    NotConnected(String),

    #[error("subscriber channel for session {0} is closed")]
    Closed(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("message not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("knowledge base not found: {0}")]
    NotFound(String),

    #[error("similarity search failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("tool execution failed: {tool_name} — {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),
}
