//! # mindloop Providers
//!
//! LLM backend adapters. The orchestration loop only knows the
//! [`mindloop_core::Provider`] trait; this crate supplies the
//! OpenAI-compatible HTTP implementation that covers DeepSeek, OpenAI,
//! vLLM, Ollama, and any other `/chat/completions` endpoint.

mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
