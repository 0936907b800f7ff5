//! jh-protocol: Shared chat types for jhutils.
//!
//! This crate defines the request and streaming types exchanged between the
//! assistant in `jh-core` and the LLM adapters in `jh-backend`.

pub mod chat;
pub mod message;

pub use chat::{ChatMessage, ChatRequest, ResponseFormat, Role};
pub use message::StreamEvent;
