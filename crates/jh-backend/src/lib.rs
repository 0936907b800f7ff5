//! jh-backend: LLM provider adapters for jhutils.
//!
//! This crate provides a unified, streaming interface to chat-completion APIs
//! plus a scripted mock used by the assistant's tests.

use std::pin::Pin;

use futures::{Stream, StreamExt};
use jh_protocol::{ChatRequest, StreamEvent};
use thiserror::Error;

pub mod mock;
pub mod openai;
pub mod sse;

pub use mock::{MockBackend, MockConfig, MockResponse};
pub use openai::OpenAiClient;

/// Boxed stream of events returned by every backend.
pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send + 'static>>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("API error: {0}")]
    Api(String),
}

/// A chat-completion provider.
pub trait ChatBackend: Send + Sync {
    /// Send a request and return a stream of events ending in `Done` or `Error`.
    fn send(&self, request: &ChatRequest) -> EventStream;
}

/// The complete text of a reply plus accumulated token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Drain a stream into a [`Reply`]. The first `Error` event aborts collection.
pub async fn collect_reply(mut stream: EventStream) -> Result<Reply, BackendError> {
    let mut reply = Reply::default();
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::TextDelta(t) => reply.text.push_str(&t),
            StreamEvent::Usage {
                input_tokens,
                output_tokens,
            } => {
                reply.input_tokens += input_tokens;
                reply.output_tokens += output_tokens;
            }
            StreamEvent::Error(e) => return Err(BackendError::Api(e)),
            StreamEvent::Done => break,
        }
    }
    Ok(reply)
}
