//! Mock backend for testing.
//!
//! Produces the same `StreamEvent` sequences as the real adapter so the
//! assistant loop can be tested end to end without HTTP. Each `send` call
//! consumes the next scripted reply.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_stream::stream;
use futures::Stream;
use jh_protocol::{ChatRequest, StreamEvent};
use tokio::time::sleep;

use crate::{ChatBackend, EventStream};

/// Configurable mock responses for testing.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Emit a text delta.
    Text { content: String },
    /// Emit usage information.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },
    /// Emit an error.
    Error { message: String },
    /// Delay before next event (for timing tests).
    Delay { ms: u64 },
}

/// One scripted reply.
#[derive(Debug, Clone, Default)]
pub struct MockConfig {
    /// Sequence of responses to emit.
    pub responses: Vec<MockResponse>,
    /// Optional delay between each event (ms).
    pub chunk_delay_ms: Option<u64>,
}

impl MockConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(mut self, responses: Vec<MockResponse>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_chunk_delay(mut self, ms: u64) -> Self {
        self.chunk_delay_ms = Some(ms);
        self
    }
}

/// Create a stream of StreamEvents from mock config.
pub fn mock_stream(config: MockConfig) -> impl Stream<Item = StreamEvent> {
    stream! {
        for response in config.responses {
            if let Some(delay_ms) = config.chunk_delay_ms {
                sleep(Duration::from_millis(delay_ms)).await;
            }

            match response {
                MockResponse::Text { content } => {
                    yield StreamEvent::TextDelta(content);
                }
                MockResponse::Usage { input_tokens, output_tokens } => {
                    yield StreamEvent::Usage { input_tokens, output_tokens };
                }
                MockResponse::Error { message } => {
                    yield StreamEvent::Error(message);
                    return;
                }
                MockResponse::Delay { ms } => {
                    sleep(Duration::from_millis(ms)).await;
                }
            }
        }

        yield StreamEvent::Done;
    }
}

/// Backend that replays scripted replies in order and records every request.
#[derive(Debug, Default)]
pub struct MockBackend {
    replies: Mutex<VecDeque<MockConfig>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockBackend {
    pub fn new(replies: Vec<MockConfig>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue another reply.
    pub fn push(&self, reply: MockConfig) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of scripted replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or(0)
    }
}

impl ChatBackend for MockBackend {
    fn send(&self, request: &ChatRequest) -> EventStream {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let next = self.replies.lock().ok().and_then(|mut r| r.pop_front());
        match next {
            Some(config) => Box::pin(mock_stream(config)),
            None => Box::pin(mock_stream(MockConfig::new().with_responses(vec![
                MockResponse::Error {
                    message: "mock backend has no scripted reply".to_string(),
                },
            ]))),
        }
    }
}

/// Built-in test fixtures for common scenarios.
pub mod fixtures {
    use super::*;

    /// Stream a JSON document as text, split into small chunks.
    pub fn json_reply(value: &serde_json::Value) -> MockConfig {
        let text = value.to_string();
        text_reply(&text, 16)
    }

    /// Stream arbitrary text in chunks of `chunk_chars` characters.
    pub fn text_reply(text: &str, chunk_chars: usize) -> MockConfig {
        let chars: Vec<char> = text.chars().collect();
        let responses = chars
            .chunks(chunk_chars.max(1))
            .map(|c| MockResponse::Text {
                content: c.iter().collect(),
            })
            .collect();
        MockConfig::new().with_responses(responses)
    }

    /// Create a mock config that errors mid-stream.
    pub fn error_mid_stream(text_before: &str, error: &str) -> MockConfig {
        MockConfig::new().with_responses(vec![
            MockResponse::Text {
                content: text_before.to_string(),
            },
            MockResponse::Error {
                message: error.to_string(),
            },
        ])
    }
}
