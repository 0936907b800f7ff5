//! Streaming events emitted by chat backends.

/// Events emitted while a chat completion streams in.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of response text.
    TextDelta(String),

    /// Token usage information.
    Usage {
        input_tokens: u32,
        output_tokens: u32,
    },

    /// Stream has completed successfully.
    Done,

    /// An error occurred during streaming.
    Error(String),
}

impl StreamEvent {
    /// True for events after which no further events are expected.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done | StreamEvent::Error(_))
    }
}
