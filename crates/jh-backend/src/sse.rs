//! Server-Sent Events (SSE) stream parser.
//!
//! Splits a byte stream into SSE events. Lines are buffered as raw bytes so
//! multi-byte UTF-8 sequences split across network chunks decode correctly.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

/// Data payload OpenAI-compatible servers send to mark the end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// A parsed SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// The event type (from `event:` field). None if not specified.
    pub event_type: Option<String>,
    /// The event data, with multiple `data:` lines joined by `\n`.
    pub data: String,
}

impl SseEvent {
    /// True if this event carries the `[DONE]` end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        self.data.trim() == DONE_SENTINEL
    }
}

#[derive(Default)]
struct EventBuilder {
    event_type: Option<String>,
    data: Vec<String>,
}

impl EventBuilder {
    /// Feed one line (without its terminator). Returns an event on a blank line.
    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.finish();
        }

        // Comment line
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => self.event_type = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            _ => {}
        }
        None
    }

    fn finish(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() {
            self.event_type = None;
            return None;
        }
        Some(SseEvent {
            event_type: self.event_type.take(),
            data: std::mem::take(&mut self.data).join("\n"),
        })
    }
}

/// Stream adapter yielding [`SseEvent`]s from a stream of byte chunks.
pub struct SseStream<S> {
    inner: S,
    buf: Vec<u8>,
    builder: EventBuilder,
    ready: VecDeque<SseEvent>,
    finished: bool,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buf: Vec::new(),
            builder: EventBuilder::default(),
            ready: VecDeque::new(),
            finished: false,
        }
    }

    fn consume(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buf.drain(..=pos).collect();
            let mut line = String::from_utf8_lossy(&raw[..raw.len() - 1]).into_owned();
            if line.ends_with('\r') {
                line.pop();
            }
            if let Some(event) = self.builder.line(&line) {
                self.ready.push_back(event);
            }
        }
    }

    fn flush(&mut self) {
        if !self.buf.is_empty() {
            let rest = std::mem::take(&mut self.buf);
            let line = String::from_utf8_lossy(&rest);
            if let Some(event) = self.builder.line(line.trim_end_matches('\r')) {
                self.ready.push_back(event);
            }
        }
        if let Some(event) = self.builder.finish() {
            self.ready.push_back(event);
        }
    }
}

impl<S, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    type Item = Result<SseEvent, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        loop {
            if let Some(event) = this.ready.pop_front() {
                return Poll::Ready(Some(Ok(event)));
            }
            if this.finished {
                return Poll::Ready(None);
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.consume(&bytes),
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    this.flush();
                    this.finished = true;
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

/// Create an SSE stream from a byte stream.
pub fn parse_sse_stream<S, E>(stream: S) -> SseStream<S>
where
    S: Stream<Item = Result<Bytes, E>> + Unpin,
{
    SseStream::new(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn bytes_stream(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        futures::stream::iter(chunks.into_iter().map(|c| Ok(Bytes::from(c))))
    }

    async fn collect(chunks: Vec<&str>) -> Vec<SseEvent> {
        collect_bytes(chunks.into_iter().map(|c| c.as_bytes().to_vec()).collect()).await
    }

    async fn collect_bytes(chunks: Vec<Vec<u8>>) -> Vec<SseEvent> {
        parse_sse_stream(bytes_stream(chunks))
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn parse_simple_event() {
        let events = collect(vec!["data: hello\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, None);
        assert_eq!(events[0].data, "hello");
    }

    #[tokio::test]
    async fn parse_event_with_type() {
        let events = collect(vec!["event: message\ndata: hello world\n\n"]).await;
        assert_eq!(events[0].event_type.as_deref(), Some("message"));
        assert_eq!(events[0].data, "hello world");
    }

    #[tokio::test]
    async fn parse_multi_line_data() {
        let events = collect(vec!["data: line1\ndata: line2\n\n"]).await;
        assert_eq!(events[0].data, "line1\nline2");
    }

    #[tokio::test]
    async fn parse_chunked_data() {
        let events = collect(vec!["data: hel", "lo wor", "ld\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello world");
    }

    #[tokio::test]
    async fn multibyte_split_across_chunks() {
        // "é" is 0xC3 0xA9
        let events = collect_bytes(vec![b"data: caf\xC3".to_vec(), b"\xA9\n\n".to_vec()]).await;
        assert_eq!(events[0].data, "café");
    }

    #[tokio::test]
    async fn parse_with_crlf() {
        let events = collect(vec!["data: hello\r\n\r\n"]).await;
        assert_eq!(events[0].data, "hello");
    }

    #[tokio::test]
    async fn ignore_comments_and_unknown_fields() {
        let events = collect(vec![": keep-alive\nid: 7\nretry: 10\ndata: x\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[tokio::test]
    async fn blank_lines_between_events() {
        let events = collect(vec!["data: first\n\n\n\ndata: second\n\n"]).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].data, "second");
    }

    #[tokio::test]
    async fn event_at_stream_end_without_trailing_newline() {
        let events = collect(vec!["data: final"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "final");
    }

    #[tokio::test]
    async fn done_sentinel() {
        let events = collect(vec!["data: {\"a\":1}\n\ndata: [DONE]\n\n"]).await;
        assert_eq!(events.len(), 2);
        assert!(!events[0].is_done());
        assert!(events[1].is_done());
    }
}
