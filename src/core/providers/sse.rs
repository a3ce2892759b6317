//! SSE parsing shared by all streaming adapters
//!
//! One parser handles the wire format; providers only supply a transformer
//! that turns complete events into unified chunks. Byte boundaries from the
//! transport are arbitrary, so lines are buffered until a blank line closes
//! the event.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use futures::stream::BoxStream;

use crate::core::catalog::ProviderId;
use crate::core::types::ChatChunk;

use super::error::ProviderError;

/// One complete SSE event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SseEvent {
    /// Event name, from an `event:` field
    pub event: Option<String>,
    /// Accumulated `data:` payload
    pub data: String,
}

impl SseEvent {
    fn is_empty(&self) -> bool {
        self.event.is_none() && self.data.is_empty()
    }
}

/// Turns complete SSE events into unified chunks
///
/// `transform` takes `&mut self` because some providers spread one logical
/// chunk's fields across several events and the transformer must carry state
/// between them.
pub trait ChunkTransformer: Send {
    fn provider(&self) -> ProviderId;

    /// Whether this event terminates the stream
    fn is_end_marker(&self, event: &SseEvent) -> bool {
        event.data.trim() == "[DONE]"
    }

    fn transform(&mut self, event: &SseEvent) -> Result<Option<ChatChunk>, ProviderError>;
}

/// Incremental SSE parser
///
/// Feed it raw bytes; it yields complete events. Incomplete trailing lines
/// stay buffered until the next feed.
pub struct SseParser {
    buffer: String,
    current: SseEvent,
}

impl SseParser {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            current: SseEvent::default(),
        }
    }

    /// Consume raw bytes and return the events they complete
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };
        let complete = self.buffer[..=last_newline].to_string();
        self.buffer = self.buffer[last_newline + 1..].to_string();

        let mut events = Vec::new();
        for line in complete.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() {
                // Blank line closes the event.
                if !self.current.is_empty() {
                    events.push(std::mem::take(&mut self.current));
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.find(':') {
                Some(pos) => (&line[..pos], line[pos + 1..].trim_start()),
                None => (line, ""),
            };
            match field {
                "data" => {
                    if !self.current.data.is_empty() {
                        self.current.data.push('\n');
                    }
                    self.current.data.push_str(value);
                }
                "event" => self.current.event = Some(value.to_string()),
                _ => {}
            }
        }
        events
    }
}

impl Default for SseParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream adapter turning an upstream byte stream into unified chunks
///
/// Ends when the transformer's end marker is seen or the underlying stream
/// closes, whichever comes first.
pub struct SseStream<T: ChunkTransformer> {
    inner: BoxStream<'static, Result<Bytes, reqwest::Error>>,
    parser: SseParser,
    transformer: T,
    pending: VecDeque<SseEvent>,
    done: bool,
}

impl<T: ChunkTransformer> SseStream<T> {
    pub fn new(inner: BoxStream<'static, Result<Bytes, reqwest::Error>>, transformer: T) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            transformer,
            pending: VecDeque::new(),
            done: false,
        }
    }

    fn next_chunk(&mut self) -> Option<Result<ChatChunk, ProviderError>> {
        while let Some(event) = self.pending.pop_front() {
            if self.transformer.is_end_marker(&event) {
                self.done = true;
                self.pending.clear();
                return None;
            }
            match self.transformer.transform(&event) {
                Ok(Some(chunk)) => return Some(Ok(chunk)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl<T: ChunkTransformer + Unpin> Stream for SseStream<T> {
    type Item = Result<ChatChunk, ProviderError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.done {
                return Poll::Ready(None);
            }
            if let Some(item) = this.next_chunk() {
                return Poll::Ready(Some(item));
            }
            if this.done {
                return Poll::Ready(None);
            }
            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.parser.feed(&bytes));
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Some(Err(ProviderError::network(
                        this.transformer.provider(),
                        format!("stream error: {e}"),
                    ))));
                }
                Poll::Ready(None) => {
                    this.done = true;
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parser_accumulates_split_events() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"data: {\"id\": ").is_empty());
        assert!(parser.feed(b"\"x\"}").is_empty());
        let events = parser.feed(b"\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"id\": \"x\"}");
    }

    #[test]
    fn parser_tracks_event_names() {
        let mut parser = SseParser::new();
        let events =
            parser.feed(b"event: message_start\ndata: {\"type\":\"message_start\"}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event.as_deref(), Some("message_start"));
        assert_eq!(events[0].data, "{\"type\":\"message_start\"}");
    }

    #[test]
    fn parser_skips_comments_and_crlf() {
        let mut parser = SseParser::new();
        let events = parser.feed(b": keep-alive\r\ndata: one\r\n\r\ndata: two\r\n\r\n");
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "one");
        assert_eq!(events[1].data, "two");
    }

    #[test]
    fn parser_joins_multiline_data() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"data: first\ndata: second\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "first\nsecond");
    }

    #[test]
    fn default_end_marker_is_done() {
        struct Noop;
        impl ChunkTransformer for Noop {
            fn provider(&self) -> ProviderId {
                ProviderId::OpenAi
            }
            fn transform(&mut self, _: &SseEvent) -> Result<Option<ChatChunk>, ProviderError> {
                Ok(None)
            }
        }
        let t = Noop;
        assert!(t.is_end_marker(&SseEvent {
            event: None,
            data: "[DONE]".to_string(),
        }));
        assert!(!t.is_end_marker(&SseEvent {
            event: None,
            data: "{}".to_string(),
        }));
    }
}
