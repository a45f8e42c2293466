//! Streaming primitives for the dialogue assistant.
//!
//! Contract:
//! - A session emits 0..n `Chunk` events followed by exactly one terminal
//!   event: `Complete` or `Failed`.
//! - After a terminal event, no further events are emitted.
//! - Each `Chunk` carries the full accumulated prefix decoded so far; the
//!   accumulated text is append-only within a session.
//!
//! Dropping the event stream cancels the session: the connection is released
//! and no further events can reach the caller.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use crate::error::{CoreResult, GenClientError};
use crate::http_client::ByteStream;
use crate::telemetry::SessionTrace;

/// What the caller receives incrementally from a streaming session.
#[non_exhaustive]
#[derive(Debug)]
pub enum StreamEvent {
    /// A decoded text fragment plus the full accumulated text so far.
    Chunk { delta: String, text: String },
    /// Normal end-of-body; carries the final accumulated text.
    Complete(String),
    /// Any failure (transport, status, unsupported streaming, mid-stream
    /// read), normalized to a human-readable message. Session ends here.
    Failed(String),
}

impl StreamEvent {
    /// Returns true if this event terminates the session.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Failed(_))
    }

    /// Convenience accessor for `Chunk` deltas.
    pub fn as_delta(&self) -> Option<&str> {
        match self {
            Self::Chunk { delta, .. } => Some(delta.as_str()),
            _ => None,
        }
    }
}

/// Boxed stream of session events.
pub type EventStream = futures::stream::BoxStream<'static, StreamEvent>;

/// Decodes a byte-segment stream into text fragments with a stateful UTF-8
/// decoder: a multi-byte character split across segment boundaries is held
/// back until its final byte arrives and decoded exactly once. Invalid
/// sequences become U+FFFD. Empty fragments are never yielded.
///
/// An incomplete trailing sequence at end-of-body is dropped, the same way
/// a text decoder that is never flushed behaves.
struct Utf8ChunkStream {
    inner: ByteStream,
    carry: Vec<u8>,
}

impl Utf8ChunkStream {
    fn new(inner: ByteStream) -> Self {
        Self {
            inner,
            carry: Vec::new(),
        }
    }

    /// Fold a byte segment into the carry buffer and decode everything that
    /// is complete. Returns the decoded fragment (possibly empty when the
    /// segment only extends an unfinished character).
    fn decode(&mut self, segment: &[u8]) -> String {
        self.carry.extend_from_slice(segment);
        let mut out = String::new();
        let mut buf = std::mem::take(&mut self.carry);
        let mut rest: &[u8] = &buf;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    rest = &[];
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    // valid prefix is UTF-8 by construction
                    out.push_str(std::str::from_utf8(&rest[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push('\u{FFFD}');
                            rest = &rest[valid + bad..];
                        }
                        None => {
                            // incomplete tail: hold the bytes for the next segment
                            rest = &rest[valid..];
                            break;
                        }
                    }
                }
            }
        }
        let tail_start = buf.len() - rest.len();
        buf.drain(..tail_start);
        self.carry = buf;
        out
    }
}

impl futures_util::stream::Stream for Utf8ChunkStream {
    type Item = CoreResult<String>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(segment))) => {
                    let fragment = self.decode(&segment);
                    if fragment.is_empty() {
                        // segment was empty or absorbed into the carry
                        continue;
                    }
                    return Poll::Ready(Some(Ok(fragment)));
                }
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => {
                    self.carry.clear();
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

enum SessionState {
    /// Failure known before any chunk was emitted (transport, status,
    /// missing stream capability).
    Failed(GenClientError),
    Streaming { chunks: Utf8ChunkStream, text: String },
    Done,
}

/// One live streaming call: owns the accumulated text and the decoder.
/// Sessions are single-owner; concurrent calls each get their own.
pub struct DialogueSession {
    state: SessionState,
    endpoint: &'static str,
    started: Instant,
    chunk_count: u32,
    byte_count: u64,
}

impl DialogueSession {
    /// Build a session over a response body. `None` means the transport
    /// cannot provide incremental byte access; the session then emits a
    /// single `Failed` event.
    pub fn new(endpoint: &'static str, body: Option<ByteStream>) -> Self {
        let state = match body {
            Some(bytes) => SessionState::Streaming {
                chunks: Utf8ChunkStream::new(bytes),
                text: String::new(),
            },
            None => SessionState::Failed(GenClientError::StreamingUnsupported),
        };
        Self {
            state,
            endpoint,
            started: Instant::now(),
            chunk_count: 0,
            byte_count: 0,
        }
    }

    /// Session that is already failed (request never got a usable response).
    pub fn failed(endpoint: &'static str, err: GenClientError) -> Self {
        Self {
            state: SessionState::Failed(err),
            endpoint,
            started: Instant::now(),
            chunk_count: 0,
            byte_count: 0,
        }
    }

    fn finish(&mut self, error_kind: Option<&'static str>) {
        self.state = SessionState::Done;
        crate::telemetry::emit_session(SessionTrace {
            endpoint: self.endpoint,
            chunks: self.chunk_count,
            bytes: self.byte_count,
            latency_ms: self.started.elapsed().as_millis() as u32,
            error_kind,
        });
    }
}

impl futures_util::stream::Stream for DialogueSession {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match &mut this.state {
            SessionState::Done => Poll::Ready(None),
            SessionState::Failed(_) => {
                let err = match std::mem::replace(&mut this.state, SessionState::Done) {
                    SessionState::Failed(e) => e,
                    _ => unreachable!(),
                };
                let kind = err.kind();
                let message = err.to_string();
                this.finish(Some(kind));
                Poll::Ready(Some(StreamEvent::Failed(message)))
            }
            SessionState::Streaming { chunks, text } => {
                match Pin::new(chunks).poll_next(cx) {
                    Poll::Ready(Some(Ok(fragment))) => {
                        text.push_str(&fragment);
                        let snapshot = text.clone();
                        this.chunk_count += 1;
                        this.byte_count += fragment.len() as u64;
                        Poll::Ready(Some(StreamEvent::Chunk {
                            delta: fragment,
                            text: snapshot,
                        }))
                    }
                    Poll::Ready(Some(Err(e))) => {
                        let kind = e.kind();
                        let message = e.to_string();
                        this.finish(Some(kind));
                        Poll::Ready(Some(StreamEvent::Failed(message)))
                    }
                    Poll::Ready(None) => {
                        let final_text = std::mem::take(text);
                        this.finish(None);
                        Poll::Ready(Some(StreamEvent::Complete(final_text)))
                    }
                    Poll::Pending => Poll::Pending,
                }
            }
        }
    }
}
