//! Incremental SSE frame reader and downstream frame encoding.
//!
//! Upstream bytes may arrive split at any offset, including inside a JSON
//! payload or a multi-byte UTF-8 sequence. The reader keeps one byte buffer,
//! cuts complete frames at blank lines and retains the trailing partial
//! segment for the next read. Frames are decoded as UTF-8 only once
//! complete.
use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use memchr::memchr_iter;
use smallvec::SmallVec;

use crate::protocol::agui::DONE_SENTINEL;

/// One logical upstream frame after `data:` extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamFrame {
    /// A JSON payload.
    Event(serde_json::Value),
    /// The literal `[DONE]` sentinel.
    Done,
}

/// Largest frame the reader holds while waiting for a blank line.
pub const MAX_PENDING_FRAME_BYTES: usize = 1 << 20;

/// Incremental SSE frame reader.
///
/// Feed it raw byte chunks in arrival order; every frame completed by a
/// chunk is appended to the caller's queue. The output is independent of how
/// the byte sequence was chunked.
pub struct SseFrameReader {
    buffer: BytesMut,
    scan_from: usize,
    max_pending: usize,
    parse_failures: u64,
    session_id: Arc<str>,
}

impl SseFrameReader {
    #[must_use]
    pub fn new(session_id: impl Into<Arc<str>>) -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
            scan_from: 0,
            max_pending: MAX_PENDING_FRAME_BYTES,
            parse_failures: 0,
            session_id: session_id.into(),
        }
    }

    #[must_use]
    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending;
        self
    }

    /// Append `chunk` and move every completed frame into `out`.
    pub fn feed(&mut self, chunk: &[u8], out: &mut VecDeque<UpstreamFrame>) {
        self.buffer.extend_from_slice(chunk);
        while let Some((frame_end, boundary_end)) =
            find_frame_boundary(&self.buffer, self.scan_from)
        {
            let raw = self.buffer.split_to(boundary_end);
            self.scan_from = 0;
            if let Some(frame) = self.parse_frame(&raw[..frame_end]) {
                out.push_back(frame);
            }
        }
        // A boundary needs at most three bytes after its first newline, so
        // only the tail can still become one.
        self.scan_from = self.buffer.len().saturating_sub(2);
    }

    /// Flush the unterminated tail at upstream EOF.
    pub fn finish(&mut self, out: &mut VecDeque<UpstreamFrame>) {
        if self.buffer.is_empty() {
            return;
        }
        let raw = self.buffer.split();
        self.scan_from = 0;
        if let Some(frame) = self.parse_frame(&raw) {
            out.push_back(frame);
        }
    }

    /// Frames skipped because their payload was not valid JSON or UTF-8.
    #[must_use]
    pub fn parse_failures(&self) -> u64 {
        self.parse_failures
    }

    /// Bytes held back waiting for a frame boundary.
    #[must_use]
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// True once the unterminated tail has outgrown the pending-frame limit.
    /// The caller must stop feeding and treat the upstream as broken.
    #[must_use]
    pub fn pending_overflow(&self) -> bool {
        self.buffer.len() > self.max_pending
    }

    fn parse_frame(&mut self, raw: &[u8]) -> Option<UpstreamFrame> {
        let Ok(text) = std::str::from_utf8(raw) else {
            self.record_parse_failure("frame is not valid UTF-8", raw.len());
            return None;
        };

        let payload = extract_data_payload(text)?;
        if payload == DONE_SENTINEL {
            return Some(UpstreamFrame::Done);
        }

        match serde_json::from_str::<serde_json::Value>(&payload) {
            Ok(value) => Some(UpstreamFrame::Event(value)),
            Err(err) => {
                self.record_parse_failure(&err.to_string(), payload.len());
                None
            }
        }
    }

    fn record_parse_failure(&mut self, reason: &str, len: usize) {
        self.parse_failures += 1;
        tracing::debug!(
            session_id = %self.session_id,
            reason,
            len,
            "skipping undecodable upstream frame"
        );
    }
}

impl Default for SseFrameReader {
    fn default() -> Self {
        Self::new("")
    }
}

/// Collect the `data:` lines of one frame.
///
/// Lines without the `data:` marker (`event:`, `id:`, comments) are dropped,
/// one space after the colon is stripped and multiple data lines are joined
/// with `\n`. Returns `None` when nothing but whitespace remains.
fn extract_data_payload(frame: &str) -> Option<Cow<'_, str>> {
    let lines: SmallVec<[&str; 4]> = frame
        .split('\n')
        .filter_map(|line| {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let value = line.strip_prefix("data:")?;
            Some(value.strip_prefix(' ').unwrap_or(value))
        })
        .collect();

    let payload = match lines.as_slice() {
        [] => return None,
        [single] => Cow::Borrowed(single.trim()),
        many => Cow::Owned(many.join("\n").trim().to_string()),
    };
    if payload.is_empty() {
        None
    } else {
        Some(payload)
    }
}

/// Locate the first blank line at or after `scan_from`.
///
/// Returns `(frame_end, boundary_end)`: the frame body is
/// `buffer[..frame_end]` and the consumed prefix is `buffer[..boundary_end]`.
/// `\n\n`, `\r\n\r\n` and the mixed forms all terminate a frame.
#[inline]
fn find_frame_boundary(buffer: &[u8], scan_from: usize) -> Option<(usize, usize)> {
    let scan_from = scan_from.min(buffer.len());
    for rel in memchr_iter(b'\n', &buffer[scan_from..]) {
        let newline = scan_from + rel;
        let rest = &buffer[newline + 1..];
        if rest.first() == Some(&b'\n') {
            return Some((newline, newline + 2));
        }
        if rest.starts_with(b"\r\n") {
            return Some((newline, newline + 3));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Encoding helpers
// ---------------------------------------------------------------------------

/// Terminal frame written exactly once per successful session.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Format an OpenAI-style SSE frame (no event type, just data).
#[must_use]
pub fn openai_sse_frame(json: &str) -> Bytes {
    let mut out = Vec::with_capacity(8 + json.len());
    out.extend_from_slice(b"data: ");
    out.extend_from_slice(json.as_bytes());
    out.extend_from_slice(b"\n\n");
    Bytes::from(out)
}

/// The `[DONE]` frame as bytes.
#[must_use]
pub fn done_frame() -> Bytes {
    Bytes::from_static(DONE_FRAME.as_bytes())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
