use std::collections::VecDeque;
use std::pin::Pin;
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};

use crate::error::RelayError;
use crate::observability::{log_session_complete, SessionStats};

use super::classify::{classify, Classified};
use super::emitter::ChunkEmitter;
use super::sse::{SseFrameReader, UpstreamFrame};

/// Raw upstream body as produced by the transport.
pub type UpstreamByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

/// Lifecycle of one relayed response.
///
/// `Done` and `Error` are absorbing: once reached, no further frames are
/// produced and the upstream body has been released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Streaming,
    Done,
    Error,
}

impl SessionState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::Error)
    }
}

/// Pull-driven relay from an upstream AG-UI event stream to downstream
/// `chat.completion.chunk` frames.
///
/// Each call to [`StreamSession::next_frame`] reads upstream only as far as
/// needed to produce the next downstream frame, so downstream backpressure
/// propagates to the upstream connection. Dropping the session drops the
/// upstream body and with it the connection.
pub struct StreamSession {
    upstream: Option<UpstreamByteStream>,
    reader: SseFrameReader,
    pending: VecDeque<UpstreamFrame>,
    emitter: ChunkEmitter,
    state: SessionState,
    idle_timeout: Duration,
    upstream_eof: bool,
    stats: SessionStats,
    started: Instant,
}

impl StreamSession {
    #[must_use]
    pub fn new(upstream: UpstreamByteStream, emitter: ChunkEmitter, idle_timeout: Duration) -> Self {
        let reader = SseFrameReader::new(emitter.id());
        Self {
            upstream: Some(upstream),
            reader,
            pending: VecDeque::new(),
            emitter,
            state: SessionState::Init,
            idle_timeout,
            upstream_eof: false,
            stats: SessionStats::default(),
            started: Instant::now(),
        }
    }

    /// Mark the upstream connection as established. Called once the backend
    /// has answered with a streaming body; later calls are no-ops.
    pub fn start(&mut self) {
        if self.state == SessionState::Init {
            self.state = SessionState::Streaming;
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            parse_failures: self.reader.parse_failures(),
            ..self.stats
        }
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        self.emitter.id()
    }

    /// Produce the next downstream frame.
    ///
    /// Returns `None` once the session is terminal. An `Err` item means the
    /// stream failed after headers were sent; the caller must abort the body
    /// without writing `[DONE]`.
    pub async fn next_frame(&mut self) -> Option<Result<Bytes, RelayError>> {
        loop {
            if self.state.is_terminal() {
                return None;
            }

            while let Some(frame) = self.pending.pop_front() {
                match classify(&frame) {
                    Classified::ContentDelta(text) => {
                        return Some(match self.emitter.content_frame(&text) {
                            Ok(bytes) => {
                                self.stats.chunks += 1;
                                Ok(bytes)
                            }
                            Err(err) => Err(self.fail(err)),
                        });
                    }
                    Classified::Terminal => return Some(Ok(self.finish_done())),
                    Classified::Ignored => self.stats.ignored += 1,
                }
            }

            if self.upstream_eof {
                // Upstream closed without a terminal event.
                return Some(Ok(self.finish_done()));
            }

            let Some(upstream) = self.upstream.as_mut() else {
                return Some(Ok(self.finish_done()));
            };
            let next = tokio::time::timeout(self.idle_timeout, upstream.next()).await;
            match next {
                Ok(Some(Ok(chunk))) => {
                    self.reader.feed(&chunk, &mut self.pending);
                    if self.reader.pending_overflow() {
                        let err = RelayError::Transport(format!(
                            "upstream frame exceeds {} bytes without a boundary",
                            self.reader.buffered_len()
                        ));
                        return Some(Err(self.fail(err)));
                    }
                }
                Ok(Some(Err(err))) => return Some(Err(self.fail(err))),
                Ok(None) => {
                    self.reader.finish(&mut self.pending);
                    self.upstream = None;
                    self.upstream_eof = true;
                }
                Err(_) => {
                    let err = RelayError::Timeout(format!(
                        "no upstream data for {}s",
                        self.idle_timeout.as_secs_f64()
                    ));
                    return Some(Err(self.fail(err)));
                }
            }
        }
    }

    /// Adapt the session into a body stream, ending after `[DONE]` or the
    /// first error.
    pub fn into_body_stream(self) -> impl Stream<Item = Result<Bytes, RelayError>> + Send {
        futures_util::stream::unfold(self, |mut session| async move {
            let item = session.next_frame().await?;
            Some((item, session))
        })
    }

    fn finish_done(&mut self) -> Bytes {
        self.state = SessionState::Done;
        self.upstream = None;
        self.pending.clear();
        log_session_complete(
            self.emitter.id(),
            self.emitter.model(),
            self.stats(),
            self.started.elapsed(),
        );
        self.emitter.done_frame()
    }

    fn fail(&mut self, err: RelayError) -> RelayError {
        self.state = SessionState::Error;
        self.upstream = None;
        self.pending.clear();
        tracing::warn!(
            session_id = self.emitter.id(),
            model = self.emitter.model(),
            chunks = self.stats.chunks,
            error = %err,
            "stream aborted"
        );
        err
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        if !self.state.is_terminal() {
            tracing::info!(
                session_id = self.emitter.id(),
                chunks = self.stats.chunks,
                "client disconnected, releasing upstream"
            );
        }
    }
}
