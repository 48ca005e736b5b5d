pub mod classify;
pub mod emitter;
pub mod session;
pub mod sse;

pub use classify::{classify, Classified};
pub use emitter::ChunkEmitter;
pub use session::{SessionState, StreamSession, UpstreamByteStream};
pub use sse::{SseFrameReader, UpstreamFrame};
