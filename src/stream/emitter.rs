use bytes::Bytes;

use crate::error::RelayError;
use crate::protocol::openai_chat::{ChatCompletionChunk, ChunkChoice, ChunkDelta, CHUNK_OBJECT};

use super::sse::{done_frame, openai_sse_frame};

/// Serializes content deltas into downstream `chat.completion.chunk` frames.
///
/// `id`, `model` and `created` are fixed when the session starts so every
/// chunk of one response carries the same values.
#[derive(Debug, Clone)]
pub struct ChunkEmitter {
    id: String,
    model: String,
    created: u64,
}

impl ChunkEmitter {
    #[must_use]
    pub fn new(id: impl Into<String>, model: impl Into<String>, created: u64) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            created,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Encode one content delta as `data: <chunk JSON>\n\n`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Internal`] if the chunk cannot be serialized.
    pub fn content_frame(&self, content: &str) -> Result<Bytes, RelayError> {
        let chunk = ChatCompletionChunk {
            id: &self.id,
            object: CHUNK_OBJECT,
            created: self.created,
            model: &self.model,
            choices: [ChunkChoice {
                index: 0,
                delta: ChunkDelta { content },
                finish_reason: None,
            }],
        };
        let json = serde_json::to_string(&chunk)
            .map_err(|e| RelayError::Internal(format!("chunk serialization failed: {e}")))?;
        Ok(openai_sse_frame(&json))
    }

    /// The `data: [DONE]\n\n` terminator.
    #[must_use]
    pub fn done_frame(&self) -> Bytes {
        done_frame()
    }
}
