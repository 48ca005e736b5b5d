use serde::{Deserialize, Serialize};

/// `OpenAI` Chat Completion request wire type.
///
/// Only the fields the relay acts on are modelled; unknown fields are
/// accepted and ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

/// Message author role accepted on the chat completions ingress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

impl ChatRole {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::Tool => "tool",
        }
    }
}

/// `OpenAI` message wire type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<MessageContent>,
}

/// Message content: either a plain string or an array of content parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// One element of an array-form message content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub type_: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MessageContent {
    /// Flatten to plain text. Text parts are concatenated in order and
    /// non-text parts (images, audio) are dropped.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter(|part| part.type_ == "text")
                .filter_map(|part| part.text.as_deref())
                .collect(),
        }
    }
}

/// Streaming chunk written downstream for every content delta.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk<'a> {
    pub id: &'a str,
    pub object: &'a str,
    pub created: u64,
    pub model: &'a str,
    pub choices: [ChunkChoice<'a>; 1],
}

/// The single choice carried by a [`ChatCompletionChunk`].
#[derive(Debug, Clone, Serialize)]
pub struct ChunkChoice<'a> {
    pub index: u32,
    pub delta: ChunkDelta<'a>,
    pub finish_reason: Option<&'a str>,
}

/// Incremental content of a chunk.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkDelta<'a> {
    pub content: &'a str,
}

pub const CHUNK_OBJECT: &str = "chat.completion.chunk";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_minimal_request() {
        let req: ChatCompletionRequest = serde_json::from_str(
            r#"{"model":"gpt-4o-mini","messages":[{"role":"user","content":"Hi"}],"stream":true}"#,
        )
        .unwrap();
        assert_eq!(req.model.as_deref(), Some("gpt-4o-mini"));
        assert!(req.stream);
        assert_eq!(req.messages[0].role, ChatRole::User);
        assert_eq!(req.messages[0].content.as_ref().unwrap().to_text(), "Hi");
    }

    #[test]
    fn test_decode_null_content_and_missing_stream() {
        let req: ChatCompletionRequest = serde_json::from_str(
            r#"{"messages":[{"role":"assistant","content":null},{"role":"tool"}]}"#,
        )
        .unwrap();
        assert!(req.model.is_none());
        assert!(!req.stream);
        assert!(req.messages[0].content.is_none());
        assert!(req.messages[1].content.is_none());
    }

    #[test]
    fn test_decode_rejects_unknown_role() {
        let result: Result<ChatCompletionRequest, _> =
            serde_json::from_str(r#"{"messages":[{"role":"wizard","content":"x"}]}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_content_parts_flatten_text_only() {
        let content: MessageContent = serde_json::from_str(
            r#"[{"type":"text","text":"look at "},{"type":"image_url","image_url":{"url":"x"}},{"type":"text","text":"this"}]"#,
        )
        .unwrap();
        assert_eq!(content.to_text(), "look at this");
    }

    #[test]
    fn test_chunk_serializes_null_finish_reason() {
        let chunk = ChatCompletionChunk {
            id: "chatcmpl-1",
            object: CHUNK_OBJECT,
            created: 1_700_000_000,
            model: "gpt-4o-mini",
            choices: [ChunkChoice {
                index: 0,
                delta: ChunkDelta { content: "Hello" },
                finish_reason: None,
            }],
        };
        let value = serde_json::to_value(&chunk).unwrap();
        assert_eq!(value["object"], "chat.completion.chunk");
        assert_eq!(value["choices"][0]["delta"]["content"], "Hello");
        assert!(value["choices"][0]["finish_reason"].is_null());
        assert_eq!(value["choices"].as_array().map(Vec::len), Some(1));
    }
}
