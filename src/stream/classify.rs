use serde_json::Value;

use crate::protocol::agui::is_terminal_event_type;

use super::sse::UpstreamFrame;

/// Semantic meaning of one upstream frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Non-empty text to forward downstream.
    ContentDelta(String),
    /// The run is over; no further upstream input is consumed.
    Terminal,
    /// Lifecycle, state or unknown events, and content events without text.
    Ignored,
}

/// Classify one frame produced by the SSE reader.
#[must_use]
pub fn classify(frame: &UpstreamFrame) -> Classified {
    match frame {
        UpstreamFrame::Done => Classified::Terminal,
        UpstreamFrame::Event(event) => classify_event(event),
    }
}

/// Classify a decoded upstream JSON event.
///
/// Terminal `type`s win over any text the event carries. Text is looked up
/// in `data.content`, then `data.text`, then the AG-UI top-level `delta`.
#[must_use]
pub fn classify_event(event: &Value) -> Classified {
    if event
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(is_terminal_event_type)
    {
        return Classified::Terminal;
    }

    match extract_text(event) {
        Some(text) if !text.is_empty() => Classified::ContentDelta(text.to_string()),
        _ => Classified::Ignored,
    }
}

fn extract_text(event: &Value) -> Option<&str> {
    let data = event.get("data");
    data.and_then(|d| d.get("content"))
        .and_then(Value::as_str)
        .or_else(|| data.and_then(|d| d.get("text")).and_then(Value::as_str))
        .or_else(|| event.get("delta").and_then(Value::as_str))
}
