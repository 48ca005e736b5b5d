//! AG-UI agent backend wire types.
//!
//! The backend accepts a `RunAgentInput` body and answers with an SSE stream
//! of typed events (`RUN_STARTED`, `TEXT_MESSAGE_CONTENT`, `RUN_FINISHED`, ...).

use serde::Serialize;

/// Run input posted to the agent backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRunInput {
    pub thread_id: String,
    pub run_id: String,
    pub messages: Vec<AgentMessage>,
    pub tools: Vec<serde_json::Value>,
    pub context: Vec<serde_json::Value>,
    pub state: AgentState,
    pub forwarded_props: serde_json::Map<String, serde_json::Value>,
}

/// One conversation message in backend form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentMessage {
    pub id: String,
    pub role: String,
    pub content: String,
}

/// Shared run state recognised by the backend workflows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentState {
    pub selected_model: String,
    pub workflow_type: String,
}

/// Event types that end a run from the relay's point of view.
///
/// Both the AG-UI enum spelling and the event class names are accepted since
/// backends differ in which one they put on the wire.
pub const TERMINAL_EVENT_TYPES: &[&str] = &[
    "RUN_FINISHED",
    "RunFinishedEvent",
    "TEXT_MESSAGE_END",
    "TextMessageEndEvent",
];

/// Literal payload some backends send instead of a terminal JSON event.
pub const DONE_SENTINEL: &str = "[DONE]";

#[must_use]
pub fn is_terminal_event_type(event_type: &str) -> bool {
    TERMINAL_EVENT_TYPES.contains(&event_type)
}
