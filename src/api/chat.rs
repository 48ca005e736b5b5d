use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::error::RelayError;
use crate::protocol::mapping::{effective_model, translate_chat_request};
use crate::protocol::openai_chat::ChatCompletionRequest;
use crate::state::AppState;
use crate::stream::{ChunkEmitter, StreamSession};
use crate::util::unix_now_secs;

use super::common::sse_ok_response;

/// `POST /v1/chat/completions`: relay one agent run as a chunk stream.
///
/// Every failure before the upstream stream opens is reported as a plain
/// JSON error response; nothing is written as SSE in that case.
pub async fn handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    match handler_inner(state, body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(status = err.status().as_u16(), error = %err, "chat completion rejected");
            err.into_response()
        }
    }
}

async fn handler_inner(state: Arc<AppState>, body: Bytes) -> Result<Response, RelayError> {
    let request: ChatCompletionRequest = serde_json::from_slice(&body)
        .map_err(|err| RelayError::InvalidRequest(format!("Invalid JSON body: {err}")))?;

    let agent = &state.config.agent;
    let ids = state.next_session_ids();
    let model = effective_model(&request, agent).to_string();
    if !request.stream {
        tracing::debug!(
            session_id = %ids.completion_id,
            "non-streaming request, answering with a stream"
        );
    }

    let input = translate_chat_request(&request, agent, ids.run);
    tracing::debug!(
        session_id = %ids.completion_id,
        thread_id = %input.thread_id,
        run_id = %input.run_id,
        model = %model,
        messages = input.messages.len(),
        "opening agent run"
    );

    let upstream = state
        .transport
        .open_event_stream(state.backend_url(), agent.api_key.as_deref(), &input)
        .await?;

    let emitter = ChunkEmitter::new(ids.completion_id, model, unix_now_secs());
    let mut session = StreamSession::new(upstream, emitter, state.idle_read_timeout());
    session.start();
    Ok(sse_ok_response(Body::from_stream(session.into_body_stream())))
}
