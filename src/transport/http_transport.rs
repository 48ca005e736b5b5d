use std::time::Duration;

use futures_util::StreamExt;
use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::HeaderValue;

use crate::config::ServerConfig;
use crate::error::RelayError;
use crate::protocol::agui::AgentRunInput;
use crate::stream::UpstreamByteStream;

const EVENT_STREAM: &str = "text/event-stream";
const MAX_UPSTREAM_ERROR_LEN: usize = 500;

fn build_reqwest_client(
    pool_max_idle_per_host: usize,
    pool_idle_timeout: Option<Duration>,
    connect_timeout: Duration,
    use_env_proxy: bool,
) -> Result<reqwest::Client, RelayError> {
    // No total request timeout: runs stream for as long as the agent keeps
    // talking. Silence is bounded per read by the session's idle timeout.
    let mut builder = reqwest::Client::builder()
        .pool_max_idle_per_host(pool_max_idle_per_host)
        .pool_idle_timeout(pool_idle_timeout)
        .tcp_nodelay(true)
        .connect_timeout(connect_timeout)
        .redirect(reqwest::redirect::Policy::none());

    if !use_env_proxy {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|err| RelayError::Config(format!("Failed to build HTTP client: {err}")))
}

/// HTTP client used to open agent run streams.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with connection pooling and timeouts from the server config.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] when the HTTP client cannot be built.
    pub fn new(config: &ServerConfig) -> Result<Self, RelayError> {
        let pool_idle_timeout = if config.http_pool_idle_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(config.http_pool_idle_timeout_secs))
        };
        let client = build_reqwest_client(
            config.http_pool_max_idle_per_host.max(1),
            pool_idle_timeout,
            Duration::from_secs(config.connect_timeout_secs),
            config.http_use_env_proxy,
        )?;
        Ok(Self { client })
    }

    /// POST a run to the agent backend and return its event stream body.
    ///
    /// Succeeds only once the backend has answered with a 2xx status, so the
    /// caller can still report failures as a plain HTTP error.
    ///
    /// # Errors
    ///
    /// - [`RelayError::Transport`] when the connection or request fails.
    /// - [`RelayError::Upstream`] for a non-2xx status (carrying that status
    ///   and the sanitized body) or an empty 2xx body.
    pub async fn open_event_stream(
        &self,
        url: &url::Url,
        api_key: Option<&str>,
        input: &AgentRunInput,
    ) -> Result<UpstreamByteStream, RelayError> {
        let mut request = self
            .client
            .post(url.clone())
            .header(ACCEPT, HeaderValue::from_static(EVENT_STREAM))
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .json(input);
        if let Some(key) = api_key {
            request = request.header(AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request
            .send()
            .await
            .map_err(|err| RelayError::Transport(format!("agent backend unreachable: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let message = sanitize_upstream_error(&body);
            tracing::warn!(
                status = status.as_u16(),
                error = %message,
                "agent backend rejected run"
            );
            return Err(RelayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        if response.content_length() == Some(0) {
            return Err(RelayError::Upstream {
                status: http::StatusCode::BAD_GATEWAY.as_u16(),
                message: "agent backend returned an empty body".into(),
            });
        }

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let is_event_stream = content_type
                .to_str()
                .is_ok_and(|value| value.starts_with(EVENT_STREAM));
            if !is_event_stream {
                tracing::debug!(
                    content_type = ?content_type,
                    "agent backend answered without text/event-stream, reading as SSE anyway"
                );
            }
        }

        let stream = response.bytes_stream().map(|chunk| {
            chunk.map_err(|err| RelayError::Transport(format!("agent stream read failed: {err}")))
        });
        Ok(Box::pin(stream))
    }
}

/// Extract a readable message from an upstream error body, truncated to a
/// bounded length on a character boundary.
pub(crate) fn sanitize_upstream_error(body: &[u8]) -> String {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        let message = json
            .get("error")
            .and_then(|e| e.get("message").or(Some(e)))
            .and_then(serde_json::Value::as_str)
            .or_else(|| json.get("detail").and_then(serde_json::Value::as_str))
            .or_else(|| json.get("message").and_then(serde_json::Value::as_str));
        if let Some(message) = message {
            return truncate_message(message);
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        return "agent backend returned an error without a body".into();
    }
    truncate_message(text)
}

fn truncate_message(message: &str) -> String {
    if message.len() <= MAX_UPSTREAM_ERROR_LEN {
        return message.to_string();
    }
    let mut end = MAX_UPSTREAM_ERROR_LEN;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &message[..end])
}
