use crate::protocol::error_shapes::openai_error_payload;

/// Error type shared by the relay pipeline and its HTTP surface.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Upstream error: status={status}, message={message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Upstream idle timeout: {0}")]
    Timeout(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad error category for status code and payload selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    Authentication,
    Permission,
    RateLimit,
    BadGateway,
    ServerError,
}

/// Map an upstream HTTP status code to an error category.
#[must_use]
pub fn category_from_upstream_status(status: u16) -> ErrorCategory {
    match status {
        400 | 404 | 422 => ErrorCategory::InvalidRequest,
        401 => ErrorCategory::Authentication,
        403 => ErrorCategory::Permission,
        429 => ErrorCategory::RateLimit,
        500 => ErrorCategory::ServerError,
        _ => ErrorCategory::BadGateway,
    }
}

impl RelayError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            RelayError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            RelayError::Transport(_) | RelayError::Timeout(_) => ErrorCategory::BadGateway,
            RelayError::Config(_) | RelayError::Internal(_) => ErrorCategory::ServerError,
            RelayError::Upstream { status, .. } => category_from_upstream_status(*status),
        }
    }

    /// HTTP status used when this error is reported before the stream opens.
    ///
    /// Upstream failures reuse the upstream status when it is a usable error
    /// status; anything else falls back to `502 Bad Gateway`.
    #[must_use]
    pub fn status(&self) -> http::StatusCode {
        match self {
            RelayError::InvalidRequest(_) => http::StatusCode::BAD_REQUEST,
            RelayError::Upstream { status, .. } => http::StatusCode::from_u16(*status)
                .ok()
                .filter(|code| code.is_client_error() || code.is_server_error())
                .unwrap_or(http::StatusCode::BAD_GATEWAY),
            RelayError::Transport(_) => http::StatusCode::BAD_GATEWAY,
            RelayError::Timeout(_) => http::StatusCode::GATEWAY_TIMEOUT,
            RelayError::Config(_) | RelayError::Internal(_) => {
                http::StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Format an error as `(status_code, OpenAI error JSON body)`.
#[must_use]
pub fn format_error(err: &RelayError) -> (http::StatusCode, serde_json::Value) {
    let status = err.status();
    let body = openai_error_payload(err.category(), &err.to_string());
    (status, body)
}

impl axum::response::IntoResponse for RelayError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}
