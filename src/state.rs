mod request_id;

use std::time::Duration;

use bytes::Bytes;
use serde_json::json;

use crate::config::AppConfig;
use crate::error::RelayError;
use crate::transport::HttpTransport;
use crate::util::unix_now_secs;

pub use request_id::SessionIds;
use request_id::RequestIdGenerator;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub transport: HttpTransport,
    backend_url: url::Url,
    models_response_body: Bytes,
    request_ids: RequestIdGenerator,
}

impl AppState {
    /// Build the shared state, parsing the backend URL once.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Config`] when `agent.backend_url` is not a valid URL.
    pub fn new(config: AppConfig, transport: HttpTransport) -> Result<Self, RelayError> {
        let backend_url = url::Url::parse(&config.agent.backend_url).map_err(|err| {
            RelayError::Config(format!(
                "invalid agent.backend_url '{}': {err}",
                config.agent.backend_url
            ))
        })?;
        let models_response_body = build_models_response_body(&config, unix_now_secs());
        Ok(Self {
            config,
            transport,
            backend_url,
            models_response_body,
            request_ids: RequestIdGenerator::new(),
        })
    }

    #[must_use]
    pub fn backend_url(&self) -> &url::Url {
        &self.backend_url
    }

    #[must_use]
    pub fn idle_read_timeout(&self) -> Duration {
        Duration::from_secs(self.config.agent.idle_read_timeout_secs)
    }

    /// Allocate the completion, thread and run ids for a new request.
    pub fn next_session_ids(&self) -> SessionIds {
        self.request_ids.session_ids(self.request_ids.next_seq())
    }

    #[must_use]
    pub fn models_response_body(&self) -> Bytes {
        self.models_response_body.clone()
    }
}

fn build_models_response_body(config: &AppConfig, created: u64) -> Bytes {
    let data: Vec<_> = config
        .agent
        .advertised_models()
        .into_iter()
        .map(|id| {
            json!({
                "id": id,
                "object": "model",
                "created": created,
                "owned_by": "agent",
            })
        })
        .collect();
    let body = json!({ "object": "list", "data": data });
    Bytes::from(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    fn transport() -> HttpTransport {
        HttpTransport::new(&ServerConfig::default()).unwrap()
    }

    #[test]
    fn test_models_body_lists_configured_models() {
        let mut config = AppConfig::default();
        config.agent.models = vec!["alpha".into(), "beta".into()];
        let state = AppState::new(config, transport()).unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(&state.models_response_body()).unwrap();
        assert_eq!(body["object"], "list");
        let ids: Vec<&str> = body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, ["alpha", "beta"]);
        assert_eq!(body["data"][0]["owned_by"], "agent");
    }

    #[test]
    fn test_models_body_defaults_to_default_model() {
        let state = AppState::new(AppConfig::default(), transport()).unwrap();
        let body: serde_json::Value =
            serde_json::from_slice(&state.models_response_body()).unwrap();
        assert_eq!(body["data"][0]["id"], "gpt-4o-mini");
        assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_invalid_backend_url_is_rejected() {
        let mut config = AppConfig::default();
        config.agent.backend_url = "::not a url".into();
        assert!(matches!(
            AppState::new(config, transport()),
            Err(RelayError::Config(_))
        ));
    }
}
