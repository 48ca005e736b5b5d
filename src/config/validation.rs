use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_agent_config(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.connect_timeout_secs == 0 {
        return Err(validation_err(
            "server.connect_timeout_secs must be greater than 0",
        ));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    Ok(())
}

fn validate_agent_config(config: &AppConfig) -> Result<(), ConfigError> {
    let agent = &config.agent;
    let url = url::Url::parse(&agent.backend_url).map_err(|err| {
        validation_err(format!(
            "agent.backend_url '{}' is not a valid URL: {err}",
            agent.backend_url
        ))
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(validation_err(
            "agent.backend_url must start with http:// or https://",
        ));
    }
    if agent.default_model.trim().is_empty() {
        return Err(validation_err("agent.default_model cannot be empty"));
    }
    if agent.workflow_type.trim().is_empty() {
        return Err(validation_err("agent.workflow_type cannot be empty"));
    }
    if agent.idle_read_timeout_secs == 0 {
        return Err(validation_err(
            "agent.idle_read_timeout_secs must be greater than 0",
        ));
    }
    if let Some(key) = agent.api_key.as_deref() {
        if key.trim().is_empty() {
            return Err(validation_err("agent.api_key cannot be blank when set"));
        }
    }
    for model in &agent.models {
        if model.trim().is_empty() {
            return Err(validation_err("agent.models contains an empty entry"));
        }
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "Invalid log_level '{}'. Must be one of: {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invalid(config: &AppConfig, needle: &str) {
        match validate_config(config) {
            Err(ConfigError::Validation(msg)) => {
                assert!(msg.contains(needle), "unexpected message: {msg}");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_rejects_non_http_backend() {
        let mut config = AppConfig::default();
        config.agent.backend_url = "ftp://example.com/agent".into();
        assert_invalid(&config, "http://");

        config.agent.backend_url = "not a url".into();
        assert_invalid(&config, "not a valid URL");
    }

    #[test]
    fn test_rejects_zero_idle_timeout() {
        let mut config = AppConfig::default();
        config.agent.idle_read_timeout_secs = 0;
        assert_invalid(&config, "idle_read_timeout_secs");
    }

    #[test]
    fn test_rejects_blank_workflow_and_model() {
        let mut config = AppConfig::default();
        config.agent.workflow_type = " ".into();
        assert_invalid(&config, "workflow_type");

        let mut config = AppConfig::default();
        config.agent.default_model = String::new();
        assert_invalid(&config, "default_model");
    }

    #[test]
    fn test_log_level_is_case_insensitive() {
        let mut config = AppConfig::default();
        config.features.log_level = "warning".into();
        assert!(validate_config(&config).is_ok());

        config.features.log_level = "VERBOSE".into();
        assert_invalid(&config, "log_level");
    }

    #[test]
    fn test_rejects_zero_pool_size() {
        let mut config = AppConfig::default();
        config.server.http_pool_max_idle_per_host = 0;
        assert_invalid(&config, "http_pool_max_idle_per_host");
    }
}
