pub mod validation;

use serde::{Deserialize, Serialize};

use self::validation::validate_config;

/// Backend used when neither the config file nor the environment names one.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000/agent";

/// Environment variable overriding `agent.backend_url`.
pub const BACKEND_URL_ENV: &str = "AGENT_BACKEND_URL";

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default)]
    pub base_path: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
    #[serde(default)]
    pub http_use_env_proxy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_worker_threads: Option<usize>,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_connect_timeout_secs() -> u64 {
    5
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            base_path: String::new(),
            connect_timeout_secs: default_connect_timeout_secs(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
            http_use_env_proxy: false,
            runtime_worker_threads: None,
        }
    }
}

/// Agent backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_workflow_type")]
    pub workflow_type: String,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default = "default_idle_read_timeout_secs")]
    pub idle_read_timeout_secs: u64,
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}
fn default_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_workflow_type() -> String {
    "chat".to_string()
}
fn default_idle_read_timeout_secs() -> u64 {
    300
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            api_key: None,
            default_model: default_model(),
            workflow_type: default_workflow_type(),
            models: Vec::new(),
            idle_read_timeout_secs: default_idle_read_timeout_secs(),
        }
    }
}

impl AgentConfig {
    /// Models advertised on `/v1/models`; the default model when none are listed.
    #[must_use]
    pub fn advertised_models(&self) -> Vec<&str> {
        if self.models.is_empty() {
            vec![self.default_model.as_str()]
        } else {
            self.models.iter().map(String::as_str).collect()
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from a YAML file, apply environment overrides and
/// validate it. A missing file yields the defaults.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading an existing file fails,
/// [`ConfigError::Yaml`] when parsing fails, or [`ConfigError::Validation`]
/// when semantic validation fails.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let mut config = match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(err) => return Err(err.into()),
    };
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config)?;
    Ok(config)
}

/// Parse YAML text into an [`AppConfig`] without validating it.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] on malformed YAML. An empty document
/// yields the defaults.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    Ok(serde_yaml::from_str(contents)?)
}

/// Apply `AGENT_BACKEND_URL`, `HOST`, `PORT` and `LOG_LEVEL` overrides.
///
/// `lookup` abstracts the environment so the override rules stay testable.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when `PORT` is not a valid port number.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(url) = non_empty(BACKEND_URL_ENV) {
        config.agent.backend_url = url.trim().to_string();
    }
    if let Some(host) = non_empty("HOST") {
        config.server.host = host;
    }
    if let Some(port) = non_empty("PORT") {
        config.server.port = port.trim().parse::<u16>().map_err(|_| {
            ConfigError::Validation(format!("PORT override '{port}' is not a valid port"))
        })?;
    }
    if let Some(level) = non_empty("LOG_LEVEL") {
        config.features.log_level = level;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        let contents = std::fs::read_to_string("config.example.yaml").unwrap();
        let config = parse_config(&contents);
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.agent.models, ["gpt-4o-mini", "gpt-4o"]);
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.agent.workflow_type, "chat");
        assert_eq!(config.agent.default_model, "gpt-4o-mini");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = load_config("does-not-exist.yaml").unwrap();
        assert!(!config.agent.backend_url.is_empty());
        assert_eq!(config.agent.workflow_type, "chat");
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let config = parse_config(
            "agent:\n  backend_url: http://agents.internal:9000/generic-agent\n  idle_read_timeout_secs: 30\n",
        )
        .unwrap();
        assert_eq!(
            config.agent.backend_url,
            "http://agents.internal:9000/generic-agent"
        );
        assert_eq!(config.agent.idle_read_timeout_secs, 30);
        assert_eq!(config.agent.workflow_type, "chat");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.features.log_level, "INFO");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(&mut config, |key| match key {
            BACKEND_URL_ENV => Some(" http://backend:8000/run ".to_string()),
            "PORT" => Some("8080".to_string()),
            "HOST" => Some(String::new()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.agent.backend_url, "http://backend:8000/run");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_invalid_port_override_is_rejected() {
        let mut config = AppConfig::default();
        let result = apply_env_overrides(&mut config, |key| {
            (key == "PORT").then(|| "not-a-port".to_string())
        });
        match result {
            Err(ConfigError::Validation(msg)) => assert!(msg.contains("not-a-port")),
            other => panic!("expected validation error, got {other:?}"),
        }
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_advertised_models_default_to_default_model() {
        let mut agent = AgentConfig::default();
        assert_eq!(agent.advertised_models(), vec!["gpt-4o-mini"]);
        agent.models = vec!["a".into(), "b".into()];
        assert_eq!(agent.advertised_models(), vec!["a", "b"]);
    }

    #[test]
    fn test_api_key_is_never_serialized() {
        let agent = AgentConfig {
            api_key: Some("secret".into()),
            ..AgentConfig::default()
        };
        let yaml = serde_yaml::to_string(&agent).unwrap();
        assert!(!yaml.contains("secret"));
    }
}
