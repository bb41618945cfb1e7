//! Startup configuration read from the environment
//!
//! Loaded once in `main` and then passed by value into the components that
//! need a fragment of it.

use std::{path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

use crate::llm::LlmProvider;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for `{key}`: `{value}`")]
    InvalidValue { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Where the service-account key comes from
#[derive(Debug, Clone)]
pub enum CredentialSource {
    Inline(SecretString),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CalendarConfig {
    pub calendar_id: String,
    pub credentials: Option<CredentialSource>,
    pub read_only: bool,
    pub timezone: Tz,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            credentials: None,
            read_only: false,
            timezone: Tz::UTC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub enabled: bool,
    pub gateway_url: Option<Url>,
    pub api_key: Option<SecretString>,
    pub provider: LlmProvider,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            gateway_url: None,
            api_key: None,
            provider: LlmProvider::default(),
            model: String::new(),
            timeout: Duration::from_secs(30),
            temperature: 0.7,
            max_tokens: 1024,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub request_timeout: Duration,
    /// Public URL advertised in the agent card
    pub agent_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout: Duration::from_secs(60),
            agent_url: "http://localhost:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub calendar: CalendarConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub demo_mode: bool,
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            calendar: CalendarConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
            demo_mode: false,
            log_level: "info".to_string(),
        }
    }
}

impl AgentConfig {
    /// Read and validate configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read and validate configuration through `lookup`
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(value) = read("GOOGLE_CALENDAR_ID") {
            config.calendar.calendar_id = value;
        }
        let inline = read("GOOGLE_CALENDAR_CREDENTIALS_JSON");
        let file = read("GOOGLE_APPLICATION_CREDENTIALS");
        config.calendar.credentials = match (inline, file) {
            (Some(_), Some(_)) => {
                return Err(ConfigError::Validation(
                    "set only one of GOOGLE_CALENDAR_CREDENTIALS_JSON and GOOGLE_APPLICATION_CREDENTIALS"
                        .to_string(),
                ))
            }
            (Some(json), None) => Some(CredentialSource::Inline(json.into())),
            (None, Some(path)) => Some(CredentialSource::File(PathBuf::from(path))),
            (None, None) => None,
        };
        if let Some(value) = read("CALENDAR_READ_ONLY") {
            config.calendar.read_only = parse_bool("CALENDAR_READ_ONLY", &value)?;
        }
        if let Some(value) = read("CALENDAR_TIMEZONE") {
            config.calendar.timezone = parse("CALENDAR_TIMEZONE", &value)?;
        }

        if let Some(value) = read("LLM_ENABLED") {
            config.llm.enabled = parse_bool("LLM_ENABLED", &value)?;
        }
        if let Some(value) = read("LLM_GATEWAY_URL") {
            config.llm.gateway_url = Some(parse("LLM_GATEWAY_URL", &value)?);
        }
        config.llm.api_key = read("LLM_API_KEY").map(SecretString::from);
        if let Some(value) = read("LLM_PROVIDER") {
            config.llm.provider = parse("LLM_PROVIDER", &value)?;
        }
        if let Some(value) = read("LLM_MODEL") {
            config.llm.model = value;
        }
        if let Some(value) = read("LLM_TIMEOUT_SECS") {
            config.llm.timeout = Duration::from_secs(parse("LLM_TIMEOUT_SECS", &value)?);
        }
        if let Some(value) = read("LLM_TEMPERATURE") {
            config.llm.temperature = parse("LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read("LLM_MAX_TOKENS") {
            config.llm.max_tokens = parse("LLM_MAX_TOKENS", &value)?;
        }

        if let Some(value) = read("DEMO_MODE") {
            config.demo_mode = parse_bool("DEMO_MODE", &value)?;
        }
        if let Some(value) = read("A2A_SERVER_PORT") {
            config.server.port = parse("A2A_SERVER_PORT", &value)?;
        }
        if let Some(value) = read("A2A_REQUEST_TIMEOUT_SECS") {
            config.server.request_timeout =
                Duration::from_secs(parse("A2A_REQUEST_TIMEOUT_SECS", &value)?);
        }
        config.server.agent_url = read("A2A_AGENT_URL")
            .unwrap_or_else(|| format!("http://localhost:{}", config.server.port));
        if let Some(value) = read("LOG_LEVEL") {
            config.log_level = value.to_lowercase();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.demo_mode && self.calendar.credentials.is_none() {
            return Err(ConfigError::Validation(
                "calendar credentials are required unless DEMO_MODE is set".to_string(),
            ));
        }
        if self.calendar.calendar_id.is_empty() {
            return Err(ConfigError::Validation("calendar id must not be empty".to_string()));
        }

        validate_llm(&self.llm)?;

        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server port must be greater than zero".to_string(),
            ));
        }
        if self.server.request_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "request timeout must be greater than zero".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(ConfigError::Validation(format!(
                "log level must be one of debug, info, warn, error (got `{other}`)"
            ))),
        }
    }
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm temperature must be in range 0..=2".to_string(),
        ));
    }
    if llm.max_tokens == 0 {
        return Err(ConfigError::Validation(
            "llm max tokens must be greater than zero".to_string(),
        ));
    }
    if llm.timeout.is_zero() {
        return Err(ConfigError::Validation(
            "llm timeout must be greater than zero".to_string(),
        ));
    }

    if llm.enabled {
        if llm.gateway_url.is_none() {
            return Err(ConfigError::Validation(
                "LLM_GATEWAY_URL is required when the llm is enabled".to_string(),
            ));
        }
        if llm.model.is_empty() {
            return Err(ConfigError::Validation(
                "LLM_MODEL is required when the llm is enabled".to_string(),
            ));
        }
    }
    Ok(())
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, path::Path};

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AgentConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AgentConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_demo_defaults() {
        let config = load(&[("DEMO_MODE", "true")]).unwrap();

        assert!(config.demo_mode);
        assert_eq!(config.calendar.calendar_id, "primary");
        assert_eq!(config.calendar.timezone, Tz::UTC);
        assert!(!config.calendar.read_only);
        assert!(!config.llm.enabled);
        assert_eq!(config.llm.provider, LlmProvider::OpenAi);
        assert_eq!(config.llm.timeout, Duration::from_secs(30));
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.request_timeout, Duration::from_secs(60));
        assert_eq!(config.server.agent_url, "http://localhost:8080");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_credentials_required_outside_demo() {
        let error = load(&[]).unwrap_err();
        assert!(matches!(error, ConfigError::Validation(_)));

        let config = load(&[("GOOGLE_APPLICATION_CREDENTIALS", "/etc/agent/sa.json")]).unwrap();
        assert!(matches!(
            config.calendar.credentials,
            Some(CredentialSource::File(ref path)) if path == Path::new("/etc/agent/sa.json")
        ));

        let error = load(&[
            ("GOOGLE_APPLICATION_CREDENTIALS", "/etc/agent/sa.json"),
            ("GOOGLE_CALENDAR_CREDENTIALS_JSON", "{}"),
        ])
        .unwrap_err();
        assert!(error.to_string().contains("only one"));
    }

    #[test]
    fn test_full_environment() {
        let config = load(&[
            ("GOOGLE_CALENDAR_CREDENTIALS_JSON", "{\"client_email\":\"x\"}"),
            ("GOOGLE_CALENDAR_ID", "team@example.com"),
            ("CALENDAR_READ_ONLY", "yes"),
            ("CALENDAR_TIMEZONE", "Europe/Berlin"),
            ("LLM_ENABLED", "true"),
            ("LLM_GATEWAY_URL", "https://gateway.example.com"),
            ("LLM_PROVIDER", "anthropic"),
            ("LLM_MODEL", "claude-test"),
            ("LLM_TIMEOUT_SECS", "10"),
            ("LLM_TEMPERATURE", "0.2"),
            ("A2A_SERVER_PORT", "9000"),
            ("LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();

        assert!(matches!(config.calendar.credentials, Some(CredentialSource::Inline(_))));
        assert!(config.calendar.read_only);
        assert_eq!(config.calendar.timezone, chrono_tz::Europe::Berlin);
        assert_eq!(config.llm.provider, LlmProvider::Anthropic);
        assert_eq!(config.llm.timeout, Duration::from_secs(10));
        assert_eq!(config.server.agent_url, "http://localhost:9000");
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_secrets_are_redacted() {
        let config = load(&[
            ("GOOGLE_CALENDAR_CREDENTIALS_JSON", "{\"private_key\":\"pk-secret\"}"),
            ("LLM_API_KEY", "sk-live-123"),
        ])
        .unwrap();

        let api_key = config.llm.api_key.as_ref().unwrap();
        assert_eq!(api_key.expose_secret(), "sk-live-123");
        let Some(CredentialSource::Inline(json)) = &config.calendar.credentials else {
            panic!("expected inline credentials");
        };
        assert!(json.expose_secret().contains("pk-secret"));

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-live-123"));
        assert!(!debug.contains("pk-secret"));
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("CALENDAR_TIMEZONE", "Mars/Olympus"),
            ("LLM_PROVIDER", "skynet"),
            ("LLM_GATEWAY_URL", "not a url"),
            ("A2A_SERVER_PORT", "eighty"),
            ("DEMO_MODE", "maybe"),
        ];
        for (key, value) in cases {
            let mut vars = vec![("DEMO_MODE", "true")];
            vars.retain(|(k, _)| *k != key);
            vars.push((key, value));
            match load(&vars) {
                Err(ConfigError::InvalidValue { key: k, .. }) => assert_eq!(k, key),
                other => panic!("Expected InvalidValue for {key}, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_llm_validation() {
        let error = load(&[("DEMO_MODE", "1"), ("LLM_TEMPERATURE", "2.5")]).unwrap_err();
        assert!(error.to_string().contains("temperature"));

        let error = load(&[("DEMO_MODE", "1"), ("LLM_MAX_TOKENS", "0")]).unwrap_err();
        assert!(error.to_string().contains("max tokens"));

        let error = load(&[("DEMO_MODE", "1"), ("LLM_ENABLED", "true")]).unwrap_err();
        assert!(error.to_string().contains("LLM_GATEWAY_URL"));

        let error = load(&[
            ("DEMO_MODE", "1"),
            ("LLM_ENABLED", "true"),
            ("LLM_GATEWAY_URL", "http://localhost:4000"),
        ])
        .unwrap_err();
        assert!(error.to_string().contains("LLM_MODEL"));
    }

    #[test]
    fn test_log_level_validation() {
        let error = load(&[("DEMO_MODE", "1"), ("LOG_LEVEL", "verbose")]).unwrap_err();
        assert!(matches!(error, ConfigError::Validation(_)));
    }
}
