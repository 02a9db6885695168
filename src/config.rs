//! Application configuration: built once at start and passed to the simulators
//! and the server. Sources, lowest precedence first: built-in defaults, an
//! optional TOML file, environment variables.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_LLM_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_DATA_PATH: &str = "data/league.json";
pub const DEFAULT_FRONTEND_DIR: &str = "frontend";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub simulation: MatchRules,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Bearer credential. `None` makes every remote simulation fail fast.
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_LLM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.9,
            max_tokens: 2000,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// The key, ignoring blank values.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

/// Bounds requested from the text-generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MatchRules {
    pub min_events: u32,
    pub max_events: u32,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            min_events: 10,
            max_events: 15,
        }
    }
}

impl MatchRules {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_events == 0 {
            return Err(ConfigError::Rules("min_events must be at least 1".into()));
        }
        if self.min_events > self.max_events {
            return Err(ConfigError::Rules(format!(
                "min_events ({}) exceeds max_events ({})",
                self.min_events, self.max_events
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub frontend_dir: String,
    pub data_path: String,
    /// Allowed CORS origin; `None` allows any.
    pub frontend_url: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND.to_string(),
            frontend_dir: DEFAULT_FRONTEND_DIR.to_string(),
            data_path: DEFAULT_DATA_PATH.to_string(),
            frontend_url: None,
        }
    }
}

impl AppConfig {
    /// Load the optional TOML file, then apply process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let base = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => match std::env::var("CALCIO_CONFIG") {
                Ok(path) if !path.trim().is_empty() => Self::from_toml_file(Path::new(&path))?,
                _ => Self::default(),
            },
        };
        let config = base.with_overrides(|key| std::env::var(key).ok());
        config.simulation.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Toml {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Apply overrides from a key lookup (the process environment in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("OPENAI_API_URL") {
            self.llm.api_url = url;
        }
        if let Some(raw) = lookup("CALCIO_LLM_TEMPERATURE") {
            match raw.parse::<f32>() {
                Ok(value) => self.llm.temperature = value,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid CALCIO_LLM_TEMPERATURE"),
            }
        }
        if let Some(raw) = lookup("CALCIO_LLM_MAX_TOKENS") {
            match raw.parse::<u32>() {
                Ok(value) => self.llm.max_tokens = value,
                Err(_) => tracing::warn!(value = %raw, "ignoring invalid CALCIO_LLM_MAX_TOKENS"),
            }
        }
        if let Some(bind) = lookup("CALCIO_BIND") {
            self.server.bind_addr = bind;
        }
        if let Some(dir) = lookup("CALCIO_FRONTEND_DIR") {
            self.server.frontend_dir = dir;
        }
        if let Some(path) = lookup("CALCIO_DATA") {
            self.server.data_path = path;
        }
        if let Some(origin) = lookup("FRONTEND_URL") {
            self.server.frontend_url = Some(origin);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn built_in_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.llm.model, "gpt-4");
        assert_eq!(config.llm.max_tokens, 2000);
        assert!((config.llm.temperature - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.simulation, MatchRules { min_events: 10, max_events: 15 });
        assert!(config.llm.credential().is_none());
    }

    #[test]
    fn env_overrides_apply_and_bad_numbers_are_ignored() {
        let config = AppConfig::default().with_overrides(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_MODEL", "gpt-4o-mini"),
            ("CALCIO_LLM_MAX_TOKENS", "lots"),
            ("CALCIO_BIND", "0.0.0.0:8080"),
        ]));
        assert_eq!(config.llm.credential(), Some("sk-test"));
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert_eq!(config.llm.max_tokens, 2000);
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
    }

    #[test]
    fn blank_key_is_not_a_credential() {
        let config = AppConfig::default().with_overrides(lookup_from(&[("OPENAI_API_KEY", "  ")]));
        assert!(config.llm.credential().is_none());
    }

    #[test]
    fn toml_sections_are_partial() {
        let config = AppConfig::from_toml_str(
            r#"
            [llm]
            model = "local-model"
            temperature = 0.4

            [simulation]
            max_events = 20
            "#,
        )
        .unwrap();
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.llm.api_url, DEFAULT_LLM_URL);
        assert_eq!(config.simulation.min_events, 10);
        assert_eq!(config.simulation.max_events, 20);
        assert_eq!(config.server.bind_addr, DEFAULT_BIND);
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let rules = MatchRules { min_events: 12, max_events: 8 };
        assert!(rules.validate().is_err());
        assert!(MatchRules { min_events: 0, max_events: 8 }.validate().is_err());
        assert!(MatchRules::default().validate().is_ok());
    }
}
