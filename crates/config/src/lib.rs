//! Configuration loading and validation for contextfuse.
//!
//! Every recognized option is enumerated here and passed explicitly into
//! the coordinator at construction — there are no module-level defaults and
//! no environment lookups inside the runtime. Credential/environment
//! resolution belongs to whatever bootstrap layer builds the `AppConfig`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to a `contextfuse.toml` file.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the synthesis backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Synthesis backend settings.
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Merge engine and fan-out settings.
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Statically-defined producers (summary + facts straight from config).
    #[serde(default)]
    pub producers: Vec<StaticProducerConfig>,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("synthesis", &self.synthesis)
            .field("fusion", &self.fusion)
            .field("producers", &self.producers)
            .finish()
    }
}

/// Settings for the single downstream synthesis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Backend name (e.g. "openai", "openrouter", "ollama").
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Base URL override. `None` lets the backend pick its default endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Model to synthesize with.
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for the synthesis call.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens the synthesis call may generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_backend() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.3
}
fn default_max_tokens() -> u32 {
    4096
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            base_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Settings for the merge engine and the producer fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Hard size budget for the fused context, in token-equivalent units.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Weight applied to producers absent from a priority map.
    #[serde(default = "default_priority")]
    pub default_priority: u32,

    /// Per-producer execution bound. A producer exceeding it is treated as
    /// failed; siblings are unaffected.
    #[serde(default = "default_producer_timeout_secs")]
    pub producer_timeout_secs: u64,
}

fn default_token_budget() -> usize {
    120_000
}
fn default_priority() -> u32 {
    1
}
fn default_producer_timeout_secs() -> u64 {
    30
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            default_priority: default_priority(),
            producer_timeout_secs: default_producer_timeout_secs(),
        }
    }
}

/// A producer declared entirely in config: fixed summary and facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticProducerConfig {
    /// Stable producer id.
    pub id: String,

    /// What this producer claims to specialize in.
    #[serde(default)]
    pub description: String,

    /// Fixed summary returned for every query. Falls back to `description`.
    #[serde(default)]
    pub summary: String,

    /// Fixed key facts, as `{ key, value }` pairs.
    #[serde(default)]
    pub facts: Vec<StaticFactConfig>,
}

/// A key/value pair for a static producer's facts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticFactConfig {
    pub key: String,
    pub value: String,
}

impl AppConfig {
    /// Load configuration from a specific file path.
    ///
    /// A missing file yields the defaults, matching how the runtime should
    /// behave on a fresh machine.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fusion.token_budget == 0 {
            return Err(ConfigError::Validation(
                "fusion.token_budget must be > 0".into(),
            ));
        }
        if self.fusion.default_priority == 0 {
            return Err(ConfigError::Validation(
                "fusion.default_priority must be >= 1".into(),
            ));
        }
        if self.fusion.producer_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "fusion.producer_timeout_secs must be > 0".into(),
            ));
        }
        if self.synthesis.temperature < 0.0 || self.synthesis.temperature > 2.0 {
            return Err(ConfigError::Validation(
                "synthesis.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        if self.synthesis.model.is_empty() {
            return Err(ConfigError::Validation(
                "synthesis.model must not be empty".into(),
            ));
        }
        for entry in &self.producers {
            if entry.id.is_empty() {
                return Err(ConfigError::Validation(
                    "producers[].id must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// Check if an API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            synthesis: SynthesisConfig::default(),
            fusion: FusionConfig::default(),
            producers: vec![],
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    Parse { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.fusion.token_budget, 120_000);
        assert_eq!(config.fusion.default_priority, 1);
        assert_eq!(config.synthesis.model, "gpt-4o");
        assert!((config.synthesis.temperature - 0.3).abs() < f32::EPSILON);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = AppConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.fusion.token_budget, config.fusion.token_budget);
        assert_eq!(parsed.synthesis.model, config.synthesis.model);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [fusion]
            token_budget = 5000
            "#,
        )
        .unwrap();
        assert_eq!(config.fusion.token_budget, 5000);
        assert_eq!(config.fusion.default_priority, 1);
        assert_eq!(config.synthesis.model, "gpt-4o");
    }

    #[test]
    fn static_producers_parse() {
        let config = AppConfig::from_toml_str(
            r#"
            [[producers]]
            id = "pricing_analyst"
            description = "Analyzes competitor pricing"
            summary = "Competitor pricing overview"

            [[producers.facts]]
            key = "acme_price"
            value = "$99/mo"
            "#,
        )
        .unwrap();
        assert_eq!(config.producers.len(), 1);
        assert_eq!(config.producers[0].id, "pricing_analyst");
        assert_eq!(config.producers[0].facts[0].key, "acme_price");
    }

    #[test]
    fn zero_budget_rejected() {
        let err = AppConfig::from_toml_str(
            r#"
            [fusion]
            token_budget = 0
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("token_budget"));
    }

    #[test]
    fn bad_temperature_rejected() {
        let err = AppConfig::from_toml_str(
            r#"
            [synthesis]
            temperature = 3.5
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn empty_static_producer_id_rejected() {
        let err = AppConfig::from_toml_str(
            r#"
            [[producers]]
            id = ""
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("producers"));
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut config = AppConfig::default();
        config.api_key = Some("sk-very-secret".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.fusion.token_budget, 120_000);
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contextfuse.toml");
        std::fs::write(&path, "[fusion]\ntoken_budget = 777\n").unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.fusion.token_budget, 777);
    }
}
