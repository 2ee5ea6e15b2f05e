use crate::error::{CoreError, Result};
use crate::models::Severity;
use serde::Deserialize;

/// Top-level configuration, constructed once and handed to components that
/// need it. Nothing downstream re-reads the environment.
#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ai_diagnosis: AiDiagnosisConfig,

    pub openrouter: OpenRouterConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AiDiagnosisConfig {
    #[serde(default = "default_ai_enabled")]
    pub enabled: bool,

    #[serde(default = "default_min_severity")]
    pub min_severity: Severity,

    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    #[serde(default = "default_cache_ttl_minutes")]
    pub cache_ttl_minutes: u64,
}

impl Default for AiDiagnosisConfig {
    fn default() -> Self {
        Self {
            enabled: default_ai_enabled(),
            min_severity: default_min_severity(),
            cache_enabled: default_cache_enabled(),
            cache_ttl_minutes: default_cache_ttl_minutes(),
        }
    }
}

fn default_ai_enabled() -> bool {
    true
}

fn default_min_severity() -> Severity {
    Severity::Medium
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_minutes() -> u64 {
    30
}

#[derive(Clone, Debug, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_api_url() -> String {
    "https://openrouter.ai/api/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "anthropic/claude-3-haiku".to_string()
}

fn default_timeout_seconds() -> u64 {
    15
}

fn default_max_tokens() -> u32 {
    700
}

fn default_temperature() -> f32 {
    0.7
}

impl AppConfig {
    /// Reads all recognized options from the process environment, applying
    /// the documented defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let ai_diagnosis = AiDiagnosisConfig {
            enabled: std::env::var("AI_DIAGNOSIS_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_ai_enabled),
            min_severity: std::env::var("AI_DIAGNOSIS_MIN_SEVERITY")
                .ok()
                .and_then(|v| Severity::parse(&v))
                .unwrap_or_else(default_min_severity),
            cache_enabled: std::env::var("AI_DIAGNOSIS_CACHE_ENABLED")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_cache_enabled),
            cache_ttl_minutes: std::env::var("AI_DIAGNOSIS_CACHE_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_cache_ttl_minutes),
        };

        let openrouter = OpenRouterConfig {
            api_url: std::env::var("OPENROUTER_API_URL").unwrap_or_else(|_| default_api_url()),
            api_key: std::env::var("OPENROUTER_API_KEY").unwrap_or_default(),
            model: std::env::var("OPENROUTER_MODEL").unwrap_or_else(|_| default_model()),
            timeout_seconds: std::env::var("OPENROUTER_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_timeout_seconds),
            max_tokens: std::env::var("OPENROUTER_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_max_tokens),
            temperature: std::env::var("OPENROUTER_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or_else(default_temperature),
        };

        Ok(Self {
            ai_diagnosis,
            openrouter,
        })
    }

    /// Parses the same shape from a YAML file, for callers that prefer
    /// file-based configuration over environment variables.
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| CoreError::ConfigError(format!("failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| CoreError::ConfigError(format!("failed to parse config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_defaults_when_unset() {
        let config = AppConfig::from_env().unwrap();
        assert!(config.ai_diagnosis.enabled);
        assert_eq!(config.ai_diagnosis.min_severity, Severity::Medium);
        assert!(config.ai_diagnosis.cache_enabled);
        assert_eq!(config.ai_diagnosis.cache_ttl_minutes, 30);
        assert_eq!(config.openrouter.max_tokens, 700);
    }

    #[test]
    fn from_file_parses_yaml() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ai_diagnosis:\n  enabled: false\nopenrouter:\n  api_key: test-key\n  model: test-model\n"
        )
        .unwrap();

        let config = AppConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert!(!config.ai_diagnosis.enabled);
        assert_eq!(config.openrouter.api_key, "test-key");
        assert_eq!(config.openrouter.model, "test-model");
    }
}
