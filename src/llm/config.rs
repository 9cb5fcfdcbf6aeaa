//! `llm.toml`-backed configuration for the LLM transport (component B).
//!
//! Grounded on the teacher's `config.rs` singleton architecture (`OnceLock`
//! global, lazy `get()`, `#[cfg(any(test, feature = "test-support"))]`
//! patch override for tests) and on the field set + defaults from
//! `examples/original_source/src/llm/config.py`, with `request_timeout_seconds`
//! overridden to the spec's 180s default.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

#[cfg(any(test, feature = "test-support"))]
use std::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudSection {
    pub endpoint: String,
    pub api_key_env: String,
}

impl Default for CloudSection {
    fn default() -> Self {
        Self {
            endpoint: "https://ollama.com".to_string(),
            api_key_env: "OLLAMA_API_KEY".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalSection {
    pub endpoint: String,
    pub auto_start: bool,
    pub models: Vec<String>,
}

impl Default for LocalSection {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            auto_start: false,
            models: vec!["gemma2:9b".to_string(), "llama3.2:3b".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsSection {
    pub model: String,
}

impl Default for EmbeddingsSection {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub delay_seconds: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_seconds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    pub request_timeout_seconds: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            request_timeout_seconds: 180,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuotaSection {
    pub warning_threshold: f64,
    pub rate_limit_cooldown_seconds: i64,
}

impl Default for QuotaSection {
    fn default() -> Self {
        Self {
            warning_threshold: 0.8,
            rate_limit_cooldown_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub failover_logging: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            failover_logging: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSection {
    pub max_size: usize,
    pub item_ttl_hours: u64,
}

impl Default for QueueSection {
    fn default() -> Self {
        Self {
            max_size: 1000,
            item_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankingSection {
    pub enabled: bool,
    pub backend: String,
}

impl Default for RerankingSection {
    fn default() -> Self {
        Self {
            enabled: false,
            backend: "none".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub cloud: CloudSection,
    pub local: LocalSection,
    pub embeddings: EmbeddingsSection,
    pub retry: RetrySection,
    pub timeout: TimeoutSection,
    pub quota: QuotaSection,
    pub logging: LoggingSection,
    pub queue: QueueSection,
    pub reranking: RerankingSection,
}

impl LlmConfig {
    /// Load from `path` if it exists, else all-default. Then apply
    /// `OLLAMA_CLOUD_ENDPOINT` / `OLLAMA_API_KEY` / `OLLAMA_LOCAL_ENDPOINT`
    /// env-var overrides, matching `original_source/src/llm/config.py::load_config`.
    pub fn load(path: &Path) -> Self {
        let mut cfg = if path.exists() {
            std::fs::read_to_string(path)
                .ok()
                .and_then(|s| toml::from_str(&s).ok())
                .unwrap_or_default()
        } else {
            Self::default()
        };

        if let Ok(endpoint) = std::env::var("OLLAMA_CLOUD_ENDPOINT") {
            if !endpoint.is_empty() {
                cfg.cloud.endpoint = endpoint;
            }
        }
        if let Ok(endpoint) = std::env::var("OLLAMA_LOCAL_ENDPOINT") {
            if !endpoint.is_empty() {
                cfg.local.endpoint = endpoint;
            }
        }
        cfg
    }

    /// Resolve the cloud API key from the configured env var name.
    pub fn cloud_api_key(&self) -> Option<String> {
        std::env::var(&self.cloud.api_key_env).ok().filter(|s| !s.is_empty())
    }
}

static LLM_CONFIG: OnceLock<LlmConfig> = OnceLock::new();

#[cfg(any(test, feature = "test-support"))]
static TEST_OVERRIDE: RwLock<Option<LlmConfig>> = RwLock::new(None);

/// Access the process-wide LLM config, loading it from `path` on first call.
pub fn get_or_init(path: &Path) -> &'static LlmConfig {
    LLM_CONFIG.get_or_init(|| LlmConfig::load(path))
}

/// Access the already-initialized config (panics if `get_or_init` was never
/// called). In tests, a patched override takes precedence when set.
#[cfg(any(test, feature = "test-support"))]
pub fn current() -> LlmConfig {
    if let Some(patch) = TEST_OVERRIDE.read().unwrap().clone() {
        return patch;
    }
    LLM_CONFIG
        .get()
        .cloned()
        .unwrap_or_default()
}

#[cfg(not(any(test, feature = "test-support")))]
pub fn current() -> LlmConfig {
    LLM_CONFIG.get().cloned().unwrap_or_default()
}

#[cfg(any(test, feature = "test-support"))]
pub fn set_test_override(cfg: Option<LlmConfig>) {
    *TEST_OVERRIDE.write().unwrap() = cfg;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn default_matches_spec_defaults() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.cloud.endpoint, "https://ollama.com");
        assert_eq!(cfg.local.endpoint, "http://localhost:11434");
        assert!(!cfg.local.auto_start);
        assert_eq!(cfg.timeout.request_timeout_seconds, 180);
        assert_eq!(cfg.quota.rate_limit_cooldown_seconds, 600);
        assert_eq!(cfg.queue.max_size, 1000);
        assert!(!cfg.reranking.enabled);
    }

    #[test]
    #[serial]
    fn env_override_takes_precedence() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("llm.toml");
        unsafe {
            std::env::set_var("OLLAMA_CLOUD_ENDPOINT", "https://cloud.example.test");
        }
        let cfg = LlmConfig::load(&path);
        assert_eq!(cfg.cloud.endpoint, "https://cloud.example.test");
        unsafe {
            std::env::remove_var("OLLAMA_CLOUD_ENDPOINT");
        }
    }

    #[test]
    fn missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("does-not-exist.toml");
        let cfg = LlmConfig::load(&path);
        assert_eq!(cfg.cloud.endpoint, "https://ollama.com");
    }

    #[test]
    fn loads_partial_toml_with_defaults_filled_in() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("llm.toml");
        std::fs::write(&path, "[retry]\nmax_attempts = 5\n").unwrap();
        let cfg = LlmConfig::load(&path);
        assert_eq!(cfg.retry.max_attempts, 5);
        assert_eq!(cfg.retry.delay_seconds, 10);
    }
}
