//! LLM transport: cloud/local failover, fixed-delay retry, 429 cooldown,
//! quota header parsing (spec §4.B).
//!
//! Grounded on the teacher's `api/client.rs` (minreq-based GET/POST with
//! Bearer/X-API-Key headers, `url::Url` URL building, explicit timeouts);
//! the cloud/local state machine itself follows spec §4.B's diagram rather
//! than anything in the teacher (the teacher has no failover concept).

use super::config::LlmConfig;
use super::quota::QuotaTracker;
use crate::error::GraphitiError;
use crate::models::{CooldownState, LLMOperation};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn load_cooldown(path: &Path) -> CooldownState {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}

fn save_cooldown(path: &Path, state: CooldownState) -> Result<(), GraphitiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    crate::mdm::utils::write_atomic(path, serde_json::to_string(&state)?.as_bytes())
}

/// Response from either endpoint, normalized.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub headers: HashMap<String, String>,
}

/// Transport for `chat`/`generate`/`embed`, owning the cooldown file path
/// and quota tracker for one process.
pub struct Transport {
    config: LlmConfig,
    state_path: PathBuf,
    cooldown: CooldownState,
    pub quota: QuotaTracker,
}

fn parse_model_size(model: &str) -> u64 {
    // Largest integer N in a "Nb"/"NB" suffix token, else 0.
    for token in model.split(|c: char| !c.is_ascii_alphanumeric() && c != '.') {
        let lower = token.to_ascii_lowercase();
        if let Some(stripped) = lower.strip_suffix('b') {
            if let Ok(n) = stripped.parse::<f64>() {
                return n as u64;
            }
        }
    }
    0
}

fn user_agent() -> String {
    format!("graphiti/{}", env!("CARGO_PKG_VERSION"))
}

impl Transport {
    pub fn new(config: LlmConfig, state_path: PathBuf) -> Self {
        let cooldown = load_cooldown(&state_path);
        let warning_threshold = config.quota.warning_threshold;
        Self {
            config,
            state_path,
            cooldown,
            quota: QuotaTracker::new(warning_threshold),
        }
    }

    fn cloud_usable(&self, op: LLMOperation) -> bool {
        if op == LLMOperation::Embed {
            return false;
        }
        self.config.cloud_api_key().is_some() && now_unix() >= self.cooldown.cooldown_until
    }

    fn set_cooldown(&mut self) -> Result<(), GraphitiError> {
        self.cooldown.cooldown_until = now_unix() + self.config.quota.rate_limit_cooldown_seconds;
        save_cooldown(&self.state_path, self.cooldown)
    }

    fn call_cloud(
        &mut self,
        op: LLMOperation,
        body: &Value,
    ) -> Result<LlmResponse, GraphitiError> {
        let endpoint = match op {
            LLMOperation::Chat => "/api/chat",
            LLMOperation::Generate => "/api/generate",
            LLMOperation::Embed => "/api/embed",
        };
        let url = format!("{}{}", self.config.cloud.endpoint.trim_end_matches('/'), endpoint);
        let api_key = self.config.cloud_api_key().unwrap_or_default();
        let max_attempts = self.config.retry.max_attempts.max(1);
        let delay = std::time::Duration::from_secs(self.config.retry.delay_seconds);

        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = minreq::post(&url)
                .with_header("User-Agent", user_agent())
                .with_header("Authorization", format!("Bearer {}", api_key))
                .with_header("Content-Type", "application/json")
                .with_timeout(self.config.timeout.request_timeout_seconds)
                .with_body(serde_json::to_string(body)?);

            match request.send() {
                Ok(response) => {
                    let headers: HashMap<String, String> = response
                        .headers
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone()))
                        .collect();
                    self.quota.update_from_headers(&headers);

                    if response.status_code == 429 {
                        self.set_cooldown()?;
                        return Err(GraphitiError::RateLimited);
                    }
                    if response.status_code >= 500 && attempt < max_attempts {
                        std::thread::sleep(delay);
                        continue;
                    }
                    if response.status_code >= 400 {
                        return Err(GraphitiError::TransientCloudError(format!(
                            "cloud endpoint returned {}",
                            response.status_code
                        )));
                    }
                    let text = response.as_str().unwrap_or_default().to_string();
                    return Ok(LlmResponse { text, headers });
                }
                Err(e) => {
                    if attempt < max_attempts {
                        std::thread::sleep(delay);
                        continue;
                    }
                    return Err(GraphitiError::TransientCloudError(e.to_string()));
                }
            }
        }
    }

    fn pick_local_model(&self, requested: Option<&str>, available: &[String]) -> Result<String, GraphitiError> {
        if let Some(model) = requested {
            if available.iter().any(|m| m == model) {
                return Ok(model.to_string());
            }
            return Err(GraphitiError::LocalModelMissing {
                model: model.to_string(),
            });
        }
        self.config
            .local
            .models
            .iter()
            .filter(|m| available.contains(m))
            .max_by_key(|m| parse_model_size(m))
            .cloned()
            .ok_or_else(|| GraphitiError::LocalModelMissing {
                model: "<none configured available>".to_string(),
            })
    }

    fn list_local_models(&self) -> Result<Vec<String>, GraphitiError> {
        let url = format!("{}/api/tags", self.config.local.endpoint.trim_end_matches('/'));
        let response = minreq::get(&url)
            .with_header("User-Agent", user_agent())
            .with_timeout(self.config.timeout.request_timeout_seconds)
            .send()
            .map_err(|e| GraphitiError::TransientCloudError(e.to_string()))?;
        let body: Value = serde_json::from_str(response.as_str().unwrap_or("{}"))?;
        let models = body
            .get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|m| m.get("name").and_then(|n| n.as_str()).map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        Ok(models)
    }

    fn call_local(
        &self,
        op: LLMOperation,
        model: Option<&str>,
        mut body: Value,
    ) -> Result<LlmResponse, GraphitiError> {
        let available = self.list_local_models()?;
        let model = self.pick_local_model(model, &available)?;
        if let Some(obj) = body.as_object_mut() {
            obj.insert("model".to_string(), Value::String(model));
        }

        let endpoint = match op {
            LLMOperation::Chat => "/api/chat",
            LLMOperation::Generate => "/api/generate",
            LLMOperation::Embed => "/api/embed",
        };
        let url = format!("{}{}", self.config.local.endpoint.trim_end_matches('/'), endpoint);
        let response = minreq::post(&url)
            .with_header("User-Agent", user_agent())
            .with_header("Content-Type", "application/json")
            .with_timeout(self.config.timeout.request_timeout_seconds)
            .with_body(serde_json::to_string(&body)?)
            .send()
            .map_err(|e| GraphitiError::TransientCloudError(e.to_string()))?;

        if response.status_code >= 400 {
            return Err(GraphitiError::TransientCloudError(format!(
                "local endpoint returned {}",
                response.status_code
            )));
        }
        let headers = response
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(LlmResponse {
            text: response.as_str().unwrap_or_default().to_string(),
            headers,
        })
    }

    /// Run `op` through the cloud-then-local failover chain, enqueuing on
    /// the caller's behalf is NOT done here: callers that want queueing
    /// should catch `LLMUnavailable`-worthy failures and hand off to the
    /// failed-request queue themselves (keeps this transport stateless
    /// beyond the cooldown file, per spec rule 6).
    pub fn dispatch(
        &mut self,
        op: LLMOperation,
        model: Option<&str>,
        body: Value,
    ) -> Result<LlmResponse, GraphitiError> {
        if self.cloud_usable(op) {
            match self.call_cloud(op, &body) {
                Ok(response) => return Ok(response),
                Err(GraphitiError::RateLimited) | Err(GraphitiError::TransientCloudError(_)) => {
                    return self.call_local(op, model, body);
                }
                Err(other) => return Err(other),
            }
        }
        self.call_local(op, model, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_model_size_suffix() {
        assert_eq!(parse_model_size("gemma2:9b"), 9);
        assert_eq!(parse_model_size("llama3.2:3B"), 3);
        assert_eq!(parse_model_size("nomic-embed-text"), 0);
    }

    #[test]
    fn cloud_unusable_without_api_key() {
        let temp = tempfile::TempDir::new().unwrap();
        unsafe {
            std::env::remove_var("OLLAMA_API_KEY_TEST_UNSET_MARKER");
        }
        let cfg = LlmConfig {
            cloud: super::super::config::CloudSection {
                endpoint: "https://ollama.com".into(),
                api_key_env: "OLLAMA_API_KEY_TEST_UNSET_MARKER".into(),
            },
            ..LlmConfig::default()
        };
        let transport = Transport::new(cfg, temp.path().join("state.json"));
        assert!(!transport.cloud_usable(LLMOperation::Chat));
    }

    #[test]
    fn embed_never_uses_cloud() {
        let temp = tempfile::TempDir::new().unwrap();
        unsafe {
            std::env::set_var("OLLAMA_API_KEY_TEST_EMBED_MARKER", "key");
        }
        let cfg = LlmConfig {
            cloud: super::super::config::CloudSection {
                endpoint: "https://ollama.com".into(),
                api_key_env: "OLLAMA_API_KEY_TEST_EMBED_MARKER".into(),
            },
            ..LlmConfig::default()
        };
        let transport = Transport::new(cfg, temp.path().join("state.json"));
        assert!(!transport.cloud_usable(LLMOperation::Embed));
        unsafe {
            std::env::remove_var("OLLAMA_API_KEY_TEST_EMBED_MARKER");
        }
    }

    #[test]
    fn pick_local_model_rejects_unlisted_requested_model() {
        let temp = tempfile::TempDir::new().unwrap();
        let transport = Transport::new(LlmConfig::default(), temp.path().join("state.json"));
        let err = transport
            .pick_local_model(Some("nonexistent:1b"), &["gemma2:9b".to_string()])
            .unwrap_err();
        assert!(matches!(err, GraphitiError::LocalModelMissing { .. }));
    }

    #[test]
    fn pick_local_model_picks_largest_available_fallback() {
        let temp = tempfile::TempDir::new().unwrap();
        let transport = Transport::new(LlmConfig::default(), temp.path().join("state.json"));
        let model = transport
            .pick_local_model(None, &["llama3.2:3b".to_string(), "gemma2:9b".to_string()])
            .unwrap();
        assert_eq!(model, "gemma2:9b");
    }
}
