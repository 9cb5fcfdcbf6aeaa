use std::fmt;

/// Crate-wide error type. Carries one variant per taxonomy entry from the
/// error handling design plus a handful of plumbing wrappers.
#[derive(Debug)]
pub enum GraphitiError {
    /// Both LLM endpoints failed and the request was enqueued for retry.
    LLMUnavailable { queue_id: String },
    /// Cloud quota threshold crossed. Not fatal; callers proceed.
    QuotaExceeded,
    /// Connection error or 5xx from the cloud endpoint; retried internally.
    TransientCloudError(String),
    /// HTTP 429 from the cloud endpoint; triggers cooldown and local fallback.
    RateLimited,
    /// A specifically requested local model isn't in the local listing.
    LocalModelMissing { model: String },
    /// Internal signal: a commit or batch item was dropped by the relevance filter.
    RelevanceSkip,
    /// LLM structured output failed schema validation; caller falls back to free text.
    SchemaValidation(String),
    /// Indexer declined to run because of cooldown; informational, not an error exit.
    IndexerCooldown,
    /// Pre-commit hook found a secret in staged content; blocks the commit.
    HookSecretDetected { findings: usize },
    Io(std::io::Error),
    Json(serde_json::Error),
    Toml(String),
    Sql(String),
    Utf8(std::str::Utf8Error),
    FromUtf8(std::string::FromUtf8Error),
    Generic(String),
}

impl fmt::Display for GraphitiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphitiError::LLMUnavailable { queue_id } => write!(
                f,
                "LLM unavailable. Request queued for retry. ID: {}",
                queue_id
            ),
            GraphitiError::QuotaExceeded => write!(f, "cloud quota threshold exceeded"),
            GraphitiError::TransientCloudError(msg) => write!(f, "transient cloud error: {}", msg),
            GraphitiError::RateLimited => write!(f, "rate limited by cloud endpoint"),
            GraphitiError::LocalModelMissing { model } => {
                write!(f, "local model not available: {}", model)
            }
            GraphitiError::RelevanceSkip => write!(f, "item skipped by relevance filter"),
            GraphitiError::SchemaValidation(msg) => {
                write!(f, "structured output failed validation: {}", msg)
            }
            GraphitiError::IndexerCooldown => write!(f, "indexer is in cooldown"),
            GraphitiError::HookSecretDetected { findings } => {
                write!(f, "{} secret(s) detected in staged changes", findings)
            }
            GraphitiError::Io(e) => write!(f, "io error: {}", e),
            GraphitiError::Json(e) => write!(f, "json error: {}", e),
            GraphitiError::Toml(msg) => write!(f, "toml error: {}", msg),
            GraphitiError::Sql(msg) => write!(f, "sql error: {}", msg),
            GraphitiError::Utf8(e) => write!(f, "utf8 error: {}", e),
            GraphitiError::FromUtf8(e) => write!(f, "utf8 error: {}", e),
            GraphitiError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for GraphitiError {}

impl Clone for GraphitiError {
    fn clone(&self) -> Self {
        match self {
            GraphitiError::LLMUnavailable { queue_id } => GraphitiError::LLMUnavailable {
                queue_id: queue_id.clone(),
            },
            GraphitiError::QuotaExceeded => GraphitiError::QuotaExceeded,
            GraphitiError::TransientCloudError(m) => GraphitiError::TransientCloudError(m.clone()),
            GraphitiError::RateLimited => GraphitiError::RateLimited,
            GraphitiError::LocalModelMissing { model } => GraphitiError::LocalModelMissing {
                model: model.clone(),
            },
            GraphitiError::RelevanceSkip => GraphitiError::RelevanceSkip,
            GraphitiError::SchemaValidation(m) => GraphitiError::SchemaValidation(m.clone()),
            GraphitiError::IndexerCooldown => GraphitiError::IndexerCooldown,
            GraphitiError::HookSecretDetected { findings } => {
                GraphitiError::HookSecretDetected { findings: *findings }
            }
            // std::io::Error isn't Clone; reconstruct by kind + message.
            GraphitiError::Io(e) => GraphitiError::Io(std::io::Error::new(e.kind(), e.to_string())),
            // serde_json::Error isn't Clone either; collapse to Generic.
            GraphitiError::Json(e) => GraphitiError::Generic(format!("json error: {}", e)),
            GraphitiError::Toml(m) => GraphitiError::Toml(m.clone()),
            GraphitiError::Sql(m) => GraphitiError::Sql(m.clone()),
            GraphitiError::Utf8(e) => GraphitiError::Utf8(*e),
            GraphitiError::FromUtf8(e) => GraphitiError::FromUtf8(e.clone()),
            GraphitiError::Generic(m) => GraphitiError::Generic(m.clone()),
        }
    }
}

impl From<std::io::Error> for GraphitiError {
    fn from(e: std::io::Error) -> Self {
        GraphitiError::Io(e)
    }
}

impl From<serde_json::Error> for GraphitiError {
    fn from(e: serde_json::Error) -> Self {
        GraphitiError::Json(e)
    }
}

impl From<rusqlite::Error> for GraphitiError {
    fn from(e: rusqlite::Error) -> Self {
        GraphitiError::Sql(e.to_string())
    }
}

impl From<toml::de::Error> for GraphitiError {
    fn from(e: toml::de::Error) -> Self {
        GraphitiError::Toml(e.to_string())
    }
}

impl From<toml::ser::Error> for GraphitiError {
    fn from(e: toml::ser::Error) -> Self {
        GraphitiError::Toml(e.to_string())
    }
}

impl From<std::str::Utf8Error> for GraphitiError {
    fn from(e: std::str::Utf8Error) -> Self {
        GraphitiError::Utf8(e)
    }
}

impl From<std::string::FromUtf8Error> for GraphitiError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        GraphitiError::FromUtf8(e)
    }
}

/// Exit code a CLI command should use for a given error.
/// Bad-argument conditions (conflicting scope flags etc.) are detected
/// before a GraphitiError is constructed and exit 2 directly; any
/// GraphitiError reaching the top level is a generic failure (exit 1),
/// except IndexerCooldown which is informational (exit 0).
pub fn exit_code(err: &GraphitiError) -> i32 {
    match err {
        GraphitiError::IndexerCooldown => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn llm_unavailable_message_matches_spec() {
        let e = GraphitiError::LLMUnavailable {
            queue_id: "abc-123".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "LLM unavailable. Request queued for retry. ID: abc-123"
        );
    }

    #[test]
    fn clone_reconstructs_io_error() {
        let e = GraphitiError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let cloned = e.clone();
        assert_eq!(e.to_string(), cloned.to_string());
    }

    #[test]
    fn indexer_cooldown_exits_zero() {
        assert_eq!(exit_code(&GraphitiError::IndexerCooldown), 0);
    }

    #[test]
    fn generic_errors_exit_one() {
        assert_eq!(exit_code(&GraphitiError::RateLimited), 1);
    }
}
