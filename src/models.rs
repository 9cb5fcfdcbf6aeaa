//! Core data-model types shared across components (spec §3).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One git commit fetched for capture or indexing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitDiff {
    pub full_hash: String,
    pub short_hash: String,
    pub author_name: String,
    pub author_email: String,
    pub subject: String,
    pub body: String,
    pub committed_at: chrono::DateTime<chrono::FixedOffset>,
    pub parent_count: usize,
    pub diff_body: String,
}

/// Fixed-capacity accumulator: `add` returns `Some(batch)` exactly when the
/// batch fills; otherwise the item is buffered and `None` is returned.
#[derive(Debug, Clone)]
pub struct BatchAccumulator<T> {
    capacity: usize,
    items: Vec<T>,
}

impl<T> BatchAccumulator<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "batch capacity must be positive");
        Self {
            capacity,
            items: Vec::with_capacity(capacity),
        }
    }

    /// Add an item. Returns the full ordered batch once capacity is reached,
    /// leaving the accumulator empty again.
    pub fn add(&mut self, item: T) -> Option<Vec<T>> {
        self.items.push(item);
        if self.items.len() >= self.capacity {
            Some(std::mem::take(&mut self.items))
        } else {
            None
        }
    }

    /// Return and clear any partial remainder.
    pub fn flush(&mut self) -> Option<Vec<T>> {
        if self.items.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.items))
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One parsed line of a JSONL conversation transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptTurn {
    pub index: u64,
    pub role: String,
    pub content: String,
}

/// `session_id -> last_captured_turn_index`, one JSON file per host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaptureMetadata {
    #[serde(flatten)]
    pub sessions: HashMap<String, u64>,
}

impl CaptureMetadata {
    pub fn last_captured_turn(&self, session_id: &str) -> u64 {
        self.sessions.get(session_id).copied().unwrap_or(0)
    }

    pub fn record(&mut self, session_id: &str, turn_index: u64) {
        let entry = self.sessions.entry(session_id.to_string()).or_insert(0);
        if turn_index > *entry {
            *entry = turn_index;
        }
    }
}

/// Per-project indexer state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexState {
    pub version: u32,
    pub last_indexed_sha: Option<String>,
    pub processed_shas: Vec<String>,
    pub last_run_at: Option<chrono::DateTime<chrono::Utc>>,
    pub indexed_commits_count: u64,
}

impl Default for IndexState {
    fn default() -> Self {
        Self {
            version: 1,
            last_indexed_sha: None,
            processed_shas: Vec::new(),
            last_run_at: None,
            indexed_commits_count: 0,
        }
    }
}

pub const MAX_PROCESSED_SHAS: usize = 10_000;

impl IndexState {
    /// Record a successfully indexed commit: advance the cursor, append the
    /// short sha (capping the history), bump the counter.
    pub fn record_commit(&mut self, short_sha: &str, full_sha: &str) {
        self.last_indexed_sha = Some(full_sha.to_string());
        self.processed_shas.push(short_sha.to_string());
        if self.processed_shas.len() > MAX_PROCESSED_SHAS {
            let excess = self.processed_shas.len() - MAX_PROCESSED_SHAS;
            self.processed_shas.drain(0..excess);
        }
        self.indexed_commits_count += 1;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    AwsKey,
    GithubToken,
    Jwt,
    ApiKey,
    PrivateKey,
    ConnectionString,
    HighEntropy,
}

impl DetectionType {
    pub fn placeholder_name(&self) -> &'static str {
        match self {
            DetectionType::AwsKey => "aws_key",
            DetectionType::GithubToken => "github_token",
            DetectionType::Jwt => "jwt",
            DetectionType::ApiKey => "api_key",
            DetectionType::PrivateKey => "private_key",
            DetectionType::ConnectionString => "connection_string",
            DetectionType::HighEntropy => "high_entropy",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretFinding {
    pub detection_type: DetectionType,
    pub matched_text: String,
    pub line_number: usize,
    pub confidence: Confidence,
    pub entropy_score: Option<f64>,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SanitizationResult {
    pub original: String,
    pub sanitized: String,
    pub findings: Vec<SecretFinding>,
    pub allowlisted_count: usize,
}

impl SanitizationResult {
    pub fn was_modified(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// Per-project allowlist file: hash -> justification + metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Allowlist {
    pub allowed_patterns: Vec<String>,
    pub comments: HashMap<String, String>,
    pub metadata: HashMap<String, AllowlistMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllowlistMetadata {
    pub added_date: chrono::DateTime<chrono::Utc>,
    pub added_by: String,
}

/// Cooldown state persisted as one tiny JSON file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CooldownState {
    pub cooldown_until: i64,
}

impl Default for CooldownState {
    fn default() -> Self {
        Self { cooldown_until: 0 }
    }
}

/// One failed LLM request persisted for later retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMQueueItem {
    pub id: String,
    pub operation: LLMOperation,
    pub params: serde_json::Value,
    pub timestamp: f64,
    pub original_error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LLMOperation {
    Chat,
    Generate,
    Embed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Failed,
    Dead,
}

/// Tagged job payload: one explicit case per structured job type plus a
/// catch-all CLI replay (design note: compile-time-exhaustive dispatch).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobPayload {
    CaptureGitCommits {
        pending_file: String,
    },
    CaptureConversation {
        transcript_path: String,
        session_id: String,
    },
    IndexRepository {
        project_root: String,
        full: bool,
    },
    CliReplay {
        command: String,
        args: Vec<String>,
        kwargs: serde_json::Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub job_type: String,
    pub payload: JobPayload,
    pub parallel: bool,
    pub created_at: f64,
    pub status: JobStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeadLetterJob {
    pub id: String,
    pub job_type: String,
    pub payload: JobPayload,
    pub parallel: bool,
    pub created_at: f64,
    pub failed_at: f64,
    pub final_error: String,
    pub retry_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_accumulator_returns_none_until_full() {
        let mut acc = BatchAccumulator::new(3);
        assert_eq!(acc.add(1), None);
        assert_eq!(acc.add(2), None);
        assert_eq!(acc.add(3), Some(vec![1, 2, 3]));
        assert!(acc.is_empty());
    }

    #[test]
    fn batch_accumulator_flush_returns_partial_remainder() {
        let mut acc = BatchAccumulator::new(5);
        acc.add(1);
        acc.add(2);
        assert_eq!(acc.flush(), Some(vec![1, 2]));
        assert_eq!(acc.flush(), None);
    }

    #[test]
    fn capture_metadata_records_max_turn_seen() {
        let mut meta = CaptureMetadata::default();
        meta.record("session-a", 5);
        meta.record("session-a", 3);
        assert_eq!(meta.last_captured_turn("session-a"), 5);
        assert_eq!(meta.last_captured_turn("unknown"), 0);
    }

    #[test]
    fn index_state_caps_processed_shas_at_ten_thousand() {
        let mut state = IndexState::default();
        for i in 0..(MAX_PROCESSED_SHAS + 10) {
            state.record_commit(&format!("sha{i}"), &format!("fullsha{i}"));
        }
        assert_eq!(state.processed_shas.len(), MAX_PROCESSED_SHAS);
        assert_eq!(state.processed_shas.last().unwrap(), &format!("sha{}", MAX_PROCESSED_SHAS + 9));
    }

    #[test]
    fn sanitization_was_modified_iff_findings_nonempty() {
        let clean = SanitizationResult {
            original: "x".into(),
            sanitized: "x".into(),
            findings: vec![],
            allowlisted_count: 0,
        };
        assert!(!clean.was_modified());
    }
}
