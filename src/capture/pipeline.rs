//! Component G: capture pipeline — `summarize_and_store` and
//! `process_pending_commits`, per spec §4.G.

use super::git_capture;
use crate::error::GraphitiError;
use crate::graph;
use crate::llm::Transport;
use crate::models::{Allowlist, BatchAccumulator};
use crate::security;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const SEPARATOR: &str = "================================================================================";

/// One accumulated episode, ready to hand to the graph engine's
/// `add_episode`.
#[derive(Debug, Clone)]
pub struct EpisodeHandle {
    pub name: String,
    pub body: String,
    pub reference_time: i64,
    pub group_id: String,
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn build_prompt(source: &str, count: usize, items_label: &str, sanitized_content: &str) -> String {
    format!(
        "You are summarizing a {source} session of {count} {items_label}. \
Produce a single cohesive session summary focused on decisions, architecture, \
bug root-causes, and dependencies. Exclude raw code and WIP noise. Note that \
merge commits have already been deduplicated.\n\n{sanitized_content}"
    )
}

/// `summarize_and_store(items, source, scope, tags)`: security gate, LLM
/// summarization with concatenation-only fallback on `LLMUnavailable`, then
/// an episode ready for the graph engine.
pub fn summarize_and_store(
    transport: &mut Transport,
    items: &[String],
    source: &str,
    scope: &str,
    allowlist: &Allowlist,
    audit_log_path: Option<&Path>,
) -> Result<Option<EpisodeHandle>, GraphitiError> {
    if items.is_empty() {
        return Ok(None);
    }

    let joined = items.join(&format!("\n{SEPARATOR}\n"));

    let sanitization = security::sanitize(&joined, None, allowlist, audit_log_path)?;
    let sanitized_content = sanitization.sanitized;

    let prompt = build_prompt(source, items.len(), "items", &sanitized_content);
    let messages = vec![serde_json::json!({"role": "user", "content": prompt})];

    let summary = match graph::chat(transport, messages, None) {
        Ok(value) => value.as_str().unwrap_or_default().to_string(),
        Err(GraphitiError::LLMUnavailable { .. })
        | Err(GraphitiError::TransientCloudError(_))
        | Err(GraphitiError::RateLimited)
        | Err(GraphitiError::LocalModelMissing { .. }) => format!(
            "Session from {source} ({} items): {sanitized_content}",
            items.len()
        ),
        Err(e) => return Err(e),
    };

    let now = now_unix();
    Ok(Some(EpisodeHandle {
        name: format!("{source}_{now}"),
        body: summary,
        reference_time: now,
        group_id: scope.to_string(),
    }))
}

/// Drain the pending-commits file, fetch + filter + batch diffs, and
/// summarize each full (and any trailing partial) batch.
pub fn process_pending_commits(
    transport: &mut Transport,
    pending_path: &Path,
    repo: &Path,
    batch_size: usize,
    max_lines_per_file: usize,
    scope: &str,
    allowlist: &Allowlist,
    audit_log_path: Option<&Path>,
) -> Result<(Vec<EpisodeHandle>, usize), GraphitiError> {
    let shas = git_capture::drain(pending_path)?;
    let mut accumulator: BatchAccumulator<String> = BatchAccumulator::new(batch_size.max(1));
    let mut episodes = Vec::new();
    let mut skipped = 0;

    for sha in &shas {
        let diff = match git_capture::fetch_commit_diff(sha, repo, max_lines_per_file) {
            Ok(d) => d,
            Err(_) => {
                skipped += 1;
                continue;
            }
        };

        let subject = diff.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        if !git_capture::is_relevant(subject, None) {
            skipped += 1;
            continue;
        }

        if let Some(batch) = accumulator.add(diff) {
            if let Some(episode) = summarize_and_store(
                transport,
                &batch,
                "git-capture",
                scope,
                allowlist,
                audit_log_path,
            )? {
                episodes.push(episode);
            }
        }
    }

    if let Some(partial) = accumulator.flush() {
        if let Some(episode) = summarize_and_store(
            transport,
            &partial,
            "git-capture",
            scope,
            allowlist,
            audit_log_path,
        )? {
            episodes.push(episode);
        }
    }

    Ok((episodes, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_prompt_includes_source_and_count() {
        let prompt = build_prompt("git-capture", 3, "commits", "content here");
        assert!(prompt.contains("git-capture"));
        assert!(prompt.contains('3'));
        assert!(prompt.contains("content here"));
    }
}
