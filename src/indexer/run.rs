//! `run_index`: cooldown check, cursor resolution, per-commit quality gate
//! + two-pass extraction, incremental persistence, full reset (spec §4.I).

use super::quality_gate::{should_skip_commit, CommitStats};
use crate::capture::git_capture;
use crate::error::GraphitiError;
use crate::graph;
use crate::llm::Transport;
use crate::models::IndexState;
use chrono::Utc;
use std::path::Path;
use std::process::Command;

pub const COOLDOWN_SECONDS: i64 = 5 * 60;
const STRUCTURED_QUESTIONS: &str =
    "What decision was made? What changed? Why was this change made? What impact does it have?";
const FREEFORM_PROMPT: &str =
    "Identify entities and relationships in this commit: people, components, decisions, bugs, features, dependencies.";
const SUMMARIZE_THRESHOLD_LINES: usize = 300;
const SUMMARIZE_WORD_BUDGET: usize = 300;
const FALLBACK_TRUNCATE_CHARS: usize = 4000;

#[derive(Debug, Clone)]
pub struct IndexOutcome {
    pub skipped_reason: Option<String>,
    pub indexed_commits: u64,
    pub skipped_commits: u64,
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String, GraphitiError> {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .map_err(GraphitiError::Io)?;
    if !output.status.success() {
        return Err(GraphitiError::Generic(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

fn looks_like_date(since: &str) -> bool {
    since.contains('-') || since.contains('/') || since.contains(' ')
}

/// Resolve the commit-walk range per spec §4.I's cursor rules.
fn resolve_range(repo: &Path, since: Option<&str>, last_indexed_sha: Option<&str>) -> Result<Vec<String>, GraphitiError> {
    let rev_range = if let Some(since) = since {
        if looks_like_date(since) {
            format!("--since={since}")
        } else {
            format!("{since}..HEAD")
        }
    } else if let Some(sha) = last_indexed_sha {
        format!("{sha}..HEAD")
    } else {
        "HEAD".to_string()
    };

    let args: Vec<&str> = vec!["log", "--reverse", "--format=%H", &rev_range];
    let output = run_git(repo, &args)?;
    Ok(output.lines().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect())
}

fn commit_stats(repo: &Path, sha: &str) -> Result<(String, String, bool, Vec<String>, u64, u64), GraphitiError> {
    let author_email = run_git(repo, &["show", "-s", "--format=%ae", sha])?.trim().to_string();
    let message = run_git(repo, &["show", "-s", "--format=%s", sha])?.trim().to_string();
    let parents = run_git(repo, &["rev-parse", &format!("{sha}^@")])?;
    let is_merge = parents.lines().filter(|l| !l.trim().is_empty()).count() > 1;

    let numstat = run_git(repo, &["show", "--format=", "--numstat", sha])?;
    let mut files = Vec::new();
    let mut insertions = 0u64;
    let mut deletions = 0u64;
    for line in numstat.lines() {
        let parts: Vec<&str> = line.split('\t').collect();
        if parts.len() == 3 {
            insertions += parts[0].parse::<u64>().unwrap_or(0);
            deletions += parts[1].parse::<u64>().unwrap_or(0);
            files.push(parts[2].to_string());
        }
    }

    Ok((author_email, message, is_merge, files, insertions, deletions))
}

fn summarize_if_oversized(transport: &mut Transport, diff: &str) -> String {
    if diff.lines().count() <= SUMMARIZE_THRESHOLD_LINES {
        return diff.to_string();
    }
    let prompt = format!(
        "Summarize this diff in under {SUMMARIZE_WORD_BUDGET} words, focusing on what changed and why:\n\n{diff}"
    );
    let messages = vec![serde_json::json!({"role": "user", "content": prompt})];
    match graph::chat(transport, messages, None) {
        Ok(value) => value.as_str().unwrap_or_default().to_string(),
        Err(_) => diff.chars().take(FALLBACK_TRUNCATE_CHARS).collect(),
    }
}

/// One structured + one free-form episode for a single commit.
fn extract_commit(
    transport: &mut Transport,
    short_sha: &str,
    diff: &str,
) -> Result<[(String, String); 2], GraphitiError> {
    let content = summarize_if_oversized(transport, diff);

    let structured_prompt = format!("{STRUCTURED_QUESTIONS}\n\n{content}");
    let structured = graph::chat(
        transport,
        vec![serde_json::json!({"role": "user", "content": structured_prompt})],
        None,
    )?
    .as_str()
    .unwrap_or_default()
    .to_string();

    let freeform_prompt = format!("{FREEFORM_PROMPT}\n\n{content}");
    let freeform = graph::chat(
        transport,
        vec![serde_json::json!({"role": "user", "content": freeform_prompt})],
        None,
    )?
    .as_str()
    .unwrap_or_default()
    .to_string();

    Ok([
        (format!("git-history-index:structured:{short_sha}"), structured),
        (format!("git-history-index:freeform:{short_sha}"), freeform),
    ])
}

/// Run the indexer over `repo`, persisting `state` after each commit.
/// `full=true` resets state first (episode deletion is the caller's
/// responsibility via the graph engine, per spec: failure to delete is
/// logged but never aborts re-indexing).
pub fn run_index(
    transport: &mut Transport,
    repo: &Path,
    state: &mut IndexState,
    since: Option<&str>,
    full: bool,
) -> Result<IndexOutcome, GraphitiError> {
    if !full {
        if let Some(last_run) = state.last_run_at {
            let elapsed = (Utc::now() - last_run).num_seconds();
            if elapsed < COOLDOWN_SECONDS {
                return Ok(IndexOutcome {
                    skipped_reason: Some("cooldown".to_string()),
                    indexed_commits: 0,
                    skipped_commits: 0,
                });
            }
        }
    }

    if full {
        *state = IndexState::default();
    }

    let shas = resolve_range(repo, since, state.last_indexed_sha.as_deref())?;

    let mut indexed = 0u64;
    let mut skipped = 0u64;

    for full_sha in &shas {
        let short_sha = &full_sha[..full_sha.len().min(12)];

        let skip_decision = commit_stats(repo, full_sha).map(|(author_email, message, is_merge, files, ins, del)| {
            should_skip_commit(&CommitStats {
                author_email: &author_email,
                message: &message,
                is_merge,
                changed_files: &files,
                insertions: ins,
                deletions: del,
            })
        });

        let should_skip = matches!(skip_decision, Ok((true, _)));
        if should_skip {
            skipped += 1;
            state.record_commit(short_sha, full_sha);
            continue;
        }

        let diff = git_capture::fetch_commit_diff(full_sha, repo, 500)?;
        extract_commit(transport, short_sha, &diff)?;

        state.record_commit(short_sha, full_sha);
        indexed += 1;
    }

    state.last_run_at = Some(Utc::now());

    Ok(IndexOutcome {
        skipped_reason: None,
        indexed_commits: indexed,
        skipped_commits: skipped,
    })
}
