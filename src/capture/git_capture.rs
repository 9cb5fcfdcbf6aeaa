//! Component E: git capture — pending-file drain, diff fetch, relevance
//! filter.
//!
//! Grounded on the teacher's subprocess-calling conventions (`git::repository`
//! shells out to `git` with explicit timeouts) and `mdm/utils.rs::write_atomic`
//! for the atomic rename; the diff-fetch algorithm and relevance keyword
//! lists follow spec §4.E verbatim (no teacher precedent for commit
//! relevance filtering).

use crate::error::GraphitiError;
use std::collections::HashMap;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(30);

/// Drain a pending-commits file: rename to `<path>.processing`, read, split
/// on newlines, drop empty lines, then delete the temp file. Returns `[]`
/// if `path` doesn't exist. A hook racing to append between the existence
/// check and the rename simply recreates the base file for the next drain.
pub fn drain(path: &Path) -> Result<Vec<String>, GraphitiError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let processing_path = path.with_extension("processing");
    // Retry a handful of times in case a stale `.processing` file exists
    // from an interrupted previous drain.
    let mut attempts = 0;
    loop {
        match std::fs::rename(path, &processing_path) {
            Ok(()) => break,
            Err(e) if attempts < 3 => {
                attempts += 1;
                let _ = std::fs::remove_file(&processing_path);
                if attempts >= 3 {
                    return Err(GraphitiError::Io(e));
                }
            }
            Err(e) => return Err(GraphitiError::Io(e)),
        }
    }

    let contents = std::fs::read_to_string(&processing_path)?;
    let _ = std::fs::remove_file(&processing_path);

    Ok(contents
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

fn run_git(repo: &Path, args: &[&str]) -> Result<String, GraphitiError> {
    let mut child = Command::new("git")
        .args(args)
        .current_dir(repo)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()
        .map_err(GraphitiError::Io)?;

    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let result = child.wait_with_output();
        let _ = tx.send(result);
    });

    let output = match rx.recv_timeout(SUBPROCESS_TIMEOUT) {
        Ok(result) => result.map_err(GraphitiError::Io)?,
        Err(_) => {
            return Err(GraphitiError::Generic(format!(
                "git {} timed out after {:?}",
                args.join(" "),
                SUBPROCESS_TIMEOUT
            )));
        }
    };

    if !output.status.success() {
        return Err(GraphitiError::Generic(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

/// Truncate each `diff --git`-delimited file section to at most
/// `max_lines_per_file` lines, appending a truncation marker when cut.
fn truncate_diff(diff: &str, max_lines_per_file: usize) -> String {
    let mut sections: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    let flush = |current: &mut Vec<&str>, sections: &mut Vec<String>| {
        if current.is_empty() {
            return;
        }
        if current.len() > max_lines_per_file {
            let mut truncated: Vec<String> =
                current[..max_lines_per_file].iter().map(|s| s.to_string()).collect();
            truncated.push(format!("... (truncated at {max_lines_per_file} lines)"));
            sections.push(truncated.join("\n"));
        } else {
            sections.push(current.join("\n"));
        }
        current.clear();
    };

    for line in diff.lines() {
        if line.starts_with("diff --git") && !current.is_empty() {
            flush(&mut current, &mut sections);
        }
        current.push(line);
    }
    flush(&mut current, &mut sections);

    sections.join("\n")
}

/// Fetch a commit's metadata + truncated diff body.
pub fn fetch_commit_diff(
    sha: &str,
    repo: &Path,
    max_lines_per_file: usize,
) -> Result<String, GraphitiError> {
    let metadata = run_git(repo, &["show", "--format=fuller", "--stat", sha])?;

    let parents = run_git(repo, &["rev-parse", &format!("{sha}^@")])?;
    let parent_count = parents.lines().filter(|l| !l.trim().is_empty()).count();

    let diff = if parent_count > 1 {
        run_git(repo, &["diff-tree", "-m", "--no-commit-id", "--patch", sha])?
    } else {
        run_git(repo, &["diff-tree", "--no-commit-id", "--patch", sha])?
    };

    let truncated = truncate_diff(&diff, max_lines_per_file);
    Ok(format!("{}\n\n{}", metadata.trim_end(), truncated))
}

const EXCLUDE_MESSAGE_PATTERNS: &[&str] = &[
    "fixup!",
    "wip",
    "typo",
    "format",
    "ran tests",
    "updated readme",
    "squash",
    "lint",
    "formatting chore",
    "temporary experiment",
    "debugging trace",
];

fn default_keyword_categories() -> HashMap<&'static str, Vec<&'static str>> {
    HashMap::from([
        (
            "decisions",
            vec![
                "decided", "chose", "selected", "alternative", "option", "rejected", "tradeoff",
                "instead of", "rather than",
            ],
        ),
        (
            "architecture",
            vec![
                "design", "structure", "pattern", "component", "interface", "layer", "module",
                "refactor", "architecture",
            ],
        ),
        (
            "bugs",
            vec![
                "fix", "bug", "error", "issue", "crash", "regression", "root cause", "workaround",
                "patch",
            ],
        ),
        (
            "dependencies",
            vec![
                "add", "install", "upgrade", "remove", "dependency", "library", "package",
                "version", "migrate",
            ],
        ),
    ])
}

/// A commit is relevant iff its message doesn't match an exclude pattern
/// and matches at least one keyword from the enabled categories.
/// Passing an empty/unrecognized `categories` selection falls back to all
/// default categories.
pub fn is_relevant(message: &str, categories: Option<&[&str]>) -> bool {
    let lower = message.to_lowercase();
    if EXCLUDE_MESSAGE_PATTERNS.iter().any(|p| lower.contains(p)) {
        return false;
    }

    let defaults = default_keyword_categories();
    let selected: Vec<&str> = match categories {
        Some(cats) if cats.iter().any(|c| defaults.contains_key(c)) => {
            cats.iter().filter(|c| defaults.contains_key(*c)).copied().collect()
        }
        _ => defaults.keys().copied().collect(),
    };

    selected
        .iter()
        .filter_map(|c| defaults.get(c))
        .any(|keywords| keywords.iter().any(|k| lower.contains(k)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn drain_returns_empty_when_missing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pending.txt");
        assert_eq!(drain(&path).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn drain_splits_and_strips_empty_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("pending.txt");
        std::fs::write(&path, "abc123\n\ndef456\n").unwrap();
        let shas = drain(&path).unwrap();
        assert_eq!(shas, vec!["abc123".to_string(), "def456".to_string()]);
        assert!(!path.exists());
        assert!(!path.with_extension("processing").exists());
    }

    #[test]
    fn truncates_oversized_file_section() {
        let lines: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        let diff = format!("diff --git a b\n{}", lines.join("\n"));
        let truncated = truncate_diff(&diff, 3);
        assert!(truncated.contains("truncated at 3 lines"));
    }

    #[test]
    fn excludes_fixup_commits() {
        assert!(!is_relevant("fixup! small tweak", None));
    }

    #[test]
    fn matches_bug_keyword() {
        assert!(is_relevant("Fix crash in parser", None));
    }

    #[test]
    fn rejects_message_with_no_keyword_match() {
        assert!(!is_relevant("bump minor housekeeping", None));
    }

    #[test]
    fn unrecognized_category_falls_back_to_defaults() {
        assert!(is_relevant("Fix crash in parser", Some(&["not-a-real-category"])));
    }
}
