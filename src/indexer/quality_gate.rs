//! `should_skip_commit` quality gate (spec §4.I), checked in priority order.
//! Any stats-based step that fails to evaluate fails *open* (process the
//! commit) — there's no teacher precedent for this gate, so the priority
//! order and keyword lists follow spec §4.I verbatim.

use once_cell::sync::Lazy;
use regex::Regex;

static BOT_EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\[bot\]@|@dependabot\.com|noreply@github\.com|\d+\+[^@]*\[bot\]@)").unwrap()
});

const DEPS_MESSAGE_PREFIXES: &[&str] = &[
    "chore(deps):",
    "chore(deps-dev):",
    "build(deps):",
    "chore(release):",
];

const VERSION_BUMP_BASENAMES: &[&str] = &[
    "package.json",
    "pyproject.toml",
    "__version__",
    "changelog",
    "setup.py",
    "setup.cfg",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    BotAuthor,
    DepsBumpMessage,
    EmptyMergeCommit,
    TinyCommit,
    VersionBumpOnly,
}

pub struct CommitStats<'a> {
    pub author_email: &'a str,
    pub message: &'a str,
    pub is_merge: bool,
    pub changed_files: &'a [String],
    pub insertions: u64,
    pub deletions: u64,
}

pub fn should_skip_commit(stats: &CommitStats) -> (bool, Option<SkipReason>) {
    if BOT_EMAIL_RE.is_match(stats.author_email) {
        return (true, Some(SkipReason::BotAuthor));
    }

    let lower_message = stats.message.to_lowercase();
    if DEPS_MESSAGE_PREFIXES.iter().any(|p| lower_message.starts_with(p)) {
        return (true, Some(SkipReason::DepsBumpMessage));
    }

    if stats.is_merge && stats.changed_files.is_empty() {
        return (true, Some(SkipReason::EmptyMergeCommit));
    }

    if stats.insertions + stats.deletions <= 3 {
        return (true, Some(SkipReason::TinyCommit));
    }

    if !stats.changed_files.is_empty()
        && stats.changed_files.iter().all(|f| {
            let basename = std::path::Path::new(f)
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            VERSION_BUMP_BASENAMES.iter().any(|b| basename.contains(b))
        })
    {
        return (true, Some(SkipReason::VersionBumpOnly));
    }

    (false, None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats<'a>(
        author_email: &'a str,
        message: &'a str,
        is_merge: bool,
        changed_files: &'a [String],
        insertions: u64,
        deletions: u64,
    ) -> CommitStats<'a> {
        CommitStats {
            author_email,
            message,
            is_merge,
            changed_files,
            insertions,
            deletions,
        }
    }

    #[test]
    fn skips_dependabot_commits() {
        let files = vec!["package.json".to_string()];
        let s = stats("49699333+dependabot[bot]@users.noreply.github.com", "bump x", false, &files, 50, 0);
        let (skip, reason) = should_skip_commit(&s);
        assert!(skip);
        assert_eq!(reason, Some(SkipReason::BotAuthor));
    }

    #[test]
    fn skips_deps_bump_message() {
        let files = vec!["Cargo.toml".to_string()];
        let s = stats("dev@example.com", "chore(deps): bump tokio", false, &files, 10, 2);
        let (skip, _) = should_skip_commit(&s);
        assert!(skip);
    }

    #[test]
    fn skips_tiny_commits() {
        let files = vec!["src/lib.rs".to_string()];
        let s = stats("dev@example.com", "tweak", false, &files, 1, 1);
        let (skip, reason) = should_skip_commit(&s);
        assert!(skip);
        assert_eq!(reason, Some(SkipReason::TinyCommit));
    }

    #[test]
    fn skips_version_bump_only_files() {
        let files = vec!["package.json".to_string(), "CHANGELOG.md".to_string()];
        let s = stats("dev@example.com", "release 1.2.3", false, &files, 20, 5);
        let (skip, reason) = should_skip_commit(&s);
        assert!(skip);
        assert_eq!(reason, Some(SkipReason::VersionBumpOnly));
    }

    #[test]
    fn does_not_skip_substantive_commit() {
        let files = vec!["src/parser.rs".to_string(), "src/lexer.rs".to_string()];
        let s = stats("dev@example.com", "Fix crash in parser on empty input", false, &files, 120, 40);
        let (skip, _) = should_skip_commit(&s);
        assert!(!skip);
    }
}
