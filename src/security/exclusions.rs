//! File-exclusion pattern matching (spec §4.A `check_excluded`).
//!
//! Grounded on the teacher's `glob::Pattern`-based repo allow/exclude lists
//! in `config.rs`; the default pattern list itself comes from the spec.

use glob::Pattern;
use std::path::Path;

/// Default exclusion glob patterns. Patterns ending in `/` are directory
/// patterns and match any ancestor component with that name.
pub fn default_patterns() -> Vec<String> {
    vec![
        ".env".into(),
        ".env.*".into(),
        "*.env".into(),
        "*secret*".into(),
        "*credential*".into(),
        "*password*".into(),
        "*token*".into(),
        "*.key".into(),
        "*.pem".into(),
        "*.p12".into(),
        "*.pfx".into(),
        "*.jks".into(),
        "node_modules/".into(),
        ".git/".into(),
        "venv/".into(),
        ".venv/".into(),
        "__pycache__/".into(),
        "tests/".into(),
        "test/".into(),
        "**/test_*.".into(),
        "**/*_test.".into(),
        "fixtures/".into(),
        "mocks/".into(),
        "dist/".into(),
        "build/".into(),
        "*.egg-info/".into(),
    ]
}

pub struct ExclusionList {
    patterns: Vec<(String, Pattern)>,
}

impl ExclusionList {
    pub fn new(raw_patterns: Vec<String>) -> Self {
        let patterns = raw_patterns
            .into_iter()
            .filter_map(|p| {
                let glob_src = p.trim_end_matches('/');
                Pattern::new(glob_src).ok().map(|compiled| (p, compiled))
            })
            .collect();
        Self { patterns }
    }

    pub fn default_list() -> Self {
        Self::new(default_patterns())
    }

    /// Check a path (resolving symlinks first; resolution failure excludes
    /// conservatively) against the pattern list. Directory patterns (those
    /// whose raw form ends in `/`) match any ancestor component by name.
    pub fn check_excluded(&self, path: &Path) -> (bool, Option<String>) {
        let resolved = match path.canonicalize() {
            Ok(p) => p,
            Err(_) => {
                if path.exists() {
                    return (true, Some("<symlink-resolution-failed>".to_string()));
                }
                path.to_path_buf()
            }
        };

        let file_name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        for (raw, compiled) in &self.patterns {
            if raw.ends_with('/') {
                let dir_name = raw.trim_end_matches('/');
                if resolved
                    .components()
                    .any(|c| c.as_os_str().to_string_lossy() == dir_name)
                {
                    return (true, Some(raw.clone()));
                }
                continue;
            }

            if compiled.matches(&file_name) || compiled.matches(&resolved.to_string_lossy()) {
                return (true, Some(raw.clone()));
            }
        }

        (false, None)
    }
}
