//! Shared harness for the black-box CLI tests: spawn the `graphiti` binary
//! against an isolated `$HOME` (so global state never touches the real
//! `~/.graphiti`) and, where needed, an isolated project directory.

use assert_cmd::Command;
use std::path::Path;
use tempfile::TempDir;

pub struct Harness {
    pub home: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self { home: TempDir::new().expect("tempdir") }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("graphiti").expect("graphiti binary");
        cmd.env("HOME", self.home.path());
        cmd.env_remove("GRAPHITI_PROJECT_ROOT");
        cmd
    }

    /// A command with the project scope pinned at `root` via the same
    /// env override `scope::find_project_root` checks first.
    pub fn cmd_in(&self, root: &Path) -> Command {
        let mut cmd = self.cmd();
        cmd.env("GRAPHITI_PROJECT_ROOT", root);
        cmd
    }
}

/// Initialize a throwaway git repo with one committed file, large enough
/// to clear the indexer's tiny-commit quality gate but small enough to
/// stay under the oversized-diff summarization threshold (no LLM call).
pub fn init_repo_with_commit(dir: &Path) {
    run_git(dir, &["init"]);
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
    let lines: String = (0..20).map(|n| format!("line {n}\n")).collect();
    std::fs::write(dir.join("notes.txt"), lines).unwrap();
    run_git(dir, &["add", "notes.txt"]);
    run_git(dir, &["commit", "-m", "add notes"]);
}

fn run_git(dir: &Path, args: &[&str]) {
    let status = std::process::Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git available");
    assert!(status.success(), "git {args:?} failed");
}
