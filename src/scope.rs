//! Scope/path selector (component K): resolves global vs project scope and
//! the on-disk paths that follow from it.

use crate::error::GraphitiError;
use crate::mdm::utils::home_dir;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Global,
    Project,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Project => "project",
        }
    }
}

/// Walk parents of `start_dir` (or the current directory) looking for a
/// `.git` entry. Returns the directory containing it, or `None`.
pub fn find_project_root(start_dir: Option<&Path>) -> Option<PathBuf> {
    if let Ok(over) = std::env::var("GRAPHITI_PROJECT_ROOT")
        && !over.is_empty()
    {
        return Some(PathBuf::from(over));
    }

    let start = match start_dir {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().ok()?,
    };

    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if dir.join(".git").exists() {
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

/// Resolve global vs project scope for an operation.
///
/// `prefer_project` is the caller's request (e.g. `--project` on the CLI, or
/// the default for capture/index operations invoked from inside a repo).
/// Operations that are inherently global (config, some queue operations)
/// pass `prefer_project = false` unconditionally from the call site.
pub fn determine_scope(prefer_project: bool, start_dir: Option<&Path>) -> (Scope, Option<PathBuf>) {
    if !prefer_project {
        return (Scope::Global, None);
    }
    match find_project_root(start_dir) {
        Some(root) => (Scope::Project, Some(root)),
        None => (Scope::Global, None),
    }
}

/// Root of all graphiti state: `~/.graphiti` for global scope, or
/// `<project_root>/.graphiti` for project scope.
pub fn state_root(scope: Scope, project_root: Option<&Path>) -> PathBuf {
    match scope {
        Scope::Global => home_dir().join(".graphiti"),
        Scope::Project => project_root
            .map(|r| r.join(".graphiti"))
            .unwrap_or_else(|| home_dir().join(".graphiti")),
    }
}

pub fn graph_db_path(scope: Scope, project_root: Option<&Path>) -> PathBuf {
    match scope {
        Scope::Global => state_root(scope, project_root).join("global").join("graph.db"),
        Scope::Project => state_root(scope, project_root).join("graph.db"),
    }
}

/// Global-only paths (these always live under `~/.graphiti`, regardless of
/// the scope of the operation that consults them): LLM config, cooldown
/// state, failed-request queue, job queue, pending-commits, conversation
/// capture metadata, and the global audit log.
pub fn global_root() -> PathBuf {
    home_dir().join(".graphiti")
}

pub fn llm_config_path() -> PathBuf {
    global_root().join("llm.toml")
}

pub fn llm_state_path() -> PathBuf {
    global_root().join("llm_state.json")
}

pub fn llm_queue_dir() -> PathBuf {
    global_root().join("llm_queue")
}

pub fn job_queue_dir() -> PathBuf {
    global_root().join("job_queue")
}

pub fn pending_commits_path() -> PathBuf {
    global_root().join("pending_commits")
}

pub fn capture_metadata_path() -> PathBuf {
    global_root().join("capture_metadata.json")
}

pub fn audit_log_path(scope: Scope, project_root: Option<&Path>) -> PathBuf {
    state_root(scope, project_root).join("audit.log")
}

pub fn index_state_path(project_root: &Path) -> PathBuf {
    project_root.join(".graphiti").join("index-state.json")
}

pub fn allowlist_path(project_root: &Path) -> PathBuf {
    project_root.join(".graphiti").join("allowlist.json")
}

/// Ensure the directory backing `path` exists.
pub fn ensure_parent(path: &Path) -> Result<(), GraphitiError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn find_project_root_walks_up_to_git_dir() {
        let temp = TempDir::new().unwrap();
        let repo_root = temp.path().join("repo");
        let nested = repo_root.join("src").join("inner");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::create_dir_all(repo_root.join(".git")).unwrap();

        unsafe {
            std::env::remove_var("GRAPHITI_PROJECT_ROOT");
        }
        let found = find_project_root(Some(&nested)).unwrap();
        assert_eq!(found, repo_root);
    }

    #[test]
    #[serial]
    fn find_project_root_returns_none_without_git_dir() {
        let temp = TempDir::new().unwrap();
        unsafe {
            std::env::remove_var("GRAPHITI_PROJECT_ROOT");
        }
        assert!(find_project_root(Some(temp.path())).is_none());
    }

    #[test]
    #[serial]
    fn env_override_takes_precedence() {
        let temp = TempDir::new().unwrap();
        unsafe {
            std::env::set_var("GRAPHITI_PROJECT_ROOT", temp.path().to_str().unwrap());
        }
        let found = find_project_root(None).unwrap();
        assert_eq!(found, temp.path());
        unsafe {
            std::env::remove_var("GRAPHITI_PROJECT_ROOT");
        }
    }

    #[test]
    fn determine_scope_prefers_global_when_not_requested() {
        let (scope, root) = determine_scope(false, None);
        assert_eq!(scope, Scope::Global);
        assert!(root.is_none());
    }

    #[test]
    fn graph_db_path_differs_by_scope() {
        let project_root = PathBuf::from("/tmp/proj");
        let global = graph_db_path(Scope::Global, None);
        let project = graph_db_path(Scope::Project, Some(&project_root));
        assert_ne!(global, project);
        assert!(project.starts_with(&project_root));
    }
}
