//! Marker-delimited git hook install/uninstall/upgrade (spec §4.J), grounded
//! on `original_source/src/hooks/installer.py`'s generalized `_install_hook`/
//! `_uninstall_hook`/`upgrade_postmerge_hook` helpers.

use super::templates::{full_template, section_for, HOOK_END_MARKER, HOOK_START_MARKER};
use crate::error::GraphitiError;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Legacy marker text from pre-rewrite hooks; any hook containing one of
/// these gets unconditionally stripped and reinstalled by `upgrade`.
const LEGACY_INDICATORS: &[&str] = &["auto_heal", "autoheal", "journal"];

fn hook_path(repo: &Path, hook_type: &str) -> PathBuf {
    repo.join(".git").join("hooks").join(hook_type)
}

pub fn is_installed(repo: &Path, hook_type: &str) -> bool {
    let path = hook_path(repo, hook_type);
    match fs::read_to_string(&path) {
        Ok(content) => content.contains(HOOK_START_MARKER),
        Err(_) => false,
    }
}

/// Install non-destructively: new file from template if missing, no-op if
/// already installed, append-with-spacing if a foreign hook exists.
pub fn install(repo: &Path, hook_type: &str) -> Result<bool, GraphitiError> {
    if !repo.join(".git").is_dir() {
        return Err(GraphitiError::Generic(format!(
            "not a git repository: {}",
            repo.display()
        )));
    }

    if is_installed(repo, hook_type) {
        return Ok(false);
    }

    let path = hook_path(repo, hook_type);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(GraphitiError::Io)?;
    }

    let new_content = if path.exists() {
        let existing = fs::read_to_string(&path).map_err(GraphitiError::Io)?;
        format!("{}\n\n{}", existing.trim_end(), section_for(hook_type))
    } else {
        full_template(hook_type)
    };

    fs::write(&path, new_content).map_err(GraphitiError::Io)?;
    set_executable(&path)?;
    Ok(true)
}

#[cfg(unix)]
fn set_executable(path: &Path) -> Result<(), GraphitiError> {
    let mut perms = fs::metadata(path).map_err(GraphitiError::Io)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).map_err(GraphitiError::Io)
}

#[cfg(not(unix))]
fn set_executable(_path: &Path) -> Result<(), GraphitiError> {
    Ok(())
}

/// Strip the marker section out of `content`. Returns `None` if no markers
/// are present. Handles repeated sections (pre-upgrade hooks with more than
/// one stale block).
fn strip_sections(content: &str) -> Option<String> {
    if !content.contains(HOOK_START_MARKER) {
        return None;
    }

    let mut remaining = content.to_string();
    while let Some(start_idx) = remaining.find(HOOK_START_MARKER) {
        let Some(end_idx) = remaining[start_idx..].find(HOOK_END_MARKER).map(|i| i + start_idx) else {
            remaining = remaining[..start_idx].trim_end().to_string();
            break;
        };
        let end_line_end = remaining[end_idx..]
            .find('\n')
            .map(|i| end_idx + i + 1)
            .unwrap_or(remaining.len());

        let before = remaining[..start_idx].trim_end();
        let after = remaining[end_line_end..].trim_start();
        remaining = if after.is_empty() {
            before.to_string()
        } else {
            format!("{before}\n\n{after}")
        };
    }

    Some(remaining.trim().to_string())
}

/// Remove the graphiti section; delete the file entirely if nothing of
/// substance remains (bare shebang or empty).
pub fn uninstall(repo: &Path, hook_type: &str) -> Result<bool, GraphitiError> {
    if !is_installed(repo, hook_type) {
        return Ok(false);
    }

    let path = hook_path(repo, hook_type);
    let content = fs::read_to_string(&path).map_err(GraphitiError::Io)?;
    let Some(remaining) = strip_sections(&content) else {
        return Ok(false);
    };

    if remaining.is_empty() || remaining == "#!/bin/sh" || remaining == "#!/bin/bash" {
        fs::remove_file(&path).map_err(GraphitiError::Io)?;
    } else {
        fs::write(&path, format!("{remaining}\n")).map_err(GraphitiError::Io)?;
    }

    Ok(true)
}

/// If the installed hook carries a legacy marker (pre-rewrite graphiti
/// section), strip it and reinstall the current template.
pub fn upgrade(repo: &Path, hook_type: &str) -> Result<bool, GraphitiError> {
    let path = hook_path(repo, hook_type);
    if !path.exists() {
        install(repo, hook_type)?;
        return Ok(true);
    }

    let content = fs::read_to_string(&path).map_err(GraphitiError::Io)?;
    if !content.contains(HOOK_START_MARKER) {
        return Ok(true);
    }

    let is_legacy = LEGACY_INDICATORS.iter().any(|ind| content.contains(ind));
    if !is_legacy {
        return Ok(true);
    }

    let remaining = strip_sections(&content).unwrap_or_default();
    if remaining.is_empty() || remaining == "#!/bin/sh" || remaining == "#!/bin/bash" {
        fs::remove_file(&path).map_err(GraphitiError::Io)?;
    } else {
        fs::write(&path, format!("{remaining}\n")).map_err(GraphitiError::Io)?;
    }

    install(repo, hook_type)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn init_repo() -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".git").join("hooks")).unwrap();
        dir
    }

    #[test]
    fn install_creates_new_hook_file() {
        let dir = init_repo();
        let installed = install(dir.path(), "post-commit").unwrap();
        assert!(installed);
        assert!(is_installed(dir.path(), "post-commit"));
    }

    #[test]
    fn install_is_idempotent() {
        let dir = init_repo();
        install(dir.path(), "post-commit").unwrap();
        let second = install(dir.path(), "post-commit").unwrap();
        assert!(!second);
    }

    #[test]
    fn install_appends_to_foreign_hook() {
        let dir = init_repo();
        let path = hook_path(dir.path(), "pre-commit");
        fs::write(&path, "#!/bin/sh\necho 'custom'\n").unwrap();
        install(dir.path(), "pre-commit").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("echo 'custom'"));
        assert!(content.contains(HOOK_START_MARKER));
    }

    #[test]
    fn uninstall_removes_file_when_only_graphiti_content() {
        let dir = init_repo();
        install(dir.path(), "post-commit").unwrap();
        let removed = uninstall(dir.path(), "post-commit").unwrap();
        assert!(removed);
        assert!(!hook_path(dir.path(), "post-commit").exists());
    }

    #[test]
    fn uninstall_preserves_foreign_content() {
        let dir = init_repo();
        let path = hook_path(dir.path(), "pre-commit");
        fs::write(&path, "#!/bin/sh\necho 'custom'\n").unwrap();
        install(dir.path(), "pre-commit").unwrap();
        uninstall(dir.path(), "pre-commit").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("echo 'custom'"));
        assert!(!content.contains(HOOK_START_MARKER));
    }

    #[test]
    fn upgrade_strips_legacy_marker_section() {
        let dir = init_repo();
        let path = hook_path(dir.path(), "post-merge");
        fs::write(
            &path,
            format!("#!/bin/sh\n{HOOK_START_MARKER}\nauto_heal --replay-journal\n{HOOK_END_MARKER}\n"),
        )
        .unwrap();
        upgrade(dir.path(), "post-merge").unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("auto_heal"));
        assert!(content.contains(HOOK_START_MARKER));
    }
}
