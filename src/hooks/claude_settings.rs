//! `.claude/settings.json` Stop-hook management: unlike the shell hooks,
//! this is detected by substring match on the command field, not markers
//! (grounded on `original_source/src/hooks/installer.py`'s
//! `install_claude_hook`/`uninstall_claude_hook`).

use crate::error::GraphitiError;
use crate::mdm::utils::write_atomic;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

const COMMAND_MARKER: &str = "graphiti capture";

fn settings_path(project_root: &Path) -> std::path::PathBuf {
    project_root.join(".claude").join("settings.json")
}

fn load(path: &Path) -> Result<Value, GraphitiError> {
    if !path.exists() {
        return Ok(json!({}));
    }
    let raw = fs::read_to_string(path).map_err(GraphitiError::Io)?;
    serde_json::from_str(&raw).map_err(GraphitiError::Json)
}

fn stop_hook_matches(hook: &Value) -> bool {
    hook.get("command")
        .and_then(Value::as_str)
        .map(|c| c.contains(COMMAND_MARKER))
        .unwrap_or(false)
}

pub fn is_installed(project_root: &Path) -> bool {
    let Ok(settings) = load(&settings_path(project_root)) else {
        return false;
    };
    settings["hooks"]["Stop"]
        .as_array()
        .map(|stops| stops.iter().any(stop_hook_matches))
        .unwrap_or(false)
}

pub fn install(project_root: &Path) -> Result<bool, GraphitiError> {
    let path = settings_path(project_root);
    let mut settings = load(&path)?;

    if !settings.is_object() {
        settings = json!({});
    }
    let obj = settings.as_object_mut().unwrap();
    let hooks = obj
        .entry("hooks")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| GraphitiError::Generic("'hooks' key is not an object".to_string()))?;
    let stop = hooks
        .entry("Stop")
        .or_insert_with(|| json!([]))
        .as_array_mut()
        .ok_or_else(|| GraphitiError::Generic("'hooks.Stop' key is not an array".to_string()))?;

    if stop.iter().any(stop_hook_matches) {
        return Ok(false);
    }

    stop.push(json!({
        "command": format!("{COMMAND_MARKER} --auto --transcript-path \"$transcript_path\" --session-id \"$session_id\""),
        "async": true,
        "timeout": 10
    }));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(GraphitiError::Io)?;
    }
    let serialized = serde_json::to_vec_pretty(&settings).map_err(GraphitiError::Json)?;
    write_atomic(&path, &serialized)?;
    Ok(true)
}

pub fn uninstall(project_root: &Path) -> Result<bool, GraphitiError> {
    let path = settings_path(project_root);
    if !path.exists() {
        return Ok(false);
    }
    let mut settings = load(&path)?;

    let Some(stop) = settings
        .get_mut("hooks")
        .and_then(|h| h.get_mut("Stop"))
        .and_then(Value::as_array_mut)
    else {
        return Ok(false);
    };

    let original_len = stop.len();
    stop.retain(|hook| !stop_hook_matches(hook));
    if stop.len() == original_len {
        return Ok(false);
    }

    if stop.is_empty()
        && let Some(hooks) = settings.get_mut("hooks").and_then(Value::as_object_mut)
    {
        hooks.remove("Stop");
        if hooks.is_empty() {
            settings.as_object_mut().unwrap().remove("hooks");
        }
    }

    let serialized = serde_json::to_vec_pretty(&settings).map_err(GraphitiError::Json)?;
    write_atomic(&path, &serialized)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn install_creates_settings_with_stop_hook() {
        let dir = tempdir().unwrap();
        let installed = install(dir.path()).unwrap();
        assert!(installed);
        assert!(is_installed(dir.path()));
    }

    #[test]
    fn install_is_idempotent() {
        let dir = tempdir().unwrap();
        install(dir.path()).unwrap();
        let second = install(dir.path()).unwrap();
        assert!(!second);
    }

    #[test]
    fn install_preserves_other_stop_hooks() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".claude")).unwrap();
        fs::write(
            settings_path(dir.path()),
            json!({"hooks": {"Stop": [{"command": "other-tool --notify"}]}}).to_string(),
        )
        .unwrap();
        install(dir.path()).unwrap();
        let settings = load(&settings_path(dir.path())).unwrap();
        let stop = settings["hooks"]["Stop"].as_array().unwrap();
        assert_eq!(stop.len(), 2);
    }

    #[test]
    fn uninstall_removes_only_graphiti_hook() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".claude")).unwrap();
        fs::write(
            settings_path(dir.path()),
            json!({"hooks": {"Stop": [{"command": "other-tool --notify"}]}}).to_string(),
        )
        .unwrap();
        install(dir.path()).unwrap();
        let removed = uninstall(dir.path()).unwrap();
        assert!(removed);
        let settings = load(&settings_path(dir.path())).unwrap();
        let stop = settings["hooks"]["Stop"].as_array().unwrap();
        assert_eq!(stop.len(), 1);
        assert_eq!(stop[0]["command"], "other-tool --notify");
    }

    #[test]
    fn uninstall_missing_file_returns_false() {
        let dir = tempdir().unwrap();
        assert!(!uninstall(dir.path()).unwrap());
    }
}
