//! `mcp install`: register this binary as a stdio MCP server in
//! `~/.claude.json`, grounded on `hooks/claude_settings.rs`'s load-merge-
//! write-atomic pattern (and on `original_source/src/mcp_server/install.py`
//! for the target file and entry shape).

use crate::error::GraphitiError;
use crate::mdm::utils::{home_dir, write_atomic};
use serde_json::{json, Value};
use std::path::PathBuf;

fn config_path() -> PathBuf {
    home_dir().join(".claude.json")
}

fn load(path: &PathBuf) -> Result<Value, GraphitiError> {
    if !path.exists() {
        return Ok(json!({}));
    }
    let raw = std::fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    Ok(serde_json::from_str(&raw)?)
}

/// Write the `mcpServers.graphiti` entry. Returns `false` (no-op) if an
/// entry already exists and `force` is not set.
pub fn install(current_exe: &std::path::Path, force: bool) -> Result<bool, GraphitiError> {
    let path = config_path();
    let mut settings = load(&path)?;
    if !settings.is_object() {
        settings = json!({});
    }

    let obj = settings.as_object_mut().unwrap();
    let servers = obj
        .entry("mcpServers")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .ok_or_else(|| GraphitiError::Generic("'mcpServers' key is not an object".to_string()))?;

    if servers.contains_key("graphiti") && !force {
        return Ok(false);
    }

    servers.insert(
        "graphiti".to_string(),
        json!({
            "command": current_exe.to_string_lossy(),
            "args": ["mcp", "serve"],
        }),
    );

    let serialized = serde_json::to_vec_pretty(&settings)?;
    write_atomic(&path, &serialized)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static HOME_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn install_writes_server_entry() {
        let _guard = HOME_LOCK.lock().unwrap();
        let temp = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var("HOME", temp.path());
        }
        let installed = install(std::path::Path::new("/usr/local/bin/graphiti"), false).unwrap();
        assert!(installed);
        let settings = load(&config_path()).unwrap();
        assert_eq!(settings["mcpServers"]["graphiti"]["args"][1], "serve");
        unsafe {
            std::env::remove_var("HOME");
        }
    }

    #[test]
    fn install_is_idempotent_without_force() {
        let _guard = HOME_LOCK.lock().unwrap();
        let temp = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var("HOME", temp.path());
        }
        install(std::path::Path::new("/usr/local/bin/graphiti"), false).unwrap();
        let second = install(std::path::Path::new("/usr/local/bin/graphiti"), false).unwrap();
        assert!(!second);
        unsafe {
            std::env::remove_var("HOME");
        }
    }
}
