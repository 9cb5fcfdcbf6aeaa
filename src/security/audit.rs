//! Append-only NDJSON audit log with size-based rotation (spec §4.A).
//!
//! Grounded on the teacher's metrics persistence style in `metrics/db.rs`
//! (one well-known state file under the project/global root) combined with
//! plain append-only logging, since no example repo carries a dedicated
//! audit-log crate; rotation mirrors common `tracing-appender` rolling-file
//! conventions without adding that dependency, since the default here is a
//! fixed-size byte threshold rather than time-based rolling.

use crate::error::GraphitiError;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_BACKUPS: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent<'a> {
    pub timestamp: chrono::DateTime<Utc>,
    pub event: &'a str,
    pub detail: serde_json::Value,
}

/// Append one NDJSON line, rotating first if the log would exceed
/// `max_bytes`. Rotation renames `path` -> `path.1`, shifting existing
/// numbered backups up to `max_backups`.
pub fn append(
    path: &Path,
    event: &str,
    detail: serde_json::Value,
) -> Result<(), GraphitiError> {
    append_with_limits(path, event, detail, DEFAULT_MAX_BYTES, DEFAULT_MAX_BACKUPS)
}

pub fn append_with_limits(
    path: &Path,
    event: &str,
    detail: serde_json::Value,
    max_bytes: u64,
    max_backups: u32,
) -> Result<(), GraphitiError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    if let Ok(meta) = fs::metadata(path) {
        if meta.len() >= max_bytes {
            rotate(path, max_backups)?;
        }
    }

    let record = AuditEvent {
        timestamp: Utc::now(),
        event,
        detail,
    };
    let mut line = serde_json::to_string(&record)?;
    line.push('\n');

    let mut file: File = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())?;
    Ok(())
}

fn rotate(path: &Path, max_backups: u32) -> Result<(), GraphitiError> {
    if max_backups == 0 {
        fs::remove_file(path).ok();
        return Ok(());
    }

    let oldest = backup_path(path, max_backups);
    if oldest.exists() {
        fs::remove_file(&oldest).ok();
    }

    let mut n = max_backups;
    while n > 1 {
        let from = backup_path(path, n - 1);
        let to = backup_path(path, n);
        if from.exists() {
            fs::rename(&from, &to)?;
        }
        n -= 1;
    }

    fs::rename(path, backup_path(path, 1))?;
    Ok(())
}

fn backup_path(path: &Path, n: u32) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    name.push_str(&format!(".{n}"));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn appends_ndjson_lines() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.ndjson");
        append(&path, "secret_detected", serde_json::json!({"n": 1})).unwrap();
        append(&path, "secret_allowlisted", serde_json::json!({"n": 2})).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "secret_detected");
    }

    #[test]
    fn rotates_when_over_size_limit() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("audit.ndjson");
        append_with_limits(&path, "first", serde_json::json!({}), 1, 3).unwrap();
        append_with_limits(&path, "second", serde_json::json!({}), 1, 3).unwrap();
        assert!(path.with_file_name("audit.ndjson.1").exists());
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("second"));
    }
}
