//! Subprocess helpers for dispatching CLI operations and firing detached
//! background work, grounded on `commands/flush_cas.rs`'s
//! `spawn_background_cas_flush` (the teacher's one existing
//! detached-subprocess pattern) plus `capture/git_capture.rs`'s
//! channel-based hard-timeout wrapper.

use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

/// Run `graphiti <args> --format json` as a subprocess, bounded by
/// `timeout`, returning stdout on success. All of the child's stderr is
/// swallowed (it's operational logging, not protocol output).
pub fn run_cli(current_exe: &std::path::Path, args: &[&str], timeout: Duration) -> Result<String, String> {
    let mut full_args: Vec<&str> = args.to_vec();
    full_args.push("--format");
    full_args.push("json");

    let mut child = Command::new(current_exe)
        .args(&full_args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn graphiti CLI: {e}"))?;

    let (tx, rx) = mpsc::channel();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    std::thread::spawn(move || {
        use std::io::Read;
        let mut out = String::new();
        let mut err = String::new();
        if let Some(mut s) = stdout {
            let _ = s.read_to_string(&mut out);
        }
        if let Some(mut s) = stderr {
            let _ = s.read_to_string(&mut err);
        }
        let _ = tx.send((out, err));
    });

    match rx.recv_timeout(timeout) {
        Ok((out, err)) => match child.wait() {
            Ok(status) if status.success() => Ok(out),
            Ok(_) => Err(if err.is_empty() { out } else { err }),
            Err(e) => Err(format!("failed to wait on graphiti CLI: {e}")),
        },
        Err(_) => {
            let _ = child.kill();
            Err(format!("graphiti CLI call timed out after {:?}", timeout))
        }
    }
}

/// Spawn `graphiti <args>` detached: no inherited stdio, caller does not
/// wait. Used for background re-index and async capture.
pub fn spawn_detached(current_exe: &std::path::Path, args: &[&str]) {
    let result = Command::new(current_exe)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    if let Err(e) = result {
        tracing::warn!(error = %e, "failed to spawn detached graphiti subprocess");
    }
}
