//! Background worker: pulls batches from the job store, runs sequential
//! jobs synchronously and parallel batches on a bounded pool, retries with
//! exponential backoff, and dead-letters exhausted jobs (spec §4.H).

use super::storage::JobStore;
use crate::error::GraphitiError;
use crate::models::{Job, JobPayload};
use std::path::Path;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_POOL_SIZE: usize = 4;
pub const BASE_BACKOFF_SECS: u64 = 10;

/// Handler for one structured job type. Returns `Ok(())` on success or an
/// error string the worker records as `last_error`.
pub type JobHandler = dyn Fn(&JobPayload) -> Result<(), String> + Send + Sync;

/// Cooperative stop signal: checked between jobs and during backoff sleeps.
#[derive(Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Sleep for `dur`, checking the stop flag in small slices so a stop
    /// request interrupts the wait promptly.
    fn interruptible_sleep(&self, dur: Duration) {
        let step = Duration::from_millis(100);
        let mut remaining = dur;
        while remaining > Duration::ZERO {
            if self.is_stopped() {
                return;
            }
            let slice = remaining.min(step);
            std::thread::sleep(slice);
            remaining = remaining.saturating_sub(slice);
        }
    }
}

/// Dispatch one job: structured payloads call the handler directly; the
/// generic `CliReplay` payload reconstructs and runs a CLI subprocess.
pub fn dispatch_job(payload: &JobPayload, current_exe: &Path) -> Result<(), String> {
    match payload {
        JobPayload::CliReplay { command, args, kwargs } => {
            let mut cmd = Command::new(current_exe);
            cmd.arg(command);
            cmd.args(args);
            if let Some(obj) = kwargs.as_object() {
                for (key, value) in obj {
                    cmd.arg(format!("--{key}"));
                    if let Some(s) = value.as_str() {
                        cmd.arg(s);
                    } else {
                        cmd.arg(value.to_string());
                    }
                }
            }
            let status = cmd.status().map_err(|e| e.to_string())?;
            if status.success() {
                Ok(())
            } else {
                Err(format!("cli replay exited with status {status}"))
            }
        }
        other => Err(format!(
            "no in-process handler registered for structured job {:?}; pass a handler to run_batch",
            other
        )),
    }
}

/// Run one batch to completion: a lone sequential job runs synchronously;
/// a parallel batch runs on a bounded thread pool (default size 4) and
/// waits for every sibling regardless of individual failures.
pub fn run_batch<F>(batch: Vec<Job>, max_retries: u32, pool_size: usize, stop: &StopSignal, handler: F) -> Vec<(String, Result<(), String>)>
where
    F: Fn(&JobPayload) -> Result<(), String> + Send + Sync,
{
    if batch.len() <= 1 {
        return batch
            .iter()
            .map(|job| (job.id.clone(), handler(&job.payload)))
            .collect();
    }

    let handler = Arc::new(handler);
    let results: Arc<std::sync::Mutex<Vec<(String, Result<(), String>)>>> =
        Arc::new(std::sync::Mutex::new(Vec::new()));

    let mut remaining = batch;
    while !remaining.is_empty() {
        let chunk: Vec<Job> = remaining.drain(..remaining.len().min(pool_size)).collect();
        let mut handles = Vec::new();
        for job in chunk {
            let handler = handler.clone();
            let results = results.clone();
            handles.push(std::thread::spawn(move || {
                let outcome = handler(&job.payload);
                results.lock().unwrap().push((job.id.clone(), outcome));
            }));
        }
        for h in handles {
            let _ = h.join();
        }
        if stop.is_stopped() {
            break;
        }
    }

    Arc::try_unwrap(results).unwrap().into_inner().unwrap()
}

/// Apply one job's outcome: ack on success; on failure, nack and sleep the
/// exponential backoff (interruptible) before the caller loops back to
/// `get_batch`, or dead-letter once `max_retries` is exhausted.
pub fn apply_outcome(
    store: &mut JobStore,
    job_id: &str,
    outcome: Result<(), String>,
    max_retries: u32,
    stop: &StopSignal,
) -> Result<(), GraphitiError> {
    match outcome {
        Ok(()) => store.ack(job_id),
        Err(error) => {
            let attempts = store.nack(job_id, &error)?;
            if attempts >= max_retries {
                store.dead_letter(job_id, &error)?;
            } else {
                let backoff = Duration::from_secs(BASE_BACKOFF_SECS * 2u64.pow(attempts.saturating_sub(1)));
                stop.interruptible_sleep(backoff);
            }
            Ok(())
        }
    }
}
