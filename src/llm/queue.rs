//! Failed-request queue (component C): a bounded, persistent FIFO of
//! `LLMQueueItem`s, one JSON file per host.
//!
//! Grounded on `examples/original_source/src/queue/models.py` for the item
//! shape, and on `mdm/utils.rs::write_atomic` for crash-safe persistence.

use crate::error::GraphitiError;
use crate::mdm::utils::write_atomic;
use crate::models::{LLMOperation, LLMQueueItem};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct QueueFile {
    items: Vec<LLMQueueItem>,
}

pub struct FailedRequestQueue {
    path: std::path::PathBuf,
    max_size: usize,
    ttl_hours: u64,
}

impl FailedRequestQueue {
    pub fn new(path: std::path::PathBuf, max_size: usize, ttl_hours: u64) -> Self {
        Self {
            path,
            max_size,
            ttl_hours,
        }
    }

    fn load(&self) -> Result<QueueFile, GraphitiError> {
        if !self.path.exists() {
            return Ok(QueueFile::default());
        }
        let data = std::fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(QueueFile::default());
        }
        Ok(serde_json::from_str(&data)?)
    }

    fn save(&self, file: &QueueFile) -> Result<(), GraphitiError> {
        write_atomic(&self.path, serde_json::to_vec_pretty(file)?.as_slice())
    }

    /// Enqueue one failed request. Evicts the oldest item when over
    /// `max_size`; overflow is the caller's responsibility to log.
    pub fn enqueue(
        &self,
        operation: LLMOperation,
        params: serde_json::Value,
        original_error: &str,
    ) -> Result<String, GraphitiError> {
        let mut file = self.load()?;
        let id = uuid::Uuid::new_v4().to_string();
        file.items.push(LLMQueueItem {
            id: id.clone(),
            operation,
            params,
            timestamp: now_secs(),
            original_error: original_error.to_string(),
        });
        while file.items.len() > self.max_size {
            file.items.remove(0);
        }
        self.save(&file)?;
        Ok(id)
    }

    fn is_expired(&self, item: &LLMQueueItem) -> bool {
        let age_hours = (now_secs() - item.timestamp) / 3600.0;
        age_hours > self.ttl_hours as f64
    }

    /// Dequeue every item, calling `processor(operation, params)`. Items the
    /// processor returns `Ok` for are removed; items it returns `Err` for
    /// are re-queued with `original_error` updated. TTL-expired items are
    /// dropped without processing. Returns `(processed, failed, expired)`.
    pub fn drain<F>(&self, mut processor: F) -> Result<(usize, usize, usize), GraphitiError>
    where
        F: FnMut(LLMOperation, &serde_json::Value) -> Result<(), String>,
    {
        let file = self.load()?;
        let mut remaining = Vec::new();
        let (mut processed, mut failed, mut expired) = (0, 0, 0);

        for mut item in file.items {
            if self.is_expired(&item) {
                expired += 1;
                continue;
            }
            match processor(item.operation, &item.params) {
                Ok(()) => processed += 1,
                Err(e) => {
                    item.original_error = e;
                    remaining.push(item);
                    failed += 1;
                }
            }
        }

        self.save(&QueueFile { items: remaining })?;
        Ok((processed, failed, expired))
    }

    pub fn len(&self) -> Result<usize, GraphitiError> {
        Ok(self.load()?.items.len())
    }
}

pub fn queue_path_for(dir: &Path, host: &str) -> std::path::PathBuf {
    dir.join(format!("llm-queue-{host}.json"))
}
