//! SQLite-backed job store + dead-letter table (component H persistence).
//!
//! Grounded on `metrics/db.rs`: WAL-mode connection, `SCHEMA_VERSION`/
//! `MIGRATIONS` array applied in order, fast-path version check.

use crate::error::GraphitiError;
use crate::models::{DeadLetterJob, Job, JobPayload, JobStatus};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

const SCHEMA_VERSION: i64 = 1;

const MIGRATIONS: &[&str] = &[r#"
CREATE TABLE jobs (
    id TEXT PRIMARY KEY,
    job_type TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    parallel INTEGER NOT NULL,
    created_at REAL NOT NULL,
    status TEXT NOT NULL,
    attempts INTEGER NOT NULL DEFAULT 0,
    last_error TEXT,
    position INTEGER NOT NULL
);
CREATE TABLE dead_letter_jobs (
    id TEXT PRIMARY KEY,
    job_type TEXT NOT NULL,
    payload_json TEXT NOT NULL,
    parallel INTEGER NOT NULL,
    created_at REAL NOT NULL,
    failed_at REAL NOT NULL,
    final_error TEXT NOT NULL,
    retry_count INTEGER NOT NULL
);
"#];

pub fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

pub struct JobStore {
    conn: Connection,
    next_position: i64,
}

impl JobStore {
    pub fn open(path: &Path) -> Result<Self, GraphitiError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL; PRAGMA foreign_keys=ON;",
        )?;
        let mut store = Self {
            conn,
            next_position: 0,
        };
        store.initialize_schema()?;
        store.next_position = store.max_position()? + 1;
        Ok(store)
    }

    fn initialize_schema(&mut self) -> Result<(), GraphitiError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS schema_metadata (version INTEGER NOT NULL)",
            [],
        )?;
        let current: i64 = self
            .conn
            .query_row("SELECT version FROM schema_metadata LIMIT 1", [], |r| r.get(0))
            .optional()?
            .unwrap_or(0);

        if current >= SCHEMA_VERSION {
            return Ok(());
        }

        for migration in &MIGRATIONS[current as usize..] {
            let tx = self.conn.transaction()?;
            tx.execute_batch(migration)?;
            tx.execute("DELETE FROM schema_metadata", [])?;
            tx.execute("INSERT INTO schema_metadata (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.commit()?;
        }
        Ok(())
    }

    fn max_position(&self) -> Result<i64, GraphitiError> {
        Ok(self
            .conn
            .query_row("SELECT COALESCE(MAX(position), -1) FROM jobs", [], |r| r.get(0))?)
    }

    /// Accepts jobs unconditionally; returns the generated job id. Capacity
    /// warnings (80%/100% of `soft_cap`) are the caller's responsibility
    /// since they depend on a configured cap this store doesn't own.
    pub fn enqueue(&mut self, job_type: &str, payload: JobPayload, parallel: bool) -> Result<String, GraphitiError> {
        let id = uuid::Uuid::new_v4().to_string();
        let position = self.next_position;
        self.next_position += 1;
        self.conn.execute(
            "INSERT INTO jobs (id, job_type, payload_json, parallel, created_at, status, attempts, last_error, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7)",
            params![
                id,
                job_type,
                serde_json::to_string(&payload)?,
                parallel as i64,
                now_secs(),
                "pending",
                position
            ],
        )?;
        Ok(id)
    }

    pub fn pending_count(&self) -> Result<i64, GraphitiError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM jobs WHERE status = 'pending'", [], |r| r.get(0))?)
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let payload_json: String = row.get("payload_json")?;
        let payload: JobPayload = serde_json::from_str(&payload_json)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;
        let status_str: String = row.get("status")?;
        let status = match status_str.as_str() {
            "processing" => JobStatus::Processing,
            "failed" => JobStatus::Failed,
            "dead" => JobStatus::Dead,
            _ => JobStatus::Pending,
        };
        Ok(Job {
            id: row.get("id")?,
            job_type: row.get("job_type")?,
            payload,
            parallel: row.get::<_, i64>("parallel")? != 0,
            created_at: row.get("created_at")?,
            status,
            attempts: row.get::<_, i64>("attempts")? as u32,
            last_error: row.get("last_error")?,
        })
    }

    /// The `get_batch` scheduling rule: dequeue the first pending job; if it
    /// is sequential, return it alone; otherwise keep dequeuing subsequent
    /// parallel jobs up to `max_items`, stopping (without consuming) at the
    /// first sequential job encountered.
    pub fn get_batch(&mut self, max_items: usize) -> Result<Vec<Job>, GraphitiError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, job_type, payload_json, parallel, created_at, status, attempts, last_error, position
             FROM jobs WHERE status = 'pending' ORDER BY position ASC",
        )?;
        let all: Vec<Job> = stmt
            .query_map([], Self::row_to_job)?
            .collect::<Result<_, _>>()?;
        drop(stmt);

        if all.is_empty() {
            return Ok(Vec::new());
        }

        let first = &all[0];
        if !first.parallel {
            self.mark_processing(&first.id)?;
            return Ok(vec![first.clone()]);
        }

        let mut batch = Vec::new();
        for job in &all {
            if batch.len() >= max_items {
                break;
            }
            if !job.parallel {
                break;
            }
            batch.push(job.clone());
        }
        for job in &batch {
            self.mark_processing(&job.id)?;
        }
        Ok(batch)
    }

    fn mark_processing(&self, id: &str) -> Result<(), GraphitiError> {
        self.conn
            .execute("UPDATE jobs SET status = 'processing' WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Job succeeded: delete it.
    pub fn ack(&self, id: &str) -> Result<(), GraphitiError> {
        self.conn.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Job failed: increment attempts, record the error, and move to
    /// pending for a later retry (caller schedules the backoff sleep).
    pub fn nack(&self, id: &str, error: &str) -> Result<u32, GraphitiError> {
        self.conn.execute(
            "UPDATE jobs SET attempts = attempts + 1, last_error = ?2, status = 'pending' WHERE id = ?1",
            params![id, error],
        )?;
        let attempts: i64 = self
            .conn
            .query_row("SELECT attempts FROM jobs WHERE id = ?1", params![id], |r| r.get(0))?;
        Ok(attempts as u32)
    }

    /// Exhausted retries: atomically move the job to the dead-letter table.
    pub fn dead_letter(&mut self, id: &str, final_error: &str) -> Result<(), GraphitiError> {
        let job = {
            let mut stmt = self.conn.prepare(
                "SELECT id, job_type, payload_json, parallel, created_at, status, attempts, last_error, position
                 FROM jobs WHERE id = ?1",
            )?;
            stmt.query_row(params![id], Self::row_to_job)?
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO dead_letter_jobs (id, job_type, payload_json, parallel, created_at, failed_at, final_error, retry_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                job.id,
                job.job_type,
                serde_json::to_string(&job.payload)?,
                job.parallel as i64,
                job.created_at,
                now_secs(),
                final_error,
                job.attempts
            ],
        )?;
        tx.execute("DELETE FROM jobs WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(())
    }

    pub fn dead_letter_jobs(&self) -> Result<Vec<DeadLetterJob>, GraphitiError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, job_type, payload_json, parallel, created_at, failed_at, final_error, retry_count FROM dead_letter_jobs",
        )?;
        let rows = stmt.query_map([], |row| {
            let payload_json: String = row.get("payload_json")?;
            let payload: JobPayload = serde_json::from_str(&payload_json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e)))?;
            Ok(DeadLetterJob {
                id: row.get("id")?,
                job_type: row.get("job_type")?,
                payload,
                parallel: row.get::<_, i64>("parallel")? != 0,
                created_at: row.get("created_at")?,
                failed_at: row.get("failed_at")?,
                final_error: row.get("final_error")?,
                retry_count: row.get::<_, i64>("retry_count")? as u32,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(GraphitiError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn payload() -> JobPayload {
        JobPayload::IndexRepository {
            project_root: "/repo".into(),
            full: false,
        }
    }

    #[test]
    fn get_batch_returns_single_sequential_job_alone() {
        let temp = TempDir::new().unwrap();
        let mut store = JobStore::open(&temp.path().join("jobs.db")).unwrap();
        store.enqueue("index", payload(), false).unwrap();
        store.enqueue("index2", payload(), true).unwrap();
        let batch = store.get_batch(10).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(!batch[0].parallel);
    }

    #[test]
    fn get_batch_stops_at_sequential_boundary() {
        let temp = TempDir::new().unwrap();
        let mut store = JobStore::open(&temp.path().join("jobs.db")).unwrap();
        store.enqueue("a", payload(), true).unwrap();
        store.enqueue("b", payload(), true).unwrap();
        store.enqueue("c", payload(), false).unwrap();
        store.enqueue("d", payload(), true).unwrap();
        let batch = store.get_batch(10).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch.iter().all(|j| j.parallel));
    }

    #[test]
    fn nack_then_ack_removes_job_without_dead_letter() {
        let temp = TempDir::new().unwrap();
        let mut store = JobStore::open(&temp.path().join("jobs.db")).unwrap();
        let id = store.enqueue("a", payload(), false).unwrap();
        store.get_batch(10).unwrap();
        let attempts = store.nack(&id, "boom").unwrap();
        assert_eq!(attempts, 1);
        store.get_batch(10).unwrap();
        store.ack(&id).unwrap();
        assert_eq!(store.pending_count().unwrap(), 0);
        assert!(store.dead_letter_jobs().unwrap().is_empty());
    }

    #[test]
    fn exhausted_job_moves_to_dead_letter() {
        let temp = TempDir::new().unwrap();
        let mut store = JobStore::open(&temp.path().join("jobs.db")).unwrap();
        let id = store.enqueue("a", payload(), false).unwrap();
        store.dead_letter(&id, "exhausted").unwrap();
        let dead = store.dead_letter_jobs().unwrap();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].final_error, "exhausted");
    }
}
