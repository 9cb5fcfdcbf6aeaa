//! Minimal episode store backing `add`/`search`/`list`/`show`/`delete`.
//!
//! The graph engine itself (the actual node/edge/community graph) is out of
//! scope for this crate — the CLI's CRUD surface persists episodes the same
//! way the capture pipeline emits them (`name`, `body`, `reference_time`,
//! `group_id`), grounded on `jobqueue/storage.rs`'s rusqlite WAL/migration
//! pattern. `search` is a substring match over `name`/`body`; `list`/`show`/
//! `delete` route through this same table (open question #4).

use crate::capture::EpisodeHandle;
use crate::error::GraphitiError;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA_VERSION: i64 = 1;

const MIGRATIONS: &[&str] = &[r#"
CREATE TABLE episodes (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    body TEXT NOT NULL,
    reference_time INTEGER NOT NULL,
    group_id TEXT NOT NULL
);
"#];

#[derive(Debug, Clone, serde::Serialize)]
pub struct Episode {
    pub id: String,
    pub name: String,
    pub body: String,
    pub reference_time: i64,
    pub group_id: String,
}

pub struct GraphStore {
    conn: Connection,
}

impl GraphStore {
    pub fn open(path: &Path) -> Result<Self, GraphitiError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let mut store = Self { conn };
        store.initialize_schema()?;
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

    /// Store a ready-made episode (from the capture pipeline or a direct
    /// `add`), returning its generated id.
    pub fn add_episode(&self, episode: &EpisodeHandle) -> Result<String, GraphitiError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO episodes (id, name, body, reference_time, group_id) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, episode.name, episode.body, episode.reference_time, episode.group_id],
        )?;
        Ok(id)
    }

    fn row_to_episode(row: &rusqlite::Row) -> rusqlite::Result<Episode> {
        Ok(Episode {
            id: row.get("id")?,
            name: row.get("name")?,
            body: row.get("body")?,
            reference_time: row.get("reference_time")?,
            group_id: row.get("group_id")?,
        })
    }

    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<Episode>, GraphitiError> {
        let pattern = format!("%{query}%");
        let mut stmt = self.conn.prepare(
            "SELECT id, name, body, reference_time, group_id FROM episodes
             WHERE name LIKE ?1 OR body LIKE ?1 ORDER BY reference_time DESC LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![pattern, limit as i64], Self::row_to_episode)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(GraphitiError::from)
    }

    pub fn list(&self, limit: usize) -> Result<Vec<Episode>, GraphitiError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, body, reference_time, group_id FROM episodes ORDER BY reference_time DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_episode)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(GraphitiError::from)
    }

    pub fn show(&self, id: &str) -> Result<Option<Episode>, GraphitiError> {
        self.conn
            .query_row(
                "SELECT id, name, body, reference_time, group_id FROM episodes WHERE id = ?1",
                params![id],
                Self::row_to_episode,
            )
            .optional()
            .map_err(GraphitiError::from)
    }

    pub fn delete(&self, id: &str) -> Result<bool, GraphitiError> {
        let changed = self.conn.execute("DELETE FROM episodes WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    pub fn count(&self) -> Result<i64, GraphitiError> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM episodes", [], |r| r.get(0))?)
    }

    /// Drop exact-body duplicates, keeping the most recent episode of each
    /// set. Returns the number of rows removed.
    pub fn compact(&self) -> Result<usize, GraphitiError> {
        let removed = self.conn.execute(
            "DELETE FROM episodes WHERE id NOT IN (
                 SELECT id FROM (
                     SELECT id, ROW_NUMBER() OVER (
                         PARTITION BY body ORDER BY reference_time DESC
                     ) AS rn FROM episodes
                 ) WHERE rn = 1
             )",
            [],
        )?;
        Ok(removed)
    }
}
