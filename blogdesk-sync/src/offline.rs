//! Offline draft persistence.
//!
//! Drafts are keyed by [`EntryKey`]: saving a draft for a key replaces any
//! previous one, so an entry never has more than one pending copy.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use blogdesk_types::{EntryKey, EntryOption, OfflineEntry, StoredFiles};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Local store of entries waiting to be sent.
#[async_trait]
pub trait OfflineStore: Send + Sync {
    /// Returns the draft stored for `key`, if any.
    async fn get(&self, key: &EntryKey) -> SyncResult<Option<OfflineEntry>>;

    /// Inserts or replaces the draft for `entry.key`.
    async fn save(&self, entry: &OfflineEntry) -> SyncResult<()>;

    /// Removes the draft for `key`. Missing drafts are not an error.
    async fn delete(&self, key: &EntryKey) -> SyncResult<()>;

    /// All stored drafts, oldest first.
    async fn list(&self) -> SyncResult<Vec<OfflineEntry>>;

    /// Folder where the attachments of `key` are staged.
    fn folder_path(&self, key: &EntryKey) -> PathBuf;
}

/// SQLite-backed draft store.
pub struct SqliteOfflineStore {
    conn: Arc<Mutex<Connection>>,
    files_root: PathBuf,
}

impl SqliteOfflineStore {
    /// Opens (or creates) a store at `path`; attachment folders live under
    /// `files_root`.
    pub fn open(path: impl AsRef<Path>, files_root: impl Into<PathBuf>) -> SyncResult<Self> {
        let conn = Connection::open(path)
            .map_err(|e| SyncError::Storage(format!("failed to open offline store: {e}")))?;
        Self::with_connection(conn, files_root.into())
    }

    /// Opens an in-memory store (for testing).
    pub fn open_in_memory(files_root: impl Into<PathBuf>) -> SyncResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SyncError::Storage(format!("failed to open in-memory offline store: {e}")))?;
        Self::with_connection(conn, files_root.into())
    }

    fn with_connection(conn: Connection, files_root: PathBuf) -> SyncResult<Self> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS offline_entries (
                key TEXT PRIMARY KEY,
                created INTEGER NOT NULL,
                subject TEXT NOT NULL,
                summary TEXT NOT NULL,
                summary_format INTEGER NOT NULL,
                options TEXT NOT NULL,
                attachments TEXT,
                last_modified INTEGER NOT NULL
            );
            ",
        )
        .map_err(|e| SyncError::Storage(format!("failed to init offline schema: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            files_root,
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> SyncResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> SyncResult<T> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().unwrap_or_else(|e| e.into_inner());
            f(&conn)
        })
        .await
        .map_err(|e| SyncError::Storage(format!("offline store task failed: {e}")))?
    }
}

const SELECT_COLUMNS: &str =
    "SELECT key, created, subject, summary, summary_format, options, attachments, last_modified FROM offline_entries";

type RawRow = (String, i64, String, String, i32, String, Option<String>, i64);

fn read_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
    ))
}

fn decode(raw: RawRow) -> SyncResult<OfflineEntry> {
    let (key, created, subject, summary, summary_format, options, attachments, last_modified) = raw;
    let key: EntryKey = key
        .parse()
        .map_err(|e| SyncError::Storage(format!("invalid key in offline store: {e}")))?;
    let options: Vec<EntryOption> = serde_json::from_str(&options)?;
    let attachments: Option<StoredFiles> = attachments
        .as_deref()
        .map(|s| serde_json::from_str(s))
        .transpose()?;

    Ok(OfflineEntry {
        key,
        created,
        subject,
        summary,
        summary_format,
        options,
        attachments,
        last_modified,
    })
}

#[async_trait]
impl OfflineStore for SqliteOfflineStore {
    async fn get(&self, key: &EntryKey) -> SyncResult<Option<OfflineEntry>> {
        let key = key.to_string();
        let raw = self
            .with_conn(move |conn| {
                let sql = format!("{SELECT_COLUMNS} WHERE key = ?1");
                Ok(conn.query_row(&sql, params![key], read_row).optional()?)
            })
            .await?;
        raw.map(decode).transpose()
    }

    async fn save(&self, entry: &OfflineEntry) -> SyncResult<()> {
        let key = entry.key.to_string();
        let options = serde_json::to_string(&entry.options)?;
        let attachments = entry
            .attachments
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let entry = entry.clone();

        debug!("Saving offline draft {}", key);
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT OR REPLACE INTO offline_entries
                    (key, created, subject, summary, summary_format, options, attachments, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    key,
                    entry.created,
                    entry.subject,
                    entry.summary,
                    entry.summary_format,
                    options,
                    attachments,
                    entry.last_modified,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, key: &EntryKey) -> SyncResult<()> {
        let key = key.to_string();
        debug!("Deleting offline draft {}", key);
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM offline_entries WHERE key = ?1", params![key])?;
            Ok(())
        })
        .await
    }

    async fn list(&self) -> SyncResult<Vec<OfflineEntry>> {
        let raws = self
            .with_conn(|conn| {
                let sql = format!("{SELECT_COLUMNS} ORDER BY created ASC, key ASC");
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], read_row)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(rows)
            })
            .await?;
        raws.into_iter().map(decode).collect()
    }

    fn folder_path(&self, key: &EntryKey) -> PathBuf {
        self.files_root
            .join("blog")
            .join("entries")
            .join(key.to_string())
    }
}
