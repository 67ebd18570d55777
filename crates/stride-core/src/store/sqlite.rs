//! SQLite-backed local store

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::{Mutex, MutexGuard, OnceCell};

use super::{migrations, schema, Document, IndexValue, LocalStore, WriteOp};
use crate::error::{Error, Result};
use crate::models::Collection;

#[derive(Debug, Clone)]
enum StoreLocation {
    File(PathBuf),
    Memory,
}

type ConnectionState = std::result::Result<Mutex<Connection>, String>;

/// Local store backed by one shared `SQLite` connection.
///
/// Each collection is a `(local_id, document)` table with expression indices
/// over the JSON fields declared in [`schema`]. The connection is opened and
/// migrated lazily by the first operation; concurrent callers wait for the
/// same initialization, and an initialization failure is cached so every
/// later call fails with [`Error::StoreUnavailable`].
pub struct SqliteStore {
    location: StoreLocation,
    conn: OnceCell<ConnectionState>,
}

impl SqliteStore {
    /// Create a store for the database file at `path`, opened on first use
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            conn: OnceCell::new(),
        }
    }

    /// Create an in-memory store, opened on first use
    pub fn new_in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            conn: OnceCell::new(),
        }
    }

    /// Open the database file at `path`, creating and migrating it if needed
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(path);
        store.initialize().await?;
        Ok(store)
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let store = Self::new_in_memory();
        store.initialize().await?;
        Ok(store)
    }

    /// Wait for initialization to finish
    pub async fn initialize(&self) -> Result<()> {
        self.connection().await.map(drop)
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        match &self.location {
            StoreLocation::File(path) => Some(path),
            StoreLocation::Memory => None,
        }
    }

    /// Schema version recorded in the database
    pub async fn schema_version(&self) -> Result<i32> {
        let conn = self.connection().await?;
        migrations::get_version(&conn)
    }

    async fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        let state = self
            .conn
            .get_or_init(|| Self::open_connection(self.location.clone()))
            .await;

        match state {
            Ok(conn) => Ok(conn.lock().await),
            Err(message) => Err(Error::StoreUnavailable(message.clone())),
        }
    }

    async fn open_connection(location: StoreLocation) -> ConnectionState {
        match tokio::task::spawn_blocking(move || Self::open_blocking(&location)).await {
            Ok(Ok(conn)) => Ok(Mutex::new(conn)),
            Ok(Err(error)) => {
                tracing::error!("Failed to initialize local store: {error}");
                Err(error.to_string())
            }
            Err(join_error) => Err(format!("store initialization task failed: {join_error}")),
        }
    }

    fn open_blocking(location: &StoreLocation) -> Result<Connection> {
        let mut conn = match location {
            StoreLocation::File(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent)?;
                    }
                }
                let conn = Connection::open(path)?;
                configure(&conn);
                tracing::debug!("Opened local store at {}", path.display());
                conn
            }
            StoreLocation::Memory => Connection::open_in_memory()?,
        };

        migrations::run(&mut conn)?;
        Ok(conn)
    }

    #[cfg(test)]
    pub(crate) async fn execute_raw(&self, sql: &str) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(sql, [])?;
        Ok(())
    }
}

/// Configure `SQLite` for a single long-lived local connection
fn configure(conn: &Connection) {
    // Best effort: unsupported pragmas must not block opening the store
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
        row.get::<_, String>(0)
    })
    .ok();
    conn.pragma_update(None, "synchronous", "NORMAL").ok();
    conn.busy_timeout(Duration::from_secs(5)).ok();
}

fn parse_document(raw: &str) -> Result<Document> {
    Ok(serde_json::from_str(raw)?)
}

fn to_sql_value(value: &IndexValue) -> SqlValue {
    match value {
        IndexValue::Text(text) => SqlValue::Text(text.clone()),
        IndexValue::Integer(number) => SqlValue::Integer(*number),
        // json_extract yields 1/0 for JSON booleans
        IndexValue::Bool(flag) => SqlValue::Integer(i64::from(*flag)),
    }
}

fn put_document(
    conn: &Connection,
    collection: Collection,
    local_id: &str,
    document: &Document,
) -> Result<()> {
    let sql = format!(
        "INSERT INTO {table} (local_id, document) VALUES (?1, ?2)
         ON CONFLICT(local_id) DO UPDATE SET document = excluded.document",
        table = collection.name()
    );
    conn.execute(&sql, params![local_id, serde_json::to_string(document)?])?;
    Ok(())
}

fn delete_document(conn: &Connection, collection: Collection, local_id: &str) -> Result<()> {
    let sql = format!("DELETE FROM {} WHERE local_id = ?1", collection.name());
    conn.execute(&sql, params![local_id])?;
    Ok(())
}

fn query_documents(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Document>> {
    let mut stmt = conn.prepare(sql)?;
    let raw = stmt
        .query_map(params, |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    raw.iter().map(|document| parse_document(document)).collect()
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn get(&self, collection: Collection, local_id: &str) -> Result<Option<Document>> {
        let conn = self.connection().await?;
        let sql = format!(
            "SELECT document FROM {} WHERE local_id = ?1",
            collection.name()
        );
        let raw: Option<String> = conn
            .query_row(&sql, params![local_id], |row| row.get(0))
            .optional()?;

        raw.as_deref().map(parse_document).transpose()
    }

    async fn get_all(&self, collection: Collection) -> Result<Vec<Document>> {
        let conn = self.connection().await?;
        let sql = format!(
            "SELECT document FROM {} ORDER BY rowid",
            collection.name()
        );
        query_documents(&conn, &sql, [])
    }

    async fn get_all_by_index(
        &self,
        collection: Collection,
        index: &str,
        value: &IndexValue,
    ) -> Result<Vec<Document>> {
        let index_def = schema::find_index(collection, index).ok_or_else(|| {
            Error::InvalidInput(format!("unknown index '{index}' on {collection}"))
        })?;

        let conn = self.connection().await?;
        let sql = format!(
            "SELECT document FROM {table}
             WHERE json_extract(document, '{path}') = ?1
             ORDER BY rowid",
            table = collection.name(),
            path = index_def.key_path,
        );
        query_documents(&conn, &sql, params![to_sql_value(value)])
    }

    async fn put(&self, collection: Collection, local_id: &str, document: &Document) -> Result<()> {
        let conn = self.connection().await?;
        put_document(&conn, collection, local_id, document)
    }

    async fn delete(&self, collection: Collection, local_id: &str) -> Result<()> {
        let conn = self.connection().await?;
        delete_document(&conn, collection, local_id)
    }

    async fn clear(&self, collection: Collection) -> Result<()> {
        let conn = self.connection().await?;
        conn.execute(&format!("DELETE FROM {}", collection.name()), [])?;
        Ok(())
    }

    async fn apply(&self, batch: Vec<WriteOp>) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection().await?;
        let tx = conn.transaction()?;
        for op in &batch {
            match op {
                WriteOp::Put {
                    collection,
                    local_id,
                    document,
                } => put_document(&tx, *collection, local_id, document)?,
                WriteOp::Delete {
                    collection,
                    local_id,
                } => delete_document(&tx, *collection, local_id)?,
            }
        }
        tx.commit()?;
        Ok(())
    }
}
