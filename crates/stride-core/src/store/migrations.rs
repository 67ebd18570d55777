//! Local store schema migrations

use crate::error::Result;
use crate::models::Collection;
use rusqlite::Connection;

use super::schema;

/// Current schema version
pub const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
pub fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// DDL creating one collection table and its expression indices
fn collection_statements(collection: Collection) -> Vec<String> {
    let table = collection.name();
    let mut statements = vec![format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            local_id TEXT PRIMARY KEY,
            document TEXT NOT NULL
        )"
    )];

    statements.extend(schema::indices(collection).iter().map(|index| {
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{name} ON {table}(json_extract(document, '{path}'))",
            name = index.name,
            path = index.key_path,
        )
    }));

    statements
}

/// Migration to version 1: every collection with its secondary indices
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        )",
        [],
    )?;

    for collection in Collection::ALL {
        for statement in collection_statements(collection) {
            tx.execute(&statement, [])?;
        }
    }

    tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
    tx.commit()?;

    tracing::info!("Migrated local store to version 1");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    fn object_exists(conn: &Connection, kind: &str, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2)",
            [kind, name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_migrations() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migrations_idempotent() {
        let mut conn = setup();
        run(&mut conn).unwrap();
        run(&mut conn).unwrap(); // Should not fail

        let version = get_version(&conn).unwrap();
        assert_eq!(version, CURRENT_VERSION);
    }

    #[test]
    fn test_migration_v1_creates_collections_and_indices() {
        let mut conn = setup();
        run(&mut conn).unwrap();

        for collection in Collection::ALL {
            assert!(object_exists(&conn, "table", collection.name()));
        }
        assert!(object_exists(&conn, "index", "idx_cravings_by_owner"));
        assert!(object_exists(&conn, "index", "idx_sync_queue_by_synced"));
        assert!(object_exists(&conn, "index", "idx_sync_queue_by_local_id"));
    }
}
