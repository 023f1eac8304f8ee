use rusqlite::{Connection, Result};
use tracing::{debug, info};

/// SQLite schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema
pub fn init_schema(conn: &Connection) -> Result<()> {
    debug!("Initializing spintags schema v{}", SCHEMA_VERSION);

    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    let current_version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    debug!("Current schema version: {}", current_version);

    if current_version < SCHEMA_VERSION {
        info!("Upgrading schema from v{} to v{}", current_version, SCHEMA_VERSION);
        apply_migrations(conn, current_version)?;
    }

    Ok(())
}

/// Apply migrations from current version to latest
fn apply_migrations(conn: &Connection, from_version: i32) -> Result<()> {
    for version in (from_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration v{}", version);
        match version {
            1 => create_v1_schema(conn)?,
            _ => unreachable!("Unknown schema version: {}", version),
        }

        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [version],
        )?;
    }

    Ok(())
}

fn create_v1_schema(conn: &Connection) -> Result<()> {
    // One row per database entry, keyed by the hierarchical key
    conn.execute(
        "CREATE TABLE IF NOT EXISTS tags (
            key TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            file TEXT NOT NULL,
            line TEXT NOT NULL,
            kind TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tags_kind
         ON tags(kind)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_tags_name
         ON tags(name)",
        [],
    )?;

    // Object file list in discovery order
    conn.execute(
        "CREATE TABLE IF NOT EXISTS files (
            position INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    // Every source file the walk read
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sources (
            path TEXT PRIMARY KEY,
            content_hash TEXT NOT NULL,
            last_indexed INTEGER NOT NULL,
            tag_count INTEGER NOT NULL DEFAULT 0
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    info!("v1 schema created successfully");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_init_schema() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert!(tables.contains(&"tags".to_string()));
        assert!(tables.contains(&"files".to_string()));
        assert!(tables.contains(&"sources".to_string()));
        assert!(tables.contains(&"schema_version".to_string()));
    }

    #[test]
    fn test_idempotent_init() {
        let conn = Connection::open_in_memory().unwrap();

        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let version: i32 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
            .unwrap();

        assert_eq!(version, 1);
    }
}
