use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::db::SymbolDatabase;
use super::schema::init_schema;
use super::{IndexError, Result, SymbolKind, TagRecord};

/// Type alias for connection pool
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// A source file read during a walk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    pub content_hash: String,
    pub tag_count: usize,
}

/// On-disk snapshot of a parsed `SymbolDatabase`.
#[derive(Clone)]
pub struct SymbolStore {
    pool: ConnectionPool,
    db_path: PathBuf,
}

impl SymbolStore {
    /// Create or open a store
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        info!("Opening symbol store at: {}", db_path.display());

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder().max_size(4).build(manager)?;

        {
            let conn = pool.get()?;
            init_schema(&conn)?;
        }

        Ok(Self { pool, db_path })
    }

    /// Open a store that a previous `index` run must have written.
    pub fn open_existing(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref();
        if !db_path.exists() {
            return Err(IndexError::MissingIndex(db_path.to_path_buf()));
        }
        Self::open(db_path)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn get_conn(&self) -> Result<r2d2::PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Replace the stored snapshot with `db` and the sources it came from.
    pub fn save(&self, db: &SymbolDatabase, sources: &[SourceFile]) -> Result<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = chrono::Utc::now().timestamp();

        tx.execute("DELETE FROM tags", [])?;
        tx.execute("DELETE FROM files", [])?;
        tx.execute("DELETE FROM sources", [])?;

        {
            let mut insert_tag = tx.prepare(
                "INSERT INTO tags (key, name, file, line, kind) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (key, tag) in db.iter() {
                insert_tag.execute(params![
                    key,
                    tag.name,
                    tag.file,
                    tag.line,
                    tag.kind.letter().to_string(),
                ])?;
            }

            let mut insert_file = tx.prepare("INSERT INTO files (position, name) VALUES (?1, ?2)")?;
            for (position, name) in db.spin_files().iter().enumerate() {
                insert_file.execute(params![position as i64, name])?;
            }

            let mut insert_source = tx.prepare(
                "INSERT OR REPLACE INTO sources (path, content_hash, last_indexed, tag_count)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for source in sources {
                insert_source.execute(params![
                    source.path,
                    source.content_hash,
                    now,
                    source.tag_count as i64,
                ])?;
            }
        }

        tx.execute(
            "INSERT OR REPLACE INTO index_meta (key, value, updated_at)
             VALUES ('last_full_index', ?1, CURRENT_TIMESTAMP)",
            [now.to_string()],
        )?;

        tx.commit()?;

        debug!("Saved {} tags and {} files", db.len(), db.spin_files().len());
        Ok(())
    }

    /// Rebuild the database exactly as it was saved.
    pub fn load(&self) -> Result<SymbolDatabase> {
        let conn = self.get_conn()?;
        let mut db = SymbolDatabase::new();

        let mut stmt = conn.prepare("SELECT key, name, file, line, kind FROM tags ORDER BY key")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (key, name, file, line, letter) in rows {
            match letter.chars().next().and_then(SymbolKind::from_letter) {
                Some(kind) => {
                    db.insert(key, TagRecord::new(name, file, line, kind));
                }
                None => debug!("Skipping stored tag {} with unknown kind {:?}", key, letter),
            }
        }

        let mut stmt = conn.prepare("SELECT name FROM files ORDER BY position")?;
        let files = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for file in files {
            db.push_spin_file(file);
        }

        Ok(db)
    }

    /// Source files recorded by the last save, sorted by path.
    pub fn sources(&self) -> Result<Vec<SourceFile>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT path, content_hash, tag_count FROM sources ORDER BY path")?;
        let sources = stmt
            .query_map([], |row| {
                Ok(SourceFile {
                    path: row.get(0)?,
                    content_hash: row.get(1)?,
                    tag_count: row.get::<_, i64>(2)? as usize,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    /// Tag counts per kind letter, largest first.
    pub fn counts_by_kind(&self) -> Result<Vec<(String, usize)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT kind, COUNT(*) as count FROM tags GROUP BY kind ORDER BY count DESC, kind",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO index_meta (key, value, updated_at)
             VALUES (?1, ?2, CURRENT_TIMESTAMP)",
            params![key, value],
        )?;
        Ok(())
    }

    pub fn meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row("SELECT value FROM index_meta WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }
}
