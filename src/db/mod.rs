//! Search tracking store backed by SQLite
use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;
use tracing::info;

pub mod logs;
pub mod models;
pub mod queries;
pub mod results;

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS search_query (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    criteria TEXT NOT NULL,
    created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    status TEXT DEFAULT 'pending',
    user_id INTEGER
);

CREATE INDEX IF NOT EXISTS idx_query_criteria ON search_query(criteria);
CREATE INDEX IF NOT EXISTS idx_query_status ON search_query(status);

CREATE TABLE IF NOT EXISTS search_result_raw (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_query_id INTEGER NOT NULL,
    source TEXT NOT NULL,
    raw_json TEXT,
    collected_at DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (search_query_id) REFERENCES search_query(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_raw_query ON search_result_raw(search_query_id);
CREATE INDEX IF NOT EXISTS idx_raw_source ON search_result_raw(source);

CREATE TABLE IF NOT EXISTS search_result_structured (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_result_raw_id INTEGER NOT NULL,
    category TEXT,
    title TEXT,
    date_found DATE,
    applicant TEXT,
    summary TEXT,
    structured_json TEXT,
    FOREIGN KEY (search_result_raw_id) REFERENCES search_result_raw(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_structured_raw ON search_result_structured(search_result_raw_id);

CREATE TABLE IF NOT EXISTS search_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    search_query_id INTEGER NOT NULL,
    log_msg TEXT,
    log_time DATETIME DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (search_query_id) REFERENCES search_query(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_log_query ON search_log(search_query_id);
"#;

/// Errors surfaced by the store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("payload serialization failed: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A wrapper around a SQLite connection initialized with the application schema.
pub struct Db {
    pub(crate) conn: Connection,
}

impl Db {
    /// Open a database connection at the given path and initialize the schema.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        info!("Initializing database: {}", path.display());

        let conn = Connection::open(path)?;
        configure(&conn)?;
        conn.execute_batch(SCHEMA_SQL)?;

        info!("Database initialized successfully");

        Ok(Self { conn })
    }

    /// Open an in-memory database connection (useful for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }
}

/// Cascade deletes depend on foreign_keys being ON for every connection.
fn configure(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA foreign_keys = ON;",
    )
}
