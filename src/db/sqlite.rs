//! [`Connection`] over `rusqlite`.
//!
//! `rusqlite` is synchronous, so every call runs on tokio's blocking pool
//! against a connection shared behind `Arc<Mutex<_>>`. An interrupt handle is
//! kept outside the lock so a timed-out statement can be cancelled while it
//! still holds the connection.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::InterruptHandle;

use super::{Connection, DbError, DbResult, Row};

/// Open (or create) a SQLite database file with foreign keys enforced.
pub fn open_database(path: impl AsRef<Path>) -> DbResult<rusqlite::Connection> {
    let path = path.as_ref();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let conn = rusqlite::Connection::open(path)?;
    configure(&conn)?;

    tracing::debug!(path = %path.display(), "database opened");
    Ok(conn)
}

fn configure(conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    Ok(())
}

fn value_as_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

pub struct SqliteConnection {
    conn: Arc<Mutex<rusqlite::Connection>>,
    interrupt: InterruptHandle,
    database_name: Option<String>,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("database_name", &self.database_name)
            .finish_non_exhaustive()
    }
}

impl SqliteConnection {
    /// Wrap an already configured connection.
    pub fn new(conn: rusqlite::Connection) -> Self {
        let interrupt = conn.get_interrupt_handle();
        let database_name = conn
            .path()
            .filter(|p| !p.is_empty())
            .and_then(|p| Path::new(p).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned());
        Self {
            conn: Arc::new(Mutex::new(conn)),
            interrupt,
            database_name,
        }
    }

    /// Open a database file. See [`open_database`].
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_database(path)?))
    }

    /// A private in-memory database with foreign keys enforced.
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = rusqlite::Connection::open_in_memory()?;
        configure(&conn)?;
        Ok(Self::new(conn))
    }

    /// Run `f` against the underlying connection on the blocking pool.
    pub async fn call<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&rusqlite::Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| DbError::Poisoned)?;
            f(&guard).map_err(DbError::from)
        })
        .await?
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    fn database_name(&self) -> Option<String> {
        self.database_name.clone()
    }

    fn server_version(&self) -> Option<String> {
        Some(rusqlite::version().to_string())
    }

    async fn query(&mut self, sql: &str) -> DbResult<Vec<Row>> {
        let sql = sql.to_owned();
        self.call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let columns = stmt.column_count();
            let rows = stmt.query_map([], |row| {
                let mut values = Vec::with_capacity(columns);
                for i in 0..columns {
                    values.push(value_as_text(row.get_ref(i)?));
                }
                Ok(Row(values))
            })?;
            rows.collect()
        })
        .await
    }

    async fn execute(&mut self, sql: &str) -> DbResult<()> {
        let sql = sql.to_owned();
        self.call(move |conn| conn.execute_batch(&sql)).await
    }

    async fn begin(&mut self) -> DbResult<()> {
        self.call(|conn| {
            // Left open by a call that was abandoned after a timeout.
            if !conn.is_autocommit() {
                tracing::warn!("discarding a transaction left open by an abandoned call");
                conn.execute_batch("ROLLBACK")?;
            }
            conn.execute_batch("BEGIN")
        })
        .await
    }

    async fn commit(&mut self) -> DbResult<()> {
        self.call(|conn| conn.execute_batch("COMMIT")).await
    }

    async fn rollback(&mut self) -> DbResult<()> {
        // Some errors (interrupts among them) already end the transaction.
        self.call(|conn| {
            if conn.is_autocommit() {
                Ok(())
            } else {
                conn.execute_batch("ROLLBACK")
            }
        })
        .await
    }

    fn cancel(&self) {
        self.interrupt.interrupt();
    }
}
