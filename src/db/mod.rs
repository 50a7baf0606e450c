//! The database connection boundary.
//!
//! The orchestrator only needs four capabilities from a connection: run a
//! query returning rows, run a statement batch, and begin/commit/roll back a
//! transaction. [`Connection`] captures exactly that; [`SqliteConnection`]
//! implements it over `rusqlite`. Other engines plug in by implementing the
//! trait over their own driver.

pub mod sqlite;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use sqlite::{open_database, SqliteConnection};

/// Errors raised by a [`Connection`].
#[derive(Error, Debug)]
pub enum DbError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("statement timed out after {0:?}")]
    Timeout(Duration),

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("connection lock poisoned")]
    Poisoned,

    #[error("row has no value in column {column}")]
    MissingColumn { column: usize },

    /// Failure reported by a non-SQLite driver.
    #[error("{0}")]
    Driver(String),
}

pub type DbResult<T> = std::result::Result<T, DbError>;

/// One result row, every value rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row(pub Vec<Option<String>>);

impl Row {
    pub fn new(values: Vec<Option<String>>) -> Self {
        Self(values)
    }

    /// Nullable column.
    pub fn get_opt(&self, column: usize) -> Option<&str> {
        self.0.get(column).and_then(|v| v.as_deref())
    }

    /// Non-null column.
    pub fn get(&self, column: usize) -> DbResult<&str> {
        self.get_opt(column)
            .ok_or(DbError::MissingColumn { column })
    }
}

/// An open, authenticated database connection.
#[async_trait]
pub trait Connection: Send {
    /// Name of the connected database, if the driver knows it.
    fn database_name(&self) -> Option<String>;

    /// Version string reported by the server, e.g. `"15.00.2000"`.
    fn server_version(&self) -> Option<String>;

    async fn query(&mut self, sql: &str) -> DbResult<Vec<Row>>;

    /// Execute one or more statements that return no rows.
    async fn execute(&mut self, sql: &str) -> DbResult<()>;

    async fn begin(&mut self) -> DbResult<()>;

    async fn commit(&mut self) -> DbResult<()>;

    async fn rollback(&mut self) -> DbResult<()>;

    /// Ask the server to abandon whatever statement is in flight. Called after
    /// a timeout, before rolling back.
    fn cancel(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_distinguishes_null_from_missing() {
        let row = Row::new(vec![None, Some("Orders".into())]);
        assert_eq!(row.get_opt(0), None);
        assert_eq!(row.get(1).unwrap(), "Orders");
        assert!(matches!(row.get(0), Err(DbError::MissingColumn { column: 0 })));
        assert!(matches!(row.get(5), Err(DbError::MissingColumn { column: 5 })));
    }
}
