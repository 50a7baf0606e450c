//! SQL dialect adapters.
//!
//! A [`DbAdapter`] renders the statement text the reset needs for one engine:
//! the metadata discovery queries, the ordered `DELETE` batch, the identity
//! reseed batch and, for engines with system-versioned tables, the
//! [`SystemVersioning`] toggles. The orchestrator treats everything rendered
//! here as opaque text.
//!
//! Discovery queries must return rows shaped as follows (NULL allowed where
//! marked `?`):
//!
//! | Query | Columns |
//! |-------|---------|
//! | tables | `schema?, name` |
//! | relationships | `parent_schema?, parent_name, child_schema?, child_name, constraint_name` |
//! | temporal tables | `schema?, name, history_name` |

pub mod mysql;
pub mod postgres;
pub mod sql_server;
pub mod sqlite;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::{Relationship, Table, TemporalTable};

pub use mysql::MySql;
pub use postgres::Postgres;
pub use sql_server::SqlServer;
pub use sqlite::Sqlite;

/// Inclusion and exclusion rules applied by the tables discovery query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    pub tables_to_ignore: Vec<String>,
    pub tables_to_include: Vec<String>,
    pub schemas_to_include: Vec<String>,
    pub schemas_to_exclude: Vec<String>,
}

/// Statement rendering for one database engine.
pub trait DbAdapter: Send + Sync + std::fmt::Debug {
    /// Short engine name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Quote a (possibly schema-qualified) table name.
    fn quote(&self, table: &Table) -> String;

    fn tables_query(&self, filter: &TableFilter) -> String;

    fn relationships_query(&self, filter: &TableFilter) -> String;

    /// Delete every row of `tables`, in the given order.
    fn delete_sql(&self, tables: &[Table]) -> String {
        tables
            .iter()
            .map(|t| format!("DELETE FROM {};", self.quote(t)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Reset identity or sequence generators of `tables` to their seed.
    fn reseed_sql(&self, tables: &[Table]) -> String;

    /// A query that returns at least one row when [`reseed_sql`](Self::reseed_sql)
    /// can run against the connected database. `None` when it always can.
    fn reseed_check_query(&self) -> Option<String> {
        None
    }

    /// Delete every row of `tables` while the `suspended` constraints are not
    /// enforced. `None` when the engine has no way to do that.
    fn suspended_delete_sql(&self, _tables: &[Table], _suspended: &[Relationship]) -> Option<String> {
        None
    }

    /// Temporal-table support, if the engine has any.
    fn versioning(&self) -> Option<&dyn SystemVersioning> {
        None
    }
}

/// Suspending and resuming system versioning on temporal tables.
pub trait SystemVersioning: Send + Sync {
    /// Whether a server reporting `server_version` has temporal tables.
    fn supported_by(&self, server_version: Option<&str>) -> bool;

    fn temporal_tables_query(&self, filter: &TableFilter) -> String;

    fn suspend_sql(&self, tables: &[TemporalTable]) -> String;

    fn resume_sql(&self, tables: &[TemporalTable]) -> String;
}

/// The built-in adapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "sql_server")]
    SqlServer,
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[default]
    #[serde(rename = "sqlite")]
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SqlServer => "sql_server",
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    pub fn adapter(&self) -> Arc<dyn DbAdapter> {
        match self {
            Self::SqlServer => Arc::new(SqlServer),
            Self::Postgres => Arc::new(Postgres),
            Self::MySql => Arc::new(MySql),
            Self::Sqlite => Arc::new(Sqlite),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sql_server" | "sqlserver" | "mssql" => Ok(Self::SqlServer),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "mysql" => Ok(Self::MySql),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(format!("unknown dialect: {s}")),
        }
    }
}

/// Render `items` as a comma-separated list of SQL string literals.
pub(crate) fn string_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| format!("'{}'", s.replace('\'', "''")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render the filter as `AND ...` predicates over the given columns.
/// Schema rules are skipped when the engine has no schema column.
pub(crate) fn filter_predicates(
    filter: &TableFilter,
    schema_column: Option<&str>,
    table_column: &str,
) -> String {
    let mut sql = String::new();
    if !filter.tables_to_ignore.is_empty() {
        sql.push_str(&format!(
            " AND {table_column} NOT IN ({})",
            string_list(&filter.tables_to_ignore)
        ));
    }
    if !filter.tables_to_include.is_empty() {
        sql.push_str(&format!(
            " AND {table_column} IN ({})",
            string_list(&filter.tables_to_include)
        ));
    }
    if let Some(schema_column) = schema_column {
        if !filter.schemas_to_exclude.is_empty() {
            sql.push_str(&format!(
                " AND {schema_column} NOT IN ({})",
                string_list(&filter.schemas_to_exclude)
            ));
        }
        if !filter.schemas_to_include.is_empty() {
            sql.push_str(&format!(
                " AND {schema_column} IN ({})",
                string_list(&filter.schemas_to_include)
            ));
        }
    }
    sql
}

/// Child tables of `relationships`, deduplicated, in first-seen order.
pub(crate) fn distinct_children(relationships: &[Relationship]) -> Vec<&Table> {
    let mut children: Vec<&Table> = Vec::new();
    for rel in relationships {
        if !children.contains(&&rel.child) {
            children.push(&rel.child);
        }
    }
    children
}
