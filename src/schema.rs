//! Schema metadata records.
//!
//! Defines [`Table`] (a node in the dependency graph), [`Relationship`] (a
//! foreign key from a child table to its parent) and [`TemporalTable`] (a
//! system-versioned table paired with its history table). All three are
//! immutable snapshots taken when the reset plan is built.

use serde::{Deserialize, Serialize};

/// A table identified by an optional schema and a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Table {
    pub schema: Option<String>,
    pub name: String,
}

impl Table {
    pub fn new(schema: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.map(str::to_owned),
            name: name.into(),
        }
    }

    /// A table without a schema (SQLite, or engines with a single namespace).
    pub fn unqualified(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A foreign key: rows of `child` reference rows of `parent`.
///
/// Equality covers the constraint name too, so two constraints between the
/// same pair of tables are distinct records. The graph builder collapses
/// them into a single edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub parent: Table,
    pub child: Table,
    pub name: Option<String>,
}

impl Relationship {
    pub fn new(parent: Table, child: Table, name: Option<&str>) -> Self {
        Self {
            parent,
            child,
            name: name.map(str::to_owned),
        }
    }

    /// `true` when the table references itself.
    pub fn is_self_reference(&self) -> bool {
        self.parent == self.child
    }
}

impl std::fmt::Display for Relationship {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.child, self.parent)?;
        if let Some(name) = &self.name {
            write!(f, " ({name})")?;
        }
        Ok(())
    }
}

/// A table with system-managed row history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalTable {
    pub schema: Option<String>,
    pub name: String,
    pub history_table: String,
}

impl TemporalTable {
    pub fn new(
        schema: Option<&str>,
        name: impl Into<String>,
        history_table: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.map(str::to_owned),
            name: name.into(),
            history_table: history_table.into(),
        }
    }

    /// The versioned table itself, as a graph node.
    pub fn table(&self) -> Table {
        Table {
            schema: self.schema.clone(),
            name: self.name.clone(),
        }
    }

    /// The paired history table, which lives in the same schema.
    pub fn history(&self) -> Table {
        Table {
            schema: self.schema.clone(),
            name: self.history_table.clone(),
        }
    }
}
