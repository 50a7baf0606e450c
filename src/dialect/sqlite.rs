//! SQLite.
//!
//! SQLite has no schemas in the sense the other engines do, so discovered
//! tables are unqualified and the schema rules of a [`TableFilter`] are
//! ignored. Reseeding clears `sqlite_sequence`, which only exists once some
//! table has been declared `AUTOINCREMENT`. Discovery checks for it first and
//! skips the reseed when it is missing; plain `INTEGER PRIMARY KEY` tables
//! restart at 1 on their own once empty.

use super::{filter_predicates, string_list, DbAdapter, TableFilter};
use crate::schema::{Relationship, Table};

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

fn double_quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl DbAdapter for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote(&self, table: &Table) -> String {
        match &table.schema {
            Some(schema) => format!("{}.{}", double_quote(schema), double_quote(&table.name)),
            None => double_quote(&table.name),
        }
    }

    fn tables_query(&self, filter: &TableFilter) -> String {
        format!(
            "SELECT NULL, name FROM pragma_table_list \
             WHERE schema = 'main' AND type = 'table' AND name NOT LIKE 'sqlite_%'{} \
             ORDER BY name",
            filter_predicates(filter, None, "name")
        )
    }

    fn relationships_query(&self, _filter: &TableFilter) -> String {
        // Parent names are resolved through sqlite_master because a
        // REFERENCES clause may spell the table in a different case.
        "SELECT DISTINCT NULL, p.name, NULL, m.name, 'fk_' || m.name || '_' || fk.id \
         FROM sqlite_master m \
         INNER JOIN pragma_foreign_key_list(m.name) fk \
         INNER JOIN sqlite_master p ON p.type = 'table' AND p.name = fk.\"table\" COLLATE NOCASE \
         WHERE m.type = 'table' \
         ORDER BY 4, 5"
            .to_string()
    }

    fn reseed_sql(&self, tables: &[Table]) -> String {
        if tables.is_empty() {
            return String::new();
        }
        let names: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
        format!(
            "DELETE FROM sqlite_sequence WHERE name IN ({});",
            string_list(&names)
        )
    }

    /// `sqlite_sequence` is created with the first `AUTOINCREMENT` table.
    /// Without it there is no counter to reset.
    fn reseed_check_query(&self) -> Option<String> {
        Some(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'"
                .to_string(),
        )
    }

    /// Foreign keys are checked at commit instead of per statement, so a
    /// cycle emptied inside the same transaction commits cleanly.
    fn suspended_delete_sql(&self, tables: &[Table], _suspended: &[Relationship]) -> Option<String> {
        Some(format!(
            "PRAGMA defer_foreign_keys = ON;\n{}",
            self.delete_sql(tables)
        ))
    }
}
