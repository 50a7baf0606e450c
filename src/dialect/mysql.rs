//! MySQL and MariaDB.

use super::{filter_predicates, DbAdapter, TableFilter};
use crate::schema::{Relationship, Table};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySql;

fn backtick(ident: &str) -> String {
    format!("`{}`", ident.replace('`', "``"))
}

impl DbAdapter for MySql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote(&self, table: &Table) -> String {
        match &table.schema {
            Some(schema) => format!("{}.{}", backtick(schema), backtick(&table.name)),
            None => backtick(&table.name),
        }
    }

    fn tables_query(&self, filter: &TableFilter) -> String {
        format!(
            "SELECT t.TABLE_SCHEMA, t.TABLE_NAME FROM information_schema.tables t \
             WHERE t.TABLE_TYPE = 'BASE TABLE' \
             AND t.TABLE_SCHEMA NOT IN ('mysql', 'information_schema', 'performance_schema', 'sys'){} \
             ORDER BY t.TABLE_SCHEMA, t.TABLE_NAME",
            filter_predicates(filter, Some("t.TABLE_SCHEMA"), "t.TABLE_NAME")
        )
    }

    fn relationships_query(&self, _filter: &TableFilter) -> String {
        "SELECT DISTINCT k.REFERENCED_TABLE_SCHEMA, k.REFERENCED_TABLE_NAME, \
         k.TABLE_SCHEMA, k.TABLE_NAME, k.CONSTRAINT_NAME \
         FROM information_schema.KEY_COLUMN_USAGE k \
         WHERE k.REFERENCED_TABLE_NAME IS NOT NULL \
         ORDER BY k.TABLE_SCHEMA, k.TABLE_NAME, k.CONSTRAINT_NAME"
            .to_string()
    }

    fn reseed_sql(&self, tables: &[Table]) -> String {
        tables
            .iter()
            .map(|t| format!("ALTER TABLE {} AUTO_INCREMENT = 1;", self.quote(t)))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn suspended_delete_sql(&self, tables: &[Table], _suspended: &[Relationship]) -> Option<String> {
        Some(format!(
            "SET FOREIGN_KEY_CHECKS = 0;\n{}\nSET FOREIGN_KEY_CHECKS = 1;",
            self.delete_sql(tables)
        ))
    }
}
