//! PostgreSQL.

use super::{distinct_children, filter_predicates, DbAdapter, TableFilter};
use crate::schema::{Relationship, Table};

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

fn double_quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

impl DbAdapter for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote(&self, table: &Table) -> String {
        match &table.schema {
            Some(schema) => format!("{}.{}", double_quote(schema), double_quote(&table.name)),
            None => double_quote(&table.name),
        }
    }

    fn tables_query(&self, filter: &TableFilter) -> String {
        format!(
            "SELECT table_schema, table_name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' \
             AND table_schema NOT IN ('pg_catalog', 'information_schema'){} \
             ORDER BY table_schema, table_name",
            filter_predicates(filter, Some("table_schema"), "table_name")
        )
    }

    fn relationships_query(&self, _filter: &TableFilter) -> String {
        "SELECT pn.nspname, pc.relname, cn.nspname, cc.relname, con.conname \
         FROM pg_catalog.pg_constraint con \
         INNER JOIN pg_catalog.pg_class cc ON con.conrelid = cc.oid \
         INNER JOIN pg_catalog.pg_namespace cn ON cc.relnamespace = cn.oid \
         INNER JOIN pg_catalog.pg_class pc ON con.confrelid = pc.oid \
         INNER JOIN pg_catalog.pg_namespace pn ON pc.relnamespace = pn.oid \
         WHERE con.contype = 'f' \
         ORDER BY cn.nspname, cc.relname, con.conname"
            .to_string()
    }

    /// Restart every sequence owned by a column of `tables` (serial and
    /// identity columns alike) at its start value.
    fn reseed_sql(&self, tables: &[Table]) -> String {
        if tables.is_empty() {
            return String::new();
        }
        let regclasses = tables
            .iter()
            .map(|t| format!("'{}'::regclass", self.quote(t).replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "DO $$\n\
             DECLARE r record;\n\
             BEGIN\n\
             FOR r IN SELECT d.objid::regclass AS seq FROM pg_catalog.pg_depend d \
             INNER JOIN pg_catalog.pg_sequence s ON s.seqrelid = d.objid \
             WHERE d.refobjid IN ({regclasses}) AND d.deptype IN ('a', 'i') LOOP\n\
             EXECUTE format('ALTER SEQUENCE %s RESTART', r.seq);\n\
             END LOOP;\n\
             END $$;"
        )
    }

    fn suspended_delete_sql(&self, tables: &[Table], suspended: &[Relationship]) -> Option<String> {
        let children = distinct_children(suspended);
        let mut lines = Vec::new();
        for child in &children {
            lines.push(format!("ALTER TABLE {} DISABLE TRIGGER ALL;", self.quote(child)));
        }
        lines.push(self.delete_sql(tables));
        for child in &children {
            lines.push(format!("ALTER TABLE {} ENABLE TRIGGER ALL;", self.quote(child)));
        }
        Some(lines.join("\n"))
    }
}
