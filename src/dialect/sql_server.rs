//! Microsoft SQL Server.

use super::{filter_predicates, DbAdapter, SystemVersioning, TableFilter};
use crate::schema::{Relationship, Table, TemporalTable};

/// SQL Server 2016 (major version 13) introduced temporal tables.
const TEMPORAL_TABLES_MIN_MAJOR_VERSION: u32 = 13;

#[derive(Debug, Clone, Copy, Default)]
pub struct SqlServer;

fn bracket(ident: &str) -> String {
    format!("[{}]", ident.replace(']', "]]"))
}

fn qualified(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", bracket(schema), bracket(name)),
        None => bracket(name),
    }
}

impl DbAdapter for SqlServer {
    fn name(&self) -> &'static str {
        "sql_server"
    }

    fn quote(&self, table: &Table) -> String {
        qualified(table.schema.as_deref(), &table.name)
    }

    fn tables_query(&self, filter: &TableFilter) -> String {
        format!(
            "SELECT s.name, t.name FROM sys.tables t \
             INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
             WHERE t.is_ms_shipped = 0{} \
             ORDER BY s.name, t.name",
            filter_predicates(filter, Some("s.name"), "t.name")
        )
    }

    fn relationships_query(&self, _filter: &TableFilter) -> String {
        "SELECT SCHEMA_NAME(pk.schema_id), pk.name, SCHEMA_NAME(fk_tab.schema_id), fk_tab.name, fk.name \
         FROM sys.foreign_keys fk \
         INNER JOIN sys.objects pk ON fk.referenced_object_id = pk.object_id \
         INNER JOIN sys.objects fk_tab ON fk.parent_object_id = fk_tab.object_id \
         ORDER BY SCHEMA_NAME(fk_tab.schema_id), fk_tab.name, fk.name"
            .to_string()
    }

    fn reseed_sql(&self, tables: &[Table]) -> String {
        // Reseeding to seed - increment makes the next insert receive the
        // seed. Tables that never held a row still hand out the seed itself,
        // so they are skipped.
        let mut sql = String::from("DECLARE @reseed bigint;");
        for table in tables {
            let literal = self.quote(table).replace('\'', "''");
            sql.push_str(&format!(
                "\nSET @reseed = NULL;\
                 \nSELECT @reseed = CONVERT(bigint, ic.seed_value) - CONVERT(bigint, ic.increment_value) \
                 FROM sys.identity_columns ic \
                 WHERE ic.object_id = OBJECT_ID(N'{literal}') AND ic.last_value IS NOT NULL;\
                 \nIF @reseed IS NOT NULL DBCC CHECKIDENT (N'{literal}', RESEED, @reseed);"
            ));
        }
        sql
    }

    fn suspended_delete_sql(&self, tables: &[Table], suspended: &[Relationship]) -> Option<String> {
        let constraint = |rel: &Relationship| match &rel.name {
            Some(name) => bracket(name),
            None => "ALL".to_string(),
        };

        let mut lines = Vec::new();
        for rel in suspended {
            lines.push(format!(
                "ALTER TABLE {} NOCHECK CONSTRAINT {};",
                self.quote(&rel.child),
                constraint(rel)
            ));
        }
        lines.push(self.delete_sql(tables));
        for rel in suspended {
            lines.push(format!(
                "ALTER TABLE {} WITH CHECK CHECK CONSTRAINT {};",
                self.quote(&rel.child),
                constraint(rel)
            ));
        }
        Some(lines.join("\n"))
    }

    fn versioning(&self) -> Option<&dyn SystemVersioning> {
        Some(self)
    }
}

impl SystemVersioning for SqlServer {
    fn supported_by(&self, server_version: Option<&str>) -> bool {
        server_version
            .and_then(|v| v.split('.').next())
            .and_then(|major| major.trim().parse::<u32>().ok())
            .is_some_and(|major| major >= TEMPORAL_TABLES_MIN_MAJOR_VERSION)
    }

    fn temporal_tables_query(&self, filter: &TableFilter) -> String {
        format!(
            "SELECT s.name, t.name, h.name FROM sys.tables t \
             INNER JOIN sys.schemas s ON t.schema_id = s.schema_id \
             INNER JOIN sys.tables h ON t.history_table_id = h.object_id \
             WHERE t.temporal_type = 2{} \
             ORDER BY s.name, t.name",
            filter_predicates(filter, Some("s.name"), "t.name")
        )
    }

    fn suspend_sql(&self, tables: &[TemporalTable]) -> String {
        tables
            .iter()
            .map(|t| {
                format!(
                    "ALTER TABLE {} SET (SYSTEM_VERSIONING = OFF);",
                    self.quote(&t.table())
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn resume_sql(&self, tables: &[TemporalTable]) -> String {
        tables
            .iter()
            .map(|t| {
                format!(
                    "ALTER TABLE {} SET (SYSTEM_VERSIONING = ON (HISTORY_TABLE = {}));",
                    self.quote(&t.table()),
                    self.quote(&t.history())
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
