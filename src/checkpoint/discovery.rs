//! Metadata discovery: one query each for tables, relationships and, when
//! enabled and supported, temporal tables. Engines whose reseed statement
//! depends on the database contents get one more query when reseeding is on.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::ResetConfig;
use crate::db::{Connection, DbError, DbResult, Row};
use crate::dialect::DbAdapter;
use crate::error::{DiscoveryQuery, ResetError, ResetResult};
use crate::schema::{Relationship, Table, TemporalTable};

use super::timed;

/// A snapshot of the schema, taken once per [`Checkpoint`](super::Checkpoint).
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub temporal_tables: Vec<TemporalTable>,
    /// Whether the engine can run its reseed statement against this
    /// database. Only checked when reseeding is enabled.
    pub reseed_available: bool,
}

pub(crate) async fn discover(
    conn: &mut dyn Connection,
    adapter: &dyn DbAdapter,
    config: &ResetConfig,
) -> ResetResult<Metadata> {
    let filter = config.filter();
    let timeout = config.command_timeout();

    let rows = run_query(conn, DiscoveryQuery::Tables, &adapter.tables_query(&filter), timeout).await?;
    let tables = parse(DiscoveryQuery::Tables, &rows, |row| {
        Ok(Table::new(row.get_opt(0), row.get(1)?))
    })?;

    let mut temporal_tables = Vec::new();
    if config.check_temporal_tables {
        match adapter.versioning() {
            Some(versioning) if versioning.supported_by(conn.server_version().as_deref()) => {
                let sql = versioning.temporal_tables_query(&filter);
                let rows = run_query(conn, DiscoveryQuery::TemporalTables, &sql, timeout).await?;
                temporal_tables = parse(DiscoveryQuery::TemporalTables, &rows, |row| {
                    Ok(TemporalTable::new(row.get_opt(0), row.get(1)?, row.get(2)?))
                })?;
            }
            _ => {
                tracing::debug!(
                    dialect = adapter.name(),
                    server_version = ?conn.server_version(),
                    "temporal tables not supported, skipping"
                );
            }
        }
    }

    let sql = adapter.relationships_query(&filter);
    let rows = run_query(conn, DiscoveryQuery::Relationships, &sql, timeout).await?;
    let relationships = parse(DiscoveryQuery::Relationships, &rows, |row| {
        Ok(Relationship::new(
            Table::new(row.get_opt(0), row.get(1)?),
            Table::new(row.get_opt(2), row.get(3)?),
            row.get_opt(4),
        ))
    })?;

    let mut reseed_available = true;
    if config.with_reseed {
        if let Some(sql) = adapter.reseed_check_query() {
            let rows = run_query(conn, DiscoveryQuery::ReseedCheck, &sql, timeout).await?;
            reseed_available = !rows.is_empty();
            if !reseed_available {
                tracing::debug!(dialect = adapter.name(), "nothing to reseed, skipping");
            }
        }
    }

    tracing::info!(
        tables = tables.len(),
        relationships = relationships.len(),
        temporal_tables = temporal_tables.len(),
        "schema discovered"
    );

    Ok(Metadata {
        tables,
        relationships,
        temporal_tables,
        reseed_available,
    })
}

async fn run_query(
    conn: &mut dyn Connection,
    query: DiscoveryQuery,
    sql: &str,
    timeout: Option<Duration>,
) -> ResetResult<Vec<Row>> {
    let result = timed(timeout, conn.query(sql)).await;
    if let Err(DbError::Timeout(_)) = result {
        conn.cancel();
    }
    result.map_err(|source| ResetError::Discovery { query, source })
}

/// Map rows to records, dropping duplicates but keeping first-seen order.
fn parse<T, F>(query: DiscoveryQuery, rows: &[Row], f: F) -> ResetResult<Vec<T>>
where
    T: Clone + Eq + std::hash::Hash,
    F: Fn(&Row) -> DbResult<T>,
{
    let mut seen = HashSet::with_capacity(rows.len());
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let record = f(row).map_err(|source| ResetError::Discovery { query, source })?;
        if seen.insert(record.clone()) {
            out.push(record);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_first_occurrence() {
        let rows = vec![
            Row::new(vec![Some("dbo".into()), Some("B".into())]),
            Row::new(vec![Some("dbo".into()), Some("A".into())]),
            Row::new(vec![Some("dbo".into()), Some("B".into())]),
        ];
        let tables = parse(DiscoveryQuery::Tables, &rows, |row| {
            Ok(Table::new(row.get_opt(0), row.get(1)?))
        })
        .unwrap();
        assert_eq!(
            tables,
            vec![Table::new(Some("dbo"), "B"), Table::new(Some("dbo"), "A")]
        );
    }

    #[test]
    fn parse_reports_missing_column_as_discovery_failure() {
        let rows = vec![Row::new(vec![Some("dbo".into())])];
        let err = parse(DiscoveryQuery::Tables, &rows, |row| {
            Ok(Table::new(row.get_opt(0), row.get(1)?))
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ResetError::Discovery {
                query: DiscoveryQuery::Tables,
                source: DbError::MissingColumn { column: 1 }
            }
        ));
    }
}
