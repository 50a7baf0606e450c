//! The cached, rendered reset plan.

use serde::Serialize;

use crate::config::{CyclePolicy, ResetConfig};
use crate::dialect::DbAdapter;
use crate::error::{ResetError, ResetResult};
use crate::graph::{build_plan, DeletionPlan};
use crate::schema::{Table, TemporalTable};

use super::discovery::Metadata;

/// Everything a reset executes, computed once and then reused verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct ResetPlan {
    pub deletion: DeletionPlan,
    /// Tables the delete statement actually clears, in order.
    pub deleted: Vec<Table>,
    pub temporal_tables: Vec<TemporalTable>,
    pub delete_sql: String,
    pub reseed_sql: Option<String>,
}

impl ResetPlan {
    pub(crate) fn render(
        metadata: Metadata,
        adapter: &dyn DbAdapter,
        config: &ResetConfig,
    ) -> ResetResult<Self> {
        let deletion = build_plan(&metadata.tables, &metadata.relationships);

        let (deleted, delete_sql) = if deletion.is_complete() {
            let sql = adapter.delete_sql(&deletion.order);
            (deletion.order.clone(), sql)
        } else {
            match config.cycle_policy {
                CyclePolicy::Exclude => {
                    for group in &deletion.cycles {
                        let tables: Vec<String> = group.tables.iter().map(ToString::to_string).collect();
                        tracing::warn!(tables = %tables.join(", "), "excluding cyclic tables from reset");
                    }
                    if !deletion.cycle_parents.is_empty() {
                        let tables: Vec<String> =
                            deletion.cycle_parents.iter().map(ToString::to_string).collect();
                        tracing::warn!(
                            tables = %tables.join(", "),
                            "excluding tables referenced by cyclic tables from reset"
                        );
                    }
                    let kept = deletion.independent_order();
                    let sql = adapter.delete_sql(&kept);
                    (kept, sql)
                }
                CyclePolicy::Abort => {
                    return Err(ResetError::Cycle {
                        groups: deletion.cycles,
                    });
                }
                CyclePolicy::Suspend => {
                    let all = deletion.full_order();
                    let Some(sql) =
                        adapter.suspended_delete_sql(&all, &deletion.cyclic_relationships)
                    else {
                        return Err(ResetError::CycleSuspensionUnsupported {
                            dialect: adapter.name(),
                            groups: deletion.cycles,
                        });
                    };
                    tracing::info!(
                        constraints = deletion.cyclic_relationships.len(),
                        "suspending cyclic constraints during delete"
                    );
                    (all, sql)
                }
            }
        };

        let reseed_sql = (config.with_reseed && metadata.reseed_available && !deleted.is_empty())
            .then(|| adapter.reseed_sql(&deleted));

        Ok(Self {
            deletion,
            deleted,
            temporal_tables: metadata.temporal_tables,
            delete_sql,
            reseed_sql,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Postgres, SqlServer};
    use crate::schema::Relationship;

    fn dbo(name: &str) -> Table {
        Table::new(Some("dbo"), name)
    }

    fn cyclic_metadata() -> Metadata {
        Metadata {
            tables: vec![dbo("A"), dbo("B"), dbo("Lookup")],
            relationships: vec![
                Relationship::new(dbo("A"), dbo("B"), Some("FK_B_A")),
                Relationship::new(dbo("B"), dbo("A"), Some("FK_A_B")),
            ],
            temporal_tables: vec![],
            reseed_available: true,
        }
    }

    #[test]
    fn renders_orders_before_customers() {
        let metadata = Metadata {
            tables: vec![dbo("Customers"), dbo("Orders")],
            relationships: vec![Relationship::new(dbo("Customers"), dbo("Orders"), Some("FK_Orders_Customers"))],
            temporal_tables: vec![],
            reseed_available: true,
        };
        let plan = ResetPlan::render(metadata, &SqlServer, &ResetConfig::default()).unwrap();
        assert_eq!(
            plan.delete_sql,
            "DELETE FROM [dbo].[Orders];\nDELETE FROM [dbo].[Customers];"
        );
        assert!(plan.reseed_sql.is_none());
    }

    #[test]
    fn exclude_policy_leaves_cycle_out_of_sql() {
        let plan = ResetPlan::render(cyclic_metadata(), &SqlServer, &ResetConfig::default()).unwrap();
        assert_eq!(plan.deleted, vec![dbo("Lookup")]);
        assert_eq!(plan.delete_sql, "DELETE FROM [dbo].[Lookup];");
        assert_eq!(plan.deletion.cycles.len(), 1);
    }

    #[test]
    fn exclude_policy_keeps_parents_of_the_cycle() {
        let mut metadata = cyclic_metadata();
        metadata
            .relationships
            .push(Relationship::new(dbo("Lookup"), dbo("B"), Some("FK_B_Lookup")));
        metadata.tables.push(dbo("Notes"));

        let plan = ResetPlan::render(metadata, &SqlServer, &ResetConfig::default()).unwrap();
        assert_eq!(plan.deleted, vec![dbo("Notes")]);
        assert_eq!(plan.delete_sql, "DELETE FROM [dbo].[Notes];");
        assert_eq!(plan.deletion.cycle_parents, vec![dbo("Lookup")]);
    }

    #[test]
    fn reseed_is_skipped_when_unavailable() {
        let config = ResetConfig {
            with_reseed: true,
            ..Default::default()
        };
        let metadata = Metadata {
            reseed_available: false,
            ..cyclic_metadata()
        };
        let plan = ResetPlan::render(metadata, &SqlServer, &config).unwrap();
        assert_eq!(plan.deleted, vec![dbo("Lookup")]);
        assert!(plan.reseed_sql.is_none());
    }

    #[test]
    fn abort_policy_fails_with_cycle() {
        let config = ResetConfig {
            cycle_policy: CyclePolicy::Abort,
            ..Default::default()
        };
        let err = ResetPlan::render(cyclic_metadata(), &SqlServer, &config).unwrap_err();
        assert!(matches!(err, ResetError::Cycle { ref groups } if groups.len() == 1));
    }

    #[test]
    fn suspend_policy_deletes_everything_and_reseeds_it() {
        let config = ResetConfig {
            cycle_policy: CyclePolicy::Suspend,
            with_reseed: true,
            ..Default::default()
        };
        let plan = ResetPlan::render(cyclic_metadata(), &Postgres, &config).unwrap();
        assert_eq!(plan.deleted, vec![dbo("A"), dbo("B"), dbo("Lookup")]);
        assert!(plan.delete_sql.contains("DISABLE TRIGGER ALL"));
        let reseed = plan.reseed_sql.unwrap();
        assert!(reseed.contains("'\"dbo\".\"A\"'::regclass"));
        assert!(reseed.contains("'\"dbo\".\"Lookup\"'::regclass"));
    }

    #[derive(Debug)]
    struct NoSuspend;

    impl DbAdapter for NoSuspend {
        fn name(&self) -> &'static str {
            "no_suspend"
        }
        fn quote(&self, table: &Table) -> String {
            table.to_string()
        }
        fn tables_query(&self, _: &crate::dialect::TableFilter) -> String {
            String::new()
        }
        fn relationships_query(&self, _: &crate::dialect::TableFilter) -> String {
            String::new()
        }
        fn reseed_sql(&self, _: &[Table]) -> String {
            String::new()
        }
    }

    #[test]
    fn suspend_policy_requires_dialect_support() {
        let config = ResetConfig {
            cycle_policy: CyclePolicy::Suspend,
            ..Default::default()
        };
        let err = ResetPlan::render(cyclic_metadata(), &NoSuspend, &config).unwrap_err();
        assert!(matches!(
            err,
            ResetError::CycleSuspensionUnsupported { dialect: "no_suspend", .. }
        ));
    }

    #[test]
    fn reseed_skipped_when_nothing_is_deleted() {
        let config = ResetConfig {
            with_reseed: true,
            ..Default::default()
        };
        let plan = ResetPlan::render(Metadata::default(), &SqlServer, &config).unwrap();
        assert!(plan.delete_sql.is_empty());
        assert!(plan.reseed_sql.is_none());
    }
}
