//! CLI `plan` command: show what a reset would do without doing it.

use anyhow::{Context, Result};

use checkpoint::{Checkpoint, CheckpointConfig};

/// Build the reset plan and print it.
pub async fn plan(config: &CheckpointConfig, json: bool) -> Result<()> {
    let mut conn = super::open_connection(config)?;
    let checkpoint = Checkpoint::new(config.reset.clone());
    let plan = checkpoint.warm(&mut conn).await?;

    if json {
        let out = serde_json::to_string_pretty(plan).context("failed to serialize plan")?;
        println!("{out}");
        return Ok(());
    }

    println!("Deletion order");
    println!("{}", "=".repeat(40));
    for (i, table) in plan.deleted.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, table);
    }

    if !plan.deletion.cycles.is_empty() {
        println!();
        println!("Cycle groups ({:?} policy):", config.reset.cycle_policy);
        for group in &plan.deletion.cycles {
            let names: Vec<String> = group.tables.iter().map(ToString::to_string).collect();
            println!("  {{{}}}", names.join(", "));
        }
        if !plan.deletion.cycle_parents.is_empty() {
            let names: Vec<String> =
                plan.deletion.cycle_parents.iter().map(ToString::to_string).collect();
            println!("Referenced by cycle groups: {}", names.join(", "));
        }
    }

    if !plan.temporal_tables.is_empty() {
        println!();
        println!("Temporal tables:");
        for t in &plan.temporal_tables {
            println!("  {} (history: {})", t.table(), t.history());
        }
    }

    println!();
    println!("Delete SQL:");
    println!("{}", plan.delete_sql);

    if let Some(ref reseed) = plan.reseed_sql {
        println!();
        println!("Reseed SQL:");
        println!("{reseed}");
    }

    Ok(())
}
