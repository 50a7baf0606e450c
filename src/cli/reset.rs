//! CLI `reset` command: empty every table after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use checkpoint::{Checkpoint, CheckpointConfig, CyclePolicy};

/// Empty every table of the configured database.
pub async fn reset(config: &CheckpointConfig, skip_confirmation: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !skip_confirmation {
        println!("WARNING: This will permanently delete ALL rows from every table.");
        println!("Database: {}", db_path.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("reset cancelled");
        }
    }

    let mut conn = super::open_connection(config)?;
    let checkpoint = Checkpoint::new(config.reset.clone());
    checkpoint.reset(&mut conn).await?;

    let plan = checkpoint.plan();
    let deleted = plan.map(|p| p.deleted.len()).unwrap_or(0);
    println!("Deleted all rows from {deleted} tables. Database reset complete.");

    if config.reset.cycle_policy == CyclePolicy::Exclude {
        for group in plan.into_iter().flat_map(|p| &p.deletion.cycles) {
            let names: Vec<String> = group.tables.iter().map(ToString::to_string).collect();
            println!("Skipped cyclic tables: {}", names.join(", "));
        }
        for p in plan.into_iter().filter(|p| !p.deletion.cycle_parents.is_empty()) {
            let names: Vec<String> = p.deletion.cycle_parents.iter().map(ToString::to_string).collect();
            println!("Skipped tables they reference: {}", names.join(", "));
        }
    }
    Ok(())
}
