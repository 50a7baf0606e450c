pub mod plan;
pub mod reset;

use anyhow::{bail, Context, Result};

use checkpoint::{CheckpointConfig, Dialect, SqliteConnection};

/// Open the configured database. Only SQLite files can be opened from the
/// command line; other engines are reset through the library.
fn open_connection(config: &CheckpointConfig) -> Result<SqliteConnection> {
    if config.reset.dialect != Dialect::Sqlite {
        bail!(
            "the command line only opens sqlite databases, configured dialect is {}",
            config.reset.dialect
        );
    }

    let db_path = config.resolved_db_path();
    if !db_path.exists() {
        bail!("database not found: {}", db_path.display());
    }

    SqliteConnection::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))
}
