//! Reset a relational test database to an empty state between test runs,
//! without dropping or recreating its schema.
//!
//! Checkpoint discovers the tables and foreign keys of a database once,
//! computes an order in which every table can be emptied without violating
//! referential integrity, and then replays that plan on every
//! [`Checkpoint::reset`].
//!
//! ```no_run
//! use checkpoint::{Checkpoint, ResetConfig, SqliteConnection};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let checkpoint = Checkpoint::new(ResetConfig {
//!     tables_to_ignore: vec!["schema_migrations".into()],
//!     with_reseed: true,
//!     ..Default::default()
//! });
//!
//! let mut conn = SqliteConnection::open("test.db")?;
//! checkpoint.reset(&mut conn).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`schema`]: Table, relationship and temporal-table records
//! - [`graph`]: Dependency graph builder and deletion-order resolver
//! - [`dialect`]: Statement rendering for SQL Server, PostgreSQL, MySQL and SQLite
//! - [`db`]: The connection boundary and a `rusqlite` implementation
//! - [`checkpoint`]: The reset orchestrator
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`error`]: Typed reset failures

pub mod checkpoint;
pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod graph;
pub mod schema;

pub use checkpoint::{Checkpoint, CheckpointState, ResetPlan};
pub use config::{CheckpointConfig, CyclePolicy, ResetConfig};
pub use db::{Connection, DbError, Row, SqliteConnection};
pub use dialect::{DbAdapter, Dialect, SystemVersioning, TableFilter};
pub use error::{Phase, ResetError, ResetResult, Step};
pub use graph::{build_plan, CycleGroup, DeletionPlan};
pub use schema::{Relationship, Table, TemporalTable};
