//! The reset orchestrator.
//!
//! A [`Checkpoint`] discovers the schema on its first [`reset`](Checkpoint::reset),
//! renders a [`ResetPlan`] through its [`DbAdapter`], and caches it for the
//! rest of its life. Every reset then runs up to three transactions, each
//! committed before the next begins:
//!
//! 1. suspend system versioning on temporal tables (if any were found),
//! 2. delete (and optionally reseed) every planned table,
//! 3. resume system versioning.
//!
//! A timeout cancels the statement in flight and rolls back. A COMMIT that
//! times out may still have been applied by the server; see
//! [`ResetError::is_commit_in_doubt`].
//!
//! A failure rolls back only the transaction in progress. If the delete phase
//! fails after versioning was suspended, versioning stays off unless
//! [`ResetConfig::restore_versioning_on_failure`] is set.
//!
//! The plan is held in a `tokio::sync::OnceCell`, so concurrent first resets
//! on one instance build it exactly once. Schema changes made after the plan
//! is built are not picked up; construct a new `Checkpoint` instead.

pub mod discovery;
pub mod plan;

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::OnceCell;

use crate::config::ResetConfig;
use crate::db::{Connection, DbError, DbResult};
use crate::dialect::DbAdapter;
use crate::error::{Phase, ResetError, ResetResult, Step};

pub use discovery::Metadata;
pub use plan::ResetPlan;

/// Lifecycle of a [`Checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointState {
    /// No plan yet; the next reset discovers the schema.
    Unconfigured,
    /// Plan cached, no reset has completed yet.
    PlanBuilt,
    /// At least one reset completed with the cached plan.
    Ready,
}

pub struct Checkpoint {
    config: ResetConfig,
    adapter: Arc<dyn DbAdapter>,
    plan: OnceCell<ResetPlan>,
    ready: AtomicBool,
}

impl std::fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoint")
            .field("adapter", &self.adapter.name())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Checkpoint {
    /// A checkpoint using the adapter for `config.dialect`.
    pub fn new(config: ResetConfig) -> Self {
        let adapter = config.dialect.adapter();
        Self::with_adapter(config, adapter)
    }

    /// A checkpoint using a caller-supplied adapter; `config.dialect` is ignored.
    pub fn with_adapter(config: ResetConfig, adapter: Arc<dyn DbAdapter>) -> Self {
        Self {
            config,
            adapter,
            plan: OnceCell::new(),
            ready: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ResetConfig {
        &self.config
    }

    pub fn adapter(&self) -> &dyn DbAdapter {
        self.adapter.as_ref()
    }

    pub fn state(&self) -> CheckpointState {
        if !self.plan.initialized() {
            CheckpointState::Unconfigured
        } else if self.ready.load(Ordering::Acquire) {
            CheckpointState::Ready
        } else {
            CheckpointState::PlanBuilt
        }
    }

    /// The cached plan, once built.
    pub fn plan(&self) -> Option<&ResetPlan> {
        self.plan.get()
    }

    pub fn delete_sql(&self) -> Option<&str> {
        self.plan().map(|p| p.delete_sql.as_str())
    }

    pub fn reseed_sql(&self) -> Option<&str> {
        self.plan().and_then(|p| p.reseed_sql.as_deref())
    }

    /// Build and cache the plan without deleting anything. Call once before
    /// sharing the checkpoint between concurrent callers.
    pub async fn warm(&self, conn: &mut dyn Connection) -> ResetResult<&ResetPlan> {
        self.plan
            .get_or_try_init(move || async move {
                tracing::info!(
                    dialect = self.adapter.name(),
                    database = ?conn.database_name(),
                    "building reset plan"
                );
                let metadata = discovery::discover(conn, self.adapter.as_ref(), &self.config).await?;
                let plan = ResetPlan::render(metadata, self.adapter.as_ref(), &self.config)?;
                tracing::info!(
                    tables = plan.deleted.len(),
                    cycles = plan.deletion.cycles.len(),
                    temporal_tables = plan.temporal_tables.len(),
                    "reset plan built"
                );
                Ok::<_, ResetError>(plan)
            })
            .await
    }

    /// Empty every planned table.
    pub async fn reset(&self, conn: &mut dyn Connection) -> ResetResult<()> {
        let plan = self.warm(conn).await?;

        let versioning = if plan.temporal_tables.is_empty() {
            None
        } else {
            self.adapter.versioning()
        };

        if let Some(versioning) = versioning {
            let sql = versioning.suspend_sql(&plan.temporal_tables);
            self.run_phase(conn, Phase::SuspendVersioning, &[sql.as_str()])
                .await?;
        }

        let mut statements = Vec::with_capacity(2);
        if !plan.delete_sql.is_empty() {
            statements.push(plan.delete_sql.as_str());
        }
        if let Some(reseed) = plan.reseed_sql.as_deref() {
            statements.push(reseed);
        }

        if let Err(err) = self.run_phase(conn, Phase::Delete, &statements).await {
            if let Some(versioning) = versioning.filter(|_| self.config.restore_versioning_on_failure) {
                tracing::warn!("delete failed, resuming system versioning");
                let sql = versioning.resume_sql(&plan.temporal_tables);
                if let Err(restore) = self
                    .run_phase(conn, Phase::ResumeVersioning, &[sql.as_str()])
                    .await
                {
                    tracing::error!(error = %restore, "could not resume system versioning");
                }
            }
            return Err(err);
        }

        if let Some(versioning) = versioning {
            let sql = versioning.resume_sql(&plan.temporal_tables);
            self.run_phase(conn, Phase::ResumeVersioning, &[sql.as_str()])
                .await?;
        }

        self.ready.store(true, Ordering::Release);
        tracing::info!(tables = plan.deleted.len(), "database reset");
        Ok(())
    }

    /// Run `statements` inside one transaction and commit it.
    async fn run_phase(
        &self,
        conn: &mut dyn Connection,
        phase: Phase,
        statements: &[&str],
    ) -> ResetResult<()> {
        if statements.is_empty() {
            return Ok(());
        }
        let timeout = self.config.command_timeout();
        tracing::debug!(%phase, statements = statements.len(), "starting phase");

        let begun = timed(timeout, conn.begin()).await;
        if let Err(source) = begun {
            // An abandoned BEGIN can still land after the timeout.
            if matches!(source, DbError::Timeout(_)) {
                return Err(abort_phase(conn, timeout, phase, Step::Begin, source).await);
            }
            return Err(ResetError::Execution {
                phase,
                step: Step::Begin,
                source,
            });
        }

        for (i, sql) in statements.iter().enumerate() {
            let executed = timed(timeout, conn.execute(sql)).await;
            if let Err(source) = executed {
                return Err(abort_phase(conn, timeout, phase, Step::Statement(i + 1), source).await);
            }
        }

        let committed = timed(timeout, conn.commit()).await;
        if let Err(source) = committed {
            return Err(abort_phase(conn, timeout, phase, Step::Commit, source).await);
        }

        tracing::debug!(%phase, "phase committed");
        Ok(())
    }
}

/// Await `fut`, failing with [`DbError::Timeout`] once `limit` elapses.
pub(crate) async fn timed<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = DbResult<T>>,
) -> DbResult<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .unwrap_or(Err(DbError::Timeout(limit))),
        None => fut.await,
    }
}

/// Roll back the transaction of a failed phase and build the error to return.
async fn abort_phase(
    conn: &mut dyn Connection,
    timeout: Option<Duration>,
    phase: Phase,
    step: Step,
    source: DbError,
) -> ResetError {
    if matches!(source, DbError::Timeout(_)) {
        conn.cancel();
    }
    tracing::warn!(%phase, %step, error = %source, "rolling back phase");

    match timed(timeout, conn.rollback()).await {
        Ok(()) => ResetError::Execution {
            phase,
            step,
            source,
        },
        Err(rollback) => ResetError::Rollback {
            phase,
            step,
            original: Box::new(source),
            source: rollback,
        },
    }
}
