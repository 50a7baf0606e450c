//! Errors surfaced by a reset.

use thiserror::Error;

use crate::db::DbError;
use crate::graph::CycleGroup;

/// Which metadata discovery query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryQuery {
    Tables,
    Relationships,
    TemporalTables,
    ReseedCheck,
}

impl std::fmt::Display for DiscoveryQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Tables => "tables",
            Self::Relationships => "relationships",
            Self::TemporalTables => "temporal tables",
            Self::ReseedCheck => "reseed check",
        })
    }
}

/// The transactions a reset runs, in order. Each commits before the next begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    SuspendVersioning,
    Delete,
    ResumeVersioning,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::SuspendVersioning => "suspend-versioning",
            Self::Delete => "delete",
            Self::ResumeVersioning => "resume-versioning",
        })
    }
}

/// Position inside a phase's transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Begin,
    /// 1-based index of the statement batch within the phase.
    Statement(usize),
    Commit,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Begin => f.write_str("BEGIN"),
            Self::Statement(n) => write!(f, "statement {n}"),
            Self::Commit => f.write_str("COMMIT"),
        }
    }
}

fn describe(groups: &[CycleGroup]) -> String {
    groups
        .iter()
        .map(|g| {
            let names: Vec<String> = g.tables.iter().map(ToString::to_string).collect();
            format!("{{{}}}", names.join(", "))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug)]
pub enum ResetError {
    /// A metadata query failed. Nothing was cached; the next reset retries.
    #[error("could not discover schema ({query} query): {source}")]
    Discovery {
        query: DiscoveryQuery,
        #[source]
        source: DbError,
    },

    /// Foreign keys form cycles and the policy is to abort.
    #[error("could not compute a total deletion order, cyclic tables: {}", describe(.groups))]
    Cycle { groups: Vec<CycleGroup> },

    /// Cycles were found, the policy is to suspend constraints, and the
    /// dialect cannot.
    #[error("{dialect} cannot suspend constraints for cyclic tables: {}", describe(.groups))]
    CycleSuspensionUnsupported {
        dialect: &'static str,
        groups: Vec<CycleGroup>,
    },

    /// A statement failed (or timed out). The phase's transaction was rolled
    /// back; earlier phases stay committed.
    #[error("could not execute {step} of the {phase} phase: {source}")]
    Execution {
        phase: Phase,
        step: Step,
        #[source]
        source: DbError,
    },

    /// A statement failed and rolling its transaction back failed too.
    #[error("rollback of the {phase} phase failed ({source}) after {step} failed: {original}")]
    Rollback {
        phase: Phase,
        step: Step,
        original: Box<DbError>,
        #[source]
        source: DbError,
    },
}

impl ResetError {
    pub fn is_timeout(&self) -> bool {
        let source = match self {
            Self::Discovery { source, .. } | Self::Execution { source, .. } => source,
            Self::Rollback { original, .. } => original.as_ref(),
            Self::Cycle { .. } | Self::CycleSuspensionUnsupported { .. } => return false,
        };
        matches!(source, DbError::Timeout(_))
    }

    /// `true` when COMMIT timed out. The server may have applied it anyway,
    /// so the phase's effects are unknown.
    pub fn is_commit_in_doubt(&self) -> bool {
        match self {
            Self::Execution {
                step: Step::Commit,
                source,
                ..
            } => matches!(source, DbError::Timeout(_)),
            Self::Rollback {
                step: Step::Commit,
                original,
                ..
            } => matches!(original.as_ref(), DbError::Timeout(_)),
            _ => false,
        }
    }

    /// The phase that failed, for execution errors.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Execution { phase, .. } | Self::Rollback { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

pub type ResetResult<T> = std::result::Result<T, ResetError>;
