//! Error types for the QA engine.
//!
//! Engine faults are kept apart from QA errors (violations found in the
//! data): faults end up in [`EngineFault`] entries of the report, never in
//! its error collection.

use serde::Serialize;
use thiserror::Error;

use super::types::{RowId, TableId};

/// Invalid run parameters, detected before any tile is scheduled.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid tile size {0}: must be positive (or infinite for no tiling)")]
    InvalidTileSize(f64),

    #[error("no rules to execute")]
    NoRules,

    #[error("processing perimeter is empty")]
    EmptyPerimeter,

    #[error("rule '{rule}' declares no input tables")]
    NoInputTables { rule: String },

    #[error("rule '{rule}' declares invalid search tolerance {tolerance}")]
    InvalidTolerance { rule: String, tolerance: f64 },

    #[error("tile size {tile_size} splits a {width} x {height} perimeter into more tiles than can be indexed")]
    TooManyTiles { width: f64, height: f64, tile_size: f64 },

    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    #[error("retry policy needs at least one attempt")]
    InvalidRetryPolicy,
}

/// Failures of the data-source collaborator.
#[derive(Debug, Error)]
pub enum DataSourceError {
    #[error("unknown table: {0}")]
    UnknownTable(TableId),

    #[error("row {row} not found in table {table}")]
    RowNotFound { table: TableId, row: RowId },

    #[error("data source backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

/// Errors that stop `execute` before or outside tile processing.
#[derive(Debug, Error)]
pub enum QaEngineError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),
}

/// Convenience result alias.
pub type QaResult<T> = std::result::Result<T, QaEngineError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FaultKind {
    /// The rule's evaluation entry point failed or panicked
    Rule,
    /// Candidate query or row fetch failed after all retries. Stands in for
    /// a rule fault of this tile (same isolation and strict-mode policy),
    /// tagged so operational failures are told apart from rule failures.
    DataSource,
}

/// An engine-level fault isolated to one tile and rule
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineFault {
    pub tile_index: usize,
    pub rule: String,
    pub kind: FaultKind,
    pub message: String,
}
