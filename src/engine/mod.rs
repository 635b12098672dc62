//! Tiled QA engine
//!
//! Splits the processing perimeter into tiles, runs every rule on each
//! tile's candidate rows (the tile expanded by the rule's search
//! tolerance), and folds the raw errors into one deduplicated report.
//!
//! # Submodules
//! - `types` - Row references, rows, QA errors, run status, cancellation
//! - `error` - Configuration, data-source and engine error types
//! - `config` - Run configuration and retry policy
//! - `source` - Data source trait and the in-memory R-tree backend
//! - `tiling` - Tile grid and candidate-row scheduling
//! - `cache` - Shared read-through row cache with watermark eviction
//! - `context` - Per-tile rule invocation and fault isolation
//! - `dedup` - Canonical-tile attribution and the running error set
//! - `report` - Final error report
//! - `runner` - Orchestration, sequential or on a worker pool

mod types;
mod error;
mod config;
mod source;
mod tiling;
mod cache;
mod context;
mod dedup;
mod report;
mod runner;

pub use types::{
    TableId, RowId, RowRef, Row, FieldValue, QaError,
    RuleId, RunStatus, CancellationToken,
};

pub use error::{
    ConfigError, DataSourceError, QaEngineError, QaResult,
    EngineFault, FaultKind,
};

pub use config::{RunConfig, RetryPolicy};

pub use source::{DataSource, MemoryDataSource};

pub use tiling::{
    Tile, TileGrid, Tiles, TileScheduler,
    enumerate_tiles,
};

pub use cache::{RowCache, CacheStats};

pub use context::{RuleExecutionContext, RawError, RuleFailure};

pub use dedup::{ErrorSet, ReportedError, FoldOutcome, anchor_point};

pub use report::ErrorReport;

pub use runner::TestRunner;
