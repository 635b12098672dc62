//! Rule plug-in interface and reference rules
//!
//! The engine only sees [`QaRule`]: the tables a rule reads, how far past a
//! tile it needs to look, and an evaluation entry point fed with one tile's
//! candidate rows.
//!
//! The lower-left corner of an error's geometry decides which tile reports
//! it, so it must lie within the rule's search tolerance of every
//! participant and of every row whose absence the error asserts. Geometry
//! taken from a participant (the offending vertex, a component) satisfies
//! this.
//!
//! # Submodules
//! - `distance` - Point/segment distance helpers
//! - `point_near_line` - Points that are not within tolerance of any line
//! - `duplicate` - Coincident geometries within one table
//! - `vertex_count` - Features with too many vertices
//! - `field` - Attribute constraints

mod distance;
mod point_near_line;
mod duplicate;
mod vertex_count;
mod field;

use std::sync::Arc;

use crate::engine::{CancellationToken, QaError, Row, TableId, Tile};

pub use distance::{point_segment_distance, point_geometry_distance};
pub use point_near_line::{PointNotNearLine, CODE_NOT_NEAR_LINE};
pub use duplicate::{DuplicateGeometry, CODE_DUPLICATE};
pub use vertex_count::{MaxVertexCount, CODE_TOO_MANY_VERTICES};
pub use field::{FieldConstraint, CODE_VALUE_MISSING, CODE_VALUE_NOT_ALLOWED};

pub trait QaRule: Send + Sync {
    /// Display name, used in reports and logs
    fn name(&self) -> &str;

    /// Input tables, in the order their rows appear in [`RuleInput`]
    fn tables(&self) -> &[TableId];

    /// Distance beyond a tile's own extent the rule must see
    fn search_tolerance(&self) -> f64 {
        0.0
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> anyhow::Result<Vec<QaError>>;
}

/// Candidate rows of one table for one tile, ascending by row id
#[derive(Debug, Clone)]
pub struct CandidateRows {
    pub table: TableId,
    pub rows: Vec<Arc<Row>>,
}

/// Everything a rule sees while evaluating one tile
pub struct RuleInput<'a> {
    tile: &'a Tile,
    tables: Vec<CandidateRows>,
    cancel: &'a CancellationToken,
}

impl<'a> RuleInput<'a> {
    pub fn new(tile: &'a Tile, tables: Vec<CandidateRows>, cancel: &'a CancellationToken) -> Self {
        Self { tile, tables, cancel }
    }

    pub fn tile(&self) -> &Tile {
        self.tile
    }

    /// Rows of the `table_index`-th declared table
    pub fn rows(&self, table_index: usize) -> &[Arc<Row>] {
        self.tables
            .get(table_index)
            .map(|t| t.rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn tables(&self) -> &[CandidateRows] {
        &self.tables
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    /// Unordered pairs (a, b) with a.id < b.id from one table
    pub fn unique_pairs(&self, table_index: usize) -> impl Iterator<Item = (&Arc<Row>, &Arc<Row>)> + '_ {
        let rows = self.rows(table_index);
        rows.iter()
            .enumerate()
            .flat_map(move |(i, a)| rows[i + 1..].iter().map(move |b| (a, b)))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
