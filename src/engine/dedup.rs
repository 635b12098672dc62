//! Cross-tile attribution and deduplication
//!
//! Every raw error is attributed to exactly one canonical tile, derived from
//! the data rather than from processing order. Its anchor is the lower-left
//! corner of the error geometry's envelope, or of the primary participant's
//! envelope when the error carries no geometry.
//!
//! The anchor is mapped to its owning tile (see [`TileGrid::tile_index_of`]).
//! Anchors outside the perimeter have no owner: such errors were seen only
//! through a tile's tolerance margin and are dropped. A tile only keeps the
//! errors it owns;
//! the others are regenerated, with complete visibility, by their own tile.
//! Folding is therefore commutative: the final set does not depend on the
//! order in which tiles finish.

use serde::Serialize;
use std::collections::BTreeMap;

use super::context::RawError;
use super::tiling::{Tile, TileGrid};
use super::types::{QaError, RowRef, RuleId};
use crate::geometry::{extract, Envelope, Geometry, GeometryComponent, Point};

/// Quantize coordinates for use in dedup keys
fn quantize(env: &Envelope) -> [i64; 4] {
    let scale = 1e6;
    [
        (env.xmin * scale).round() as i64,
        (env.ymin * scale).round() as i64,
        (env.xmax * scale).round() as i64,
        (env.ymax * scale).round() as i64,
    ]
}

/// Field order doubles as report order; the tile comes last so reports do
/// not depend on the tiling
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ErrorKey {
    rule: usize,
    participants: Vec<RowRef>,
    code: Option<String>,
    location: Option<[i64; 4]>,
    tile: usize,
}

/// A deduplicated error in the final report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportedError {
    pub rule: RuleId,
    pub tile_index: usize,
    #[serde(flatten)]
    pub error: QaError,
}

impl ReportedError {
    /// A component of the error geometry, `None` when absent or empty
    pub fn component_geometry(&self, component: GeometryComponent) -> Option<Geometry> {
        let geometry = extract(self.error.geometry.as_ref()?, component);
        (!geometry.is_empty()).then_some(geometry)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    Added,
    /// Same key already present
    Duplicate,
    /// Owned by another tile; dropped here
    NotCanonical,
}

/// Anchor point used for attribution, `None` when nothing is locatable
pub fn anchor_point(raw: &RawError) -> Option<Point> {
    raw.error
        .geometry
        .as_ref()
        .and_then(|g| g.envelope())
        .or(raw.primary_envelope)
        .map(|e| e.lower_left())
}

/// Running set of deduplicated errors
pub struct ErrorSet {
    grid: TileGrid,
    entries: BTreeMap<ErrorKey, ReportedError>,
    duplicates: usize,
    not_canonical: usize,
}

impl ErrorSet {
    pub fn new(grid: TileGrid) -> Self {
        Self {
            grid,
            entries: BTreeMap::new(),
            duplicates: 0,
            not_canonical: 0,
        }
    }

    /// Canonical tile of a raw error found while processing `tile`, `None`
    /// when its anchor lies outside the perimeter. Errors without any
    /// locatable geometry stay with `tile`.
    pub fn canonical_tile(&self, tile: &Tile, raw: &RawError) -> Option<usize> {
        match anchor_point(raw) {
            Some(anchor) if self.grid.perimeter().contains_point(&anchor) => {
                Some(self.grid.tile_index_of(&anchor))
            }
            Some(_) => None,
            None => Some(tile.index),
        }
    }

    pub fn fold(&mut self, tile: &Tile, raw: RawError) -> FoldOutcome {
        let Some(canonical) = self.canonical_tile(tile, &raw).filter(|c| *c == tile.index) else {
            self.not_canonical += 1;
            return FoldOutcome::NotCanonical;
        };

        let key = ErrorKey {
            rule: raw.rule.index,
            participants: raw.error.participant_ids(),
            code: raw.error.code.clone(),
            location: raw.error.geometry.as_ref().and_then(|g| g.envelope()).map(|e| quantize(&e)),
            tile: canonical,
        };
        if self.entries.contains_key(&key) {
            self.duplicates += 1;
            return FoldOutcome::Duplicate;
        }
        self.entries.insert(
            key,
            ReportedError {
                rule: raw.rule,
                tile_index: canonical,
                error: raw.error,
            },
        );
        FoldOutcome::Added
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn not_canonical(&self) -> usize {
        self.not_canonical
    }

    /// Errors in report order
    pub fn into_errors(self) -> Vec<ReportedError> {
        self.entries.into_values().collect()
    }
}
