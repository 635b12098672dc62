//! Tile scheduling
//!
//! A [`TileGrid`] partitions the processing perimeter into square tiles
//! anchored at the perimeter's lower-left corner, indexed in row-major
//! order (left to right, then bottom to top). The last column and row are
//! clipped to the perimeter and may be narrower than the tile size.
//!
//! Point ownership is half-open: a tile owns `[xmin, xmax) x [ymin, ymax)`,
//! except that the last column and row also own the perimeter's max edge.
//! Lookups of points outside the perimeter clamp onto the nearest tile;
//! callers that must not own such points check the perimeter first.

use serde::Serialize;

use super::config::{validate_tile_size, RetryPolicy};
use super::error::{ConfigError, DataSourceError};
use super::source::DataSource;
use super::types::{RowRef, TableId};
use crate::geometry::{Envelope, Point};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tile {
    pub index: usize,
    pub column: usize,
    pub row: usize,
    pub envelope: Envelope,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    perimeter: Envelope,
    tile_size: Option<f64>,
    columns: usize,
    rows: usize,
}

/// Partition `perimeter` into tiles of `tile_size`
pub fn enumerate_tiles(perimeter: Envelope, tile_size: Option<f64>) -> Result<TileGrid, ConfigError> {
    TileGrid::new(perimeter, tile_size)
}

/// Cells along one axis, `None` when the count does not fit a `usize`
fn cell_count(extent: f64, size: Option<f64>) -> Option<usize> {
    let Some(s) = size else {
        return Some(1);
    };
    let cells = (extent / s).ceil();
    if !cells.is_finite() || cells >= usize::MAX as f64 {
        return None;
    }
    Some((cells as usize).max(1))
}

impl TileGrid {
    pub fn new(perimeter: Envelope, tile_size: Option<f64>) -> Result<Self, ConfigError> {
        if perimeter.is_empty() {
            return Err(ConfigError::EmptyPerimeter);
        }
        let tile_size = match tile_size {
            Some(s) => {
                validate_tile_size(s)?;
                if s.is_infinite() {
                    None
                } else {
                    Some(s)
                }
            }
            None => None,
        };
        let too_many = || ConfigError::TooManyTiles {
            width: perimeter.width(),
            height: perimeter.height(),
            tile_size: tile_size.unwrap_or(f64::INFINITY),
        };
        let columns = cell_count(perimeter.width(), tile_size).ok_or_else(too_many)?;
        let rows = cell_count(perimeter.height(), tile_size).ok_or_else(too_many)?;
        columns.checked_mul(rows).ok_or_else(too_many)?;
        Ok(Self {
            perimeter,
            tile_size,
            columns,
            rows,
        })
    }

    pub fn perimeter(&self) -> &Envelope {
        &self.perimeter
    }

    /// `None` when tiling is disabled
    pub fn tile_size(&self) -> Option<f64> {
        self.tile_size
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.columns * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_single_tile(&self) -> bool {
        self.len() == 1
    }

    fn column_min(&self, column: usize) -> f64 {
        match self.tile_size {
            Some(s) if column > 0 => self.perimeter.xmin + column as f64 * s,
            _ => self.perimeter.xmin,
        }
    }

    fn row_min(&self, row: usize) -> f64 {
        match self.tile_size {
            Some(s) if row > 0 => self.perimeter.ymin + row as f64 * s,
            _ => self.perimeter.ymin,
        }
    }

    pub fn tile(&self, index: usize) -> Option<Tile> {
        if index >= self.len() {
            return None;
        }
        let column = index % self.columns;
        let row = index / self.columns;
        let xmax = if column + 1 == self.columns {
            self.perimeter.xmax
        } else {
            self.column_min(column + 1)
        };
        let ymax = if row + 1 == self.rows {
            self.perimeter.ymax
        } else {
            self.row_min(row + 1)
        };
        Some(Tile {
            index,
            column,
            row,
            envelope: Envelope::new(self.column_min(column), self.row_min(row), xmax, ymax),
        })
    }

    /// Lazy, restartable sequence of all tiles in index order
    pub fn iter(&self) -> Tiles<'_> {
        Tiles { grid: self, next: 0 }
    }

    fn cell_of(value: f64, origin: f64, size: Option<f64>, count: usize) -> usize {
        let Some(s) = size else {
            return 0;
        };
        let cell = ((value - origin) / s).floor();
        if cell.is_nan() || cell < 0.0 {
            return 0;
        }
        let cell = (cell as usize).min(count - 1);
        // Agree with the tile envelopes, whose bounds are origin + cell * s
        if cell > 0 && origin + cell as f64 * s > value {
            cell - 1
        } else if cell + 1 < count && origin + (cell + 1) as f64 * s <= value {
            cell + 1
        } else {
            cell
        }
    }

    pub fn column_of(&self, x: f64) -> usize {
        Self::cell_of(x, self.perimeter.xmin, self.tile_size, self.columns)
    }

    pub fn row_of(&self, y: f64) -> usize {
        Self::cell_of(y, self.perimeter.ymin, self.tile_size, self.rows)
    }

    /// Index of the tile owning `p` (clamped into the perimeter)
    pub fn tile_index_of(&self, p: &Point) -> usize {
        self.row_of(p.y) * self.columns + self.column_of(p.x)
    }

    /// Highest tile index whose envelope, expanded by `tolerance`, reaches `envelope`
    pub fn last_visible_tile(&self, envelope: &Envelope, tolerance: f64) -> usize {
        self.row_of(envelope.ymax + tolerance) * self.columns + self.column_of(envelope.xmax + tolerance)
    }
}

pub struct Tiles<'a> {
    grid: &'a TileGrid,
    next: usize,
}

impl Iterator for Tiles<'_> {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let tile = self.grid.tile(self.next)?;
        self.next += 1;
        Some(tile)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Tiles<'_> {}

/// Resolves the rows each tile must look at
pub struct TileScheduler<'a> {
    source: &'a dyn DataSource,
    retry: RetryPolicy,
}

impl<'a> TileScheduler<'a> {
    pub fn new(source: &'a dyn DataSource, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    /// Rows of `table` whose envelope intersects the tile expanded by
    /// `search_tolerance`, in ascending row id order
    pub fn candidate_rows(
        &self,
        tile: &Tile,
        table: &TableId,
        search_tolerance: f64,
    ) -> Result<Vec<RowRef>, DataSourceError> {
        let search = tile.envelope.expand(search_tolerance);
        let what = format!("envelope query on {} for tile {}", table, tile.index);
        let mut ids = self.retry.run(&what, || self.source.query_envelope(table, &search))?;
        ids.sort_unstable();
        ids.dedup();
        Ok(ids.into_iter().map(|id| RowRef::new(table.clone(), id)).collect())
    }
}
