//! Data source collaborator
//!
//! [`DataSource`] is the only boundary to storage back-ends: an envelope
//! query, a row fetch and the table extent. [`MemoryDataSource`] keeps rows
//! in memory behind an R-tree per table and counts every call, which makes
//! it the fixture of choice for engine tests.

use parking_lot::Mutex;
use rstar::{RTree, RTreeObject, AABB};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;

use super::error::DataSourceError;
use super::types::{Row, RowId, RowRef, TableId};
use crate::geometry::Envelope;

pub trait DataSource: Send + Sync {
    /// Overall extent of the table, `None` when it holds no geometry
    fn table_extent(&self, table: &TableId) -> Result<Option<Envelope>, DataSourceError>;

    /// Ids of rows whose geometry envelope intersects `envelope`
    fn query_envelope(&self, table: &TableId, envelope: &Envelope) -> Result<Vec<RowId>, DataSourceError>;

    fn fetch_row(&self, table: &TableId, row: RowId) -> Result<Row, DataSourceError>;
}

/// Row wrapper for R-tree indexing
#[derive(Clone, Debug)]
struct IndexedRow {
    id: RowId,
    bounds: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedRow {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

struct MemoryTable {
    rows: HashMap<RowId, Row>,
    index: RTree<IndexedRow>,
    extent: Option<Envelope>,
}

#[derive(Default)]
pub struct MemoryDataSource {
    tables: IndexMap<TableId, MemoryTable>,
    fetches: Mutex<HashMap<RowRef, usize>>,
    queries: AtomicUsize,
}

impl MemoryDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a table. Row references are rewritten to `table`.
    pub fn add_table(&mut self, table: impl Into<TableId>, rows: impl IntoIterator<Item = Row>) {
        let table = table.into();
        let mut by_id = HashMap::new();
        let mut indexed = Vec::new();
        let mut extent: Option<Envelope> = None;

        for mut row in rows {
            row.row_ref.table = table.clone();
            if let Some(env) = row.envelope() {
                indexed.push(IndexedRow { id: row.id(), bounds: env.to_aabb() });
                extent = Some(match extent {
                    Some(e) => e.union(&env),
                    None => env,
                });
            }
            by_id.insert(row.id(), row);
        }

        self.tables.insert(
            table,
            MemoryTable {
                rows: by_id,
                index: RTree::bulk_load(indexed),
                extent,
            },
        );
    }

    pub fn with_table(mut self, table: impl Into<TableId>, rows: impl IntoIterator<Item = Row>) -> Self {
        self.add_table(table, rows);
        self
    }

    /// Number of `fetch_row` calls made for one row
    pub fn fetch_count(&self, row_ref: &RowRef) -> usize {
        self.fetches.lock().get(row_ref).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().values().sum()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn reset_counters(&self) {
        self.fetches.lock().clear();
        self.queries.store(0, Ordering::Relaxed);
    }

    fn table(&self, table: &TableId) -> Result<&MemoryTable, DataSourceError> {
        self.tables
            .get(table)
            .ok_or_else(|| DataSourceError::UnknownTable(table.clone()))
    }
}

impl DataSource for MemoryDataSource {
    fn table_extent(&self, table: &TableId) -> Result<Option<Envelope>, DataSourceError> {
        Ok(self.table(table)?.extent)
    }

    fn query_envelope(&self, table: &TableId, envelope: &Envelope) -> Result<Vec<RowId>, DataSourceError> {
        let t = self.table(table)?;
        self.queries.fetch_add(1, Ordering::Relaxed);
        let mut ids: Vec<RowId> = t
            .index
            .locate_in_envelope_intersecting(&envelope.to_aabb())
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    fn fetch_row(&self, table: &TableId, row: RowId) -> Result<Row, DataSourceError> {
        let t = self.table(table)?;
        *self
            .fetches
            .lock()
            .entry(RowRef::new(table.clone(), row))
            .or_insert(0) += 1;
        t.rows
            .get(&row)
            .cloned()
            .ok_or_else(|| DataSourceError::RowNotFound { table: table.clone(), row })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Geometry, Point};

    fn point_row(id: RowId, x: f64, y: f64) -> Row {
        Row::new(RowRef::new("pts", id), Geometry::point(Point::new(x, y)))
    }

    #[test]
    fn test_envelope_query_is_sorted_and_closed() {
        let source = MemoryDataSource::new().with_table(
            "pts",
            vec![point_row(3, 5.0, 5.0), point_row(1, 10.0, 10.0), point_row(2, 50.0, 50.0)],
        );
        let ids = source
            .query_envelope(&"pts".into(), &Envelope::new(0.0, 0.0, 10.0, 10.0))
            .unwrap();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(source.query_count(), 1);
    }

    #[test]
    fn test_extent_and_fetch_counts() {
        let source = MemoryDataSource::new()
            .with_table("pts", vec![point_row(1, 0.0, 0.0), point_row(2, 4.0, 3.0)]);
        let extent = source.table_extent(&"pts".into()).unwrap().unwrap();
        assert_eq!((extent.xmax, extent.ymax), (4.0, 3.0));

        source.fetch_row(&"pts".into(), 2).unwrap();
        source.fetch_row(&"pts".into(), 2).unwrap();
        assert_eq!(source.fetch_count(&RowRef::new("pts", 2)), 2);
        assert!(matches!(
            source.fetch_row(&"pts".into(), 9),
            Err(DataSourceError::RowNotFound { row: 9, .. })
        ));
        assert!(matches!(
            source.table_extent(&"nope".into()),
            Err(DataSourceError::UnknownTable(_))
        ));
    }
}
