//! Read-through row cache shared by tile workers
//!
//! A fetched row stays cached until every tile that can see it has
//! completed. Its visibility window ends at the last tile (in row-major
//! order) whose envelope, expanded by the largest search tolerance used on
//! the row's table, reaches the row's envelope. Completed tiles advance a
//! watermark (the longest completed prefix of tile indices), and rows whose
//! window ends at or below the watermark are evicted.
//!
//! Concurrent lookups of the same row wait on a per-row slot, so a row is
//! fetched at most once at a time; distinct rows are fetched in parallel.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::config::RetryPolicy;
use super::error::DataSourceError;
use super::source::DataSource;
use super::tiling::TileGrid;
use super::types::{Row, RowRef, TableId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub evictions: usize,
    pub peak_rows: usize,
}

#[derive(Default)]
struct Slot {
    row: Mutex<Option<Arc<Row>>>,
}

struct Entry {
    slot: Arc<Slot>,
    /// Last tile index that can still need this row
    last_visible: usize,
}

#[derive(Default)]
struct Completion {
    watermark: Option<usize>,
    pending: BTreeSet<usize>,
}

pub struct RowCache<'a> {
    source: &'a dyn DataSource,
    retry: RetryPolicy,
    grid: TileGrid,
    tolerances: HashMap<TableId, f64>,
    entries: Mutex<HashMap<RowRef, Entry>>,
    completion: Mutex<Completion>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    evictions: AtomicUsize,
    peak_rows: AtomicUsize,
}

impl<'a> RowCache<'a> {
    /// `tolerances` holds, per table, the largest search tolerance any rule
    /// applies to it
    pub fn new(
        source: &'a dyn DataSource,
        retry: RetryPolicy,
        grid: TileGrid,
        tolerances: HashMap<TableId, f64>,
    ) -> Self {
        Self {
            source,
            retry,
            grid,
            tolerances,
            entries: Mutex::new(HashMap::new()),
            completion: Mutex::new(Completion::default()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            evictions: AtomicUsize::new(0),
            peak_rows: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, row_ref: &RowRef) -> Result<Arc<Row>, DataSourceError> {
        let slot = {
            let mut entries = self.entries.lock();
            let slot = entries
                .entry(row_ref.clone())
                .or_insert_with(|| Entry {
                    slot: Arc::new(Slot::default()),
                    last_visible: usize::MAX,
                })
                .slot
                .clone();
            self.peak_rows.fetch_max(entries.len(), Ordering::Relaxed);
            slot
        };

        let mut guard = slot.row.lock();
        if let Some(row) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(row.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let what = format!("fetch of row {}", row_ref);
        let fetched = self
            .retry
            .run(&what, || self.source.fetch_row(&row_ref.table, row_ref.row));
        let row = match fetched {
            Ok(row) => Arc::new(row),
            Err(e) => {
                drop(guard);
                let mut entries = self.entries.lock();
                if entries.get(row_ref).is_some_and(|e| Arc::ptr_eq(&e.slot, &slot)) {
                    entries.remove(row_ref);
                }
                return Err(e);
            }
        };
        *guard = Some(row.clone());
        drop(guard);

        let tolerance = self.tolerances.get(&row_ref.table).copied().unwrap_or(0.0);
        let last_visible = row
            .envelope()
            .map(|env| self.grid.last_visible_tile(&env, tolerance))
            .unwrap_or(0);
        if let Some(entry) = self.entries.lock().get_mut(row_ref) {
            entry.last_visible = last_visible;
        }
        Ok(row)
    }

    /// Drop every cached row of `table`
    pub fn invalidate(&self, table: &TableId) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| key.table != *table);
        let removed = before - entries.len();
        self.evictions.fetch_add(removed, Ordering::Relaxed);
        debug!("[QA cache] invalidated {} rows of {}", removed, table);
    }

    /// Record a finished tile and evict rows no outstanding tile can need
    pub fn tile_completed(&self, index: usize) {
        let watermark = {
            let mut completion = self.completion.lock();
            completion.pending.insert(index);
            let mut next = completion.watermark.map_or(0, |w| w + 1);
            while completion.pending.remove(&next) {
                completion.watermark = Some(next);
                next += 1;
            }
            completion.watermark
        };

        let Some(watermark) = watermark else {
            return;
        };
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.last_visible > watermark);
        let evicted = before - entries.len();
        if evicted > 0 {
            self.evictions.fetch_add(evicted, Ordering::Relaxed);
            debug!("[QA cache] evicted {} rows after tile {} (watermark {})", evicted, index, watermark);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            peak_rows: self.peak_rows.load(Ordering::Relaxed),
        }
    }
}
