// End-to-end runner behaviour: dedup across tiles, caching, faults,
// retries and cancellation
mod common;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::collections::HashMap;

use common::{dataset, findings, line_row, point_row, rule_set};
use tiled_qa::engine::{
    CancellationToken, DataSource, DataSourceError, FaultKind, MemoryDataSource, QaError, Row,
    RowId, RowRef, RunConfig, RunStatus, TableId, TestRunner,
};
use tiled_qa::geometry::{Envelope, GeometryComponent};
use tiled_qa::rules::{
    DuplicateGeometry, MaxVertexCount, QaRule, RuleInput, CODE_DUPLICATE, CODE_TOO_MANY_VERTICES,
};

/// Fails the first `failures` fetches of every row in `rows`
struct FlakySource {
    inner: MemoryDataSource,
    rows: Vec<RowId>,
    failures: usize,
    seen: Mutex<HashMap<RowRef, usize>>,
}

impl FlakySource {
    fn new(inner: MemoryDataSource, rows: Vec<RowId>, failures: usize) -> Self {
        Self { inner, rows, failures, seen: Mutex::new(HashMap::new()) }
    }
}

impl DataSource for FlakySource {
    fn table_extent(&self, table: &TableId) -> Result<Option<Envelope>, DataSourceError> {
        self.inner.table_extent(table)
    }

    fn query_envelope(&self, table: &TableId, envelope: &Envelope) -> Result<Vec<RowId>, DataSourceError> {
        self.inner.query_envelope(table, envelope)
    }

    fn fetch_row(&self, table: &TableId, row: RowId) -> Result<Row, DataSourceError> {
        if self.rows.contains(&row) {
            let mut seen = self.seen.lock();
            let count = seen.entry(RowRef::new(table.clone(), row)).or_insert(0);
            *count += 1;
            if *count <= self.failures {
                return Err(anyhow::anyhow!("connection reset").into());
            }
        }
        self.inner.fetch_row(table, row)
    }
}

/// Reports every row and cancels the run while evaluating `tile`
struct CancelOnTile {
    tables: Vec<TableId>,
    tile: usize,
    cancel: CancellationToken,
}

impl QaRule for CancelOnTile {
    fn name(&self) -> &str {
        "cancel-on-tile"
    }
    fn tables(&self) -> &[TableId] {
        &self.tables
    }
    fn evaluate(&self, input: &RuleInput<'_>) -> anyhow::Result<Vec<QaError>> {
        if input.tile().index == self.tile {
            self.cancel.cancel();
        }
        Ok(input
            .rows(0)
            .iter()
            .map(|r| QaError::new("seen", vec![r.row_ref.clone()]).with_component(GeometryComponent::LineStartPoint))
            .collect())
    }
}

fn straddling_source() -> MemoryDataSource {
    MemoryDataSource::new()
        .with_table(
            "points",
            vec![
                // Coincident pair on both sides of x = 100
                point_row("points", 1, 99.8, 50.0),
                point_row("points", 2, 100.3, 50.0),
                point_row("points", 3, 10.0, 10.0),
            ],
        )
        .with_table(
            "lines",
            vec![
                // Spans all four tiles
                line_row("lines", 1, &[(5.0, 50.0), (150.0, 55.0), (250.0, 45.0), (395.0, 50.0)]),
                line_row("lines", 2, &[(10.0, 20.0), (20.0, 20.0)]),
            ],
        )
}

fn straddling_rules() -> Vec<Box<dyn QaRule>> {
    vec![
        Box::new(DuplicateGeometry::new("points", 1.0)),
        Box::new(MaxVertexCount::new("lines", 3)),
    ]
}

fn perimeter() -> Option<Envelope> {
    Some(Envelope::new(0.0, 0.0, 400.0, 100.0))
}

#[test]
fn test_no_duplicates_across_adjacent_tiles() {
    let source = straddling_source();
    let rules = straddling_rules();

    for workers in [1, 4] {
        let runner = TestRunner::new(&source, RunConfig::default().with_workers(workers));
        let report = runner.execute(&rules, perimeter(), Some(100.0)).unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(report.tiles_total, 4);

        let codes: Vec<Option<&str>> = report.errors.iter().map(|e| e.error.code.as_deref()).collect();
        assert_eq!(codes, vec![Some(CODE_DUPLICATE), Some(CODE_TOO_MANY_VERTICES)]);

        let duplicate = &report.errors[0];
        assert_eq!(
            duplicate.error.participant_ids(),
            vec![RowRef::new("points", 1), RowRef::new("points", 2)]
        );
        assert_eq!(duplicate.tile_index, 0);
        // Line spans every tile but is reported once, by the tile holding its lower-left corner
        assert_eq!(report.errors[1].tile_index, 0);
    }
}

#[test]
fn test_rerun_is_idempotent() {
    let points = [(12.0, 40.0), (480.0, 300.0), (310.0, 905.0), (700.0, 120.0), (55.0, 610.0)];
    let lines = vec![
        vec![(0.0, 0.0), (500.0, 520.0)],
        vec![(300.0, 900.0), (320.0, 880.0), (340.0, 905.0), (400.0, 990.0)],
        vec![(690.0, 100.0), (720.0, 140.0)],
    ];
    let source = dataset(&points, &lines);
    let rules = rule_set();
    let runner = TestRunner::new(&source, RunConfig::default().with_tile_size(150.0));

    let first = runner.run(&rules).unwrap();
    let second = runner.run(&rules).unwrap();
    assert!(!first.errors.is_empty());
    assert_eq!(first.errors, second.errors);
    assert_eq!(findings(&first), findings(&second));
}

#[test]
fn test_row_fetched_once_within_its_visibility_window() {
    let source = straddling_source();
    let rules = straddling_rules();
    let runner = TestRunner::new(&source, RunConfig::default());
    let report = runner.execute(&rules, perimeter(), Some(100.0)).unwrap();

    assert_eq!(source.fetch_count(&RowRef::new("lines", 1)), 1);
    assert_eq!(source.fetch_count(&RowRef::new("points", 1)), 1);
    assert_eq!(source.fetch_count(&RowRef::new("points", 2)), 1);
    assert!(report.cache.hits > 0);
    // The short line is only visible from tile 0 and leaves the cache after it
    assert!(report.cache.evictions > 0);
}

#[test]
fn test_parallel_workers_fetch_each_row_once() {
    let source = straddling_source();
    let rules = straddling_rules();
    let runner = TestRunner::new(&source, RunConfig::default().with_workers(3));
    runner.execute(&rules, perimeter(), Some(100.0)).unwrap();
    assert_eq!(source.fetch_count(&RowRef::new("lines", 1)), 1);
}

#[test]
fn test_transient_fetch_failures_are_retried() {
    let source = FlakySource::new(straddling_source(), vec![1], 2);
    let rules = straddling_rules();
    let report = TestRunner::new(&source, RunConfig::default())
        .execute(&rules, perimeter(), Some(100.0))
        .unwrap();
    assert!(report.faults.is_empty());
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn test_exhausted_retries_become_data_source_faults() {
    // Row 3 exists only in "points"; "lines" row 3 does not exist
    let source = FlakySource::new(straddling_source(), vec![3], 100);
    let rules = straddling_rules();
    let report = TestRunner::new(&source, RunConfig::default())
        .execute(&rules, perimeter(), Some(100.0))
        .unwrap();

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.faults.len(), 1);
    let fault = &report.faults[0];
    assert_eq!(fault.kind, FaultKind::DataSource);
    assert_eq!(fault.tile_index, 0);
    assert_eq!(fault.rule, "DuplicateGeometry");
    // The duplicate pair lives in tile 0 too and is lost with the fault;
    // the line rule is unaffected
    let codes: Vec<Option<&str>> = report.errors.iter().map(|e| e.error.code.as_deref()).collect();
    assert_eq!(codes, vec![Some(CODE_TOO_MANY_VERTICES)]);
}

#[test]
fn test_strict_mode_aborts_on_data_source_fault() {
    let source = FlakySource::new(straddling_source(), vec![3], 100);
    let rules = straddling_rules();
    let report = TestRunner::new(&source, RunConfig::default().strict(true))
        .execute(&rules, perimeter(), Some(100.0))
        .unwrap();
    assert_eq!(report.status, RunStatus::Aborted);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.tiles_processed, 0);
}

#[test]
fn test_cancellation_keeps_folded_errors() {
    let source = straddling_source();
    let runner = TestRunner::new(&source, RunConfig::default());
    let rules: Vec<Box<dyn QaRule>> = vec![Box::new(CancelOnTile {
        tables: vec!["lines".into()],
        tile: 1,
        cancel: runner.cancellation_token(),
    })];

    let report = runner.execute(&rules, perimeter(), Some(100.0)).unwrap();
    assert_eq!(report.status, RunStatus::Cancelled);
    assert_eq!(report.tiles_processed, 1);
    let rows: Vec<u64> = report.errors.iter().map(|e| e.error.involved_rows[0].row).collect();
    assert_eq!(rows, vec![1, 2]);
    assert!(report.faults.is_empty());
}

#[test]
fn test_report_json() {
    let source = straddling_source();
    let report = TestRunner::new(&source, RunConfig::default())
        .execute(&straddling_rules(), perimeter(), Some(100.0))
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["status"], "Completed");
    assert_eq!(json["tiles_total"], 4);
    assert_eq!(json["errors"][0]["rule"]["name"], "DuplicateGeometry");
    assert_eq!(json["errors"][1]["involved_rows"][0]["table"], "lines");
}

#[test]
fn test_config_from_json_drives_the_run() {
    let config = RunConfig::from_json_str(r#"{ "tile_size": 100.0, "workers": 2 }"#).unwrap();
    let source = straddling_source();
    let report = TestRunner::new(&source, config).run(&straddling_rules()).unwrap();
    assert!(report.is_completed());
    assert_eq!(report.errors.len(), 2);
}
