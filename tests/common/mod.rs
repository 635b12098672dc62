// Shared fixtures for the engine integration tests
#![allow(dead_code)]

use tiled_qa::engine::{ErrorReport, FieldValue, MemoryDataSource, QaError, Row, RowRef};
use tiled_qa::geometry::{Geometry, Point};
use tiled_qa::rules::{DuplicateGeometry, FieldConstraint, MaxVertexCount, PointNotNearLine, QaRule};

pub fn point_row(table: &str, id: u64, x: f64, y: f64) -> Row {
    Row::new(RowRef::new(table, id), Geometry::point(Point::new(x, y)))
}

pub fn line_row(table: &str, id: u64, coords: &[(f64, f64)]) -> Row {
    Row::new(
        RowRef::new(table, id),
        Geometry::line(coords.iter().map(|&(x, y)| Point::new(x, y)).collect()),
    )
}

/// Points (every fifth one doubled with a small offset) and lines carrying a `kind` attribute
pub fn dataset(points: &[(f64, f64)], lines: &[Vec<(f64, f64)>]) -> MemoryDataSource {
    let mut point_rows = Vec::new();
    let mut id = 1;
    for (i, &(x, y)) in points.iter().enumerate() {
        point_rows.push(point_row("points", id, x, y));
        id += 1;
        if i % 5 == 0 {
            point_rows.push(point_row("points", id, x + 0.5, y));
            id += 1;
        }
    }
    let line_rows = lines.iter().enumerate().map(|(i, coords)| {
        line_row("lines", i as u64 + 1, coords).with_value("kind", FieldValue::Integer(i as i64 % 3))
    });
    MemoryDataSource::new()
        .with_table("points", point_rows)
        .with_table("lines", line_rows)
}

pub fn rule_set() -> Vec<Box<dyn QaRule>> {
    vec![
        Box::new(PointNotNearLine::new("points", "lines", 25.0)),
        Box::new(DuplicateGeometry::new("points", 1.0)),
        Box::new(MaxVertexCount::new("lines", 3)),
        Box::new(
            FieldConstraint::new("lines", "kind")
                .required()
                .allowed_values(vec![FieldValue::Integer(0), FieldValue::Integer(1)]),
        ),
    ]
}

/// Report errors without tile attribution
pub fn findings(report: &ErrorReport) -> Vec<(String, QaError)> {
    report
        .errors
        .iter()
        .map(|e| (e.rule.name.clone(), e.error.clone()))
        .collect()
}
