//! Points that are not within a tolerance of any line

use crate::engine::{QaError, TableId};
use crate::geometry::{Envelope, Geometry};

use super::distance::point_geometry_distance;
use super::{QaRule, RuleInput};

pub const CODE_NOT_NEAR_LINE: &str = "PointNotNearLine.NoLineWithinTolerance";

/// Reports every point (or multipoint vertex) farther than `tolerance` from
/// all rows of the line table
#[derive(Debug, Clone)]
pub struct PointNotNearLine {
    tables: [TableId; 2],
    tolerance: f64,
}

impl PointNotNearLine {
    pub fn new(points: impl Into<TableId>, lines: impl Into<TableId>, tolerance: f64) -> Self {
        Self { tables: [points.into(), lines.into()], tolerance }
    }
}

impl QaRule for PointNotNearLine {
    fn name(&self) -> &str {
        "PointNotNearLine"
    }

    fn tables(&self) -> &[TableId] {
        &self.tables
    }

    fn search_tolerance(&self) -> f64 {
        self.tolerance
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> anyhow::Result<Vec<QaError>> {
        let lines = input.rows(1);
        let mut errors = Vec::new();

        for point_row in input.rows(0) {
            if input.is_cancelled() {
                break;
            }
            for p in point_row.geometry.vertices() {
                let search = Envelope::from_point(&p).expand(self.tolerance);
                let near = lines
                    .iter()
                    .filter(|line| line.envelope().is_some_and(|env| env.intersects(&search)))
                    .filter_map(|line| point_geometry_distance(p, &line.geometry))
                    .any(|d| d <= self.tolerance);
                if !near {
                    errors.push(
                        QaError::new(
                            format!("Point is not within {} of any line", self.tolerance),
                            vec![point_row.row_ref.clone()],
                        )
                        .with_code(CODE_NOT_NEAR_LINE)
                        .with_geometry(
                            Geometry::point(p)
                                .with_spatial_reference(point_row.geometry.spatial_reference.clone()),
                        ),
                    );
                }
            }
        }

        Ok(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CancellationToken, Row, RowRef, Tile};
    use crate::geometry::Point;
    use crate::rules::CandidateRows;
    use std::sync::Arc;

    #[test]
    fn test_flags_only_distant_points() {
        let tile = Tile { index: 0, column: 0, row: 0, envelope: Envelope::new(0.0, 0.0, 100.0, 100.0) };
        let points = vec![
            Arc::new(Row::new(RowRef::new("pts", 1), Geometry::point(Point::new(5.0, 0.4)))),
            Arc::new(Row::new(RowRef::new("pts", 2), Geometry::point(Point::new(5.0, 3.0)))),
        ];
        let lines = vec![Arc::new(Row::new(
            RowRef::new("lines", 10),
            Geometry::line(vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)]),
        ))];
        let cancel = CancellationToken::new();
        let input = RuleInput::new(
            &tile,
            vec![
                CandidateRows { table: "pts".into(), rows: points },
                CandidateRows { table: "lines".into(), rows: lines },
            ],
            &cancel,
        );

        let rule = PointNotNearLine::new("pts", "lines", 0.5);
        let errors = rule.evaluate(&input).unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].involved_rows, vec![RowRef::new("pts", 2)]);
        assert_eq!(errors[0].code.as_deref(), Some(CODE_NOT_NEAR_LINE));
    }
}
