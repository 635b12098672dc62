//! Coincident geometries within one table

use crate::engine::{QaError, TableId};
use crate::geometry::Geometry;

use super::{QaRule, RuleInput};

pub const CODE_DUPLICATE: &str = "DuplicateGeometry.Coincident";

/// Reports pairs of rows whose geometries have the same shape and vertex
/// sequence within `tolerance`
#[derive(Debug, Clone)]
pub struct DuplicateGeometry {
    tables: [TableId; 1],
    tolerance: f64,
}

impl DuplicateGeometry {
    pub fn new(table: impl Into<TableId>, tolerance: f64) -> Self {
        Self { tables: [table.into()], tolerance }
    }

    fn coincident(&self, a: &Geometry, b: &Geometry) -> bool {
        if a.kind() != b.kind() || a.is_empty() || a.vertex_count() != b.vertex_count() {
            return false;
        }
        a.vertices()
            .iter()
            .zip(b.vertices().iter())
            .all(|(va, vb)| va.distance(vb) <= self.tolerance)
    }
}

impl QaRule for DuplicateGeometry {
    fn name(&self) -> &str {
        "DuplicateGeometry"
    }

    fn tables(&self) -> &[TableId] {
        &self.tables
    }

    fn search_tolerance(&self) -> f64 {
        self.tolerance
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> anyhow::Result<Vec<QaError>> {
        let mut errors = Vec::new();
        for (a, b) in input.unique_pairs(0) {
            // Cheap envelope rejection before comparing vertices
            let (Some(env_a), Some(env_b)) = (a.envelope(), b.envelope()) else {
                continue;
            };
            if !env_a.expand(self.tolerance).intersects(&env_b) {
                continue;
            }
            if self.coincident(&a.geometry, &b.geometry) {
                errors.push(
                    QaError::new(
                        format!("Geometry coincides with row {}", b.id()),
                        vec![a.row_ref.clone(), b.row_ref.clone()],
                    )
                    .with_code(CODE_DUPLICATE)
                    .with_geometry(a.geometry.clone()),
                );
            }
        }
        Ok(errors)
    }
}
