//! Features with too many vertices

use crate::engine::{QaError, TableId};
use crate::geometry::GeometryComponent;

use super::{QaRule, RuleInput};

pub const CODE_TOO_MANY_VERTICES: &str = "MaxVertexCount.TooManyVertices";

#[derive(Debug, Clone)]
pub struct MaxVertexCount {
    tables: [TableId; 1],
    limit: usize,
}

impl MaxVertexCount {
    pub fn new(table: impl Into<TableId>, limit: usize) -> Self {
        Self { tables: [table.into()], limit }
    }
}

impl QaRule for MaxVertexCount {
    fn name(&self) -> &str {
        "MaxVertexCount"
    }

    fn tables(&self) -> &[TableId] {
        &self.tables
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> anyhow::Result<Vec<QaError>> {
        Ok(input
            .rows(0)
            .iter()
            .filter(|row| row.geometry.vertex_count() > self.limit)
            .map(|row| {
                QaError::new(
                    format!(
                        "Feature has {} vertices (maximum {})",
                        row.geometry.vertex_count(),
                        self.limit
                    ),
                    vec![row.row_ref.clone()],
                )
                .with_code(CODE_TOO_MANY_VERTICES)
                .with_component(GeometryComponent::Vertices)
            })
            .collect())
    }
}
