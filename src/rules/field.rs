//! Attribute constraints

use crate::engine::{FieldValue, QaError, TableId};
use crate::geometry::GeometryComponent;

use super::{QaRule, RuleInput};

pub const CODE_VALUE_MISSING: &str = "FieldConstraint.ValueMissing";
pub const CODE_VALUE_NOT_ALLOWED: &str = "FieldConstraint.ValueNotAllowed";

/// Checks one field: optionally required, optionally restricted to a set of
/// allowed values
#[derive(Debug, Clone)]
pub struct FieldConstraint {
    name: String,
    tables: [TableId; 1],
    field: String,
    required: bool,
    allowed: Option<Vec<FieldValue>>,
}

impl FieldConstraint {
    pub fn new(table: impl Into<TableId>, field: &str) -> Self {
        Self {
            name: format!("FieldConstraint({})", field),
            tables: [table.into()],
            field: field.to_string(),
            required: false,
            allowed: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn allowed_values(mut self, values: Vec<FieldValue>) -> Self {
        self.allowed = Some(values);
        self
    }
}

impl QaRule for FieldConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn tables(&self) -> &[TableId] {
        &self.tables
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> anyhow::Result<Vec<QaError>> {
        let mut errors = Vec::new();
        for row in input.rows(0) {
            let value = row.value(&self.field).filter(|v| !v.is_null());
            match value {
                None if self.required => errors.push(
                    QaError::new(format!("Field '{}' has no value", self.field), vec![row.row_ref.clone()])
                        .with_code(CODE_VALUE_MISSING)
                        .with_component(GeometryComponent::EntireGeometry),
                ),
                Some(v) => {
                    if let Some(allowed) = &self.allowed {
                        if !allowed.contains(v) {
                            errors.push(
                                QaError::new(
                                    format!("Field '{}' has value '{}' which is not allowed", self.field, v),
                                    vec![row.row_ref.clone()],
                                )
                                .with_code(CODE_VALUE_NOT_ALLOWED)
                                .with_component(GeometryComponent::EntireGeometry),
                            );
                        }
                    }
                }
                None => {}
            }
        }
        Ok(errors)
    }
}
