//! Engine data types
//!
//! Row references, cached rows, QA errors and the cancellation flag shared
//! by the runner and its tile workers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::geometry::{Envelope, Geometry, GeometryComponent};

/// Identifier of an input table within a data source
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub String);

impl TableId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TableId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub type RowId = u64;

/// (table, row) pair, unique within a run
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RowRef {
    pub table: TableId,
    pub row: RowId,
}

impl RowRef {
    pub fn new(table: impl Into<TableId>, row: RowId) -> Self {
        Self { table: table.into(), row }
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.table, self.row)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Double(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("<null>"),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Double(v) => write!(f, "{}", v),
            FieldValue::Text(v) => f.write_str(v),
        }
    }
}

/// Read-only copy of a data source record
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub row_ref: RowRef,
    pub geometry: Geometry,
    pub attributes: IndexMap<String, FieldValue>,
}

impl Row {
    pub fn new(row_ref: RowRef, geometry: Geometry) -> Self {
        Self { row_ref, geometry, attributes: IndexMap::new() }
    }

    pub fn with_value(mut self, field: &str, value: FieldValue) -> Self {
        self.attributes.insert(field.to_string(), value);
        self
    }

    pub fn id(&self) -> RowId {
        self.row_ref.row
    }

    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.attributes.get(field)
    }

    pub fn envelope(&self) -> Option<Envelope> {
        self.geometry.envelope()
    }
}

/// A violation reported by a rule.
///
/// `involved_rows[0]` is the primary participant. When `geometry` is unset
/// and `component` is set, the execution context extracts that component of
/// the primary participant's geometry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QaError {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub involved_rows: Vec<RowRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(skip)]
    pub component: Option<GeometryComponent>,
}

impl QaError {
    pub fn new(description: impl Into<String>, involved_rows: Vec<RowRef>) -> Self {
        Self {
            description: description.into(),
            code: None,
            involved_rows,
            geometry: None,
            component: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn with_component(mut self, component: GeometryComponent) -> Self {
        self.component = Some(component);
        self
    }

    pub fn primary_row(&self) -> Option<&RowRef> {
        self.involved_rows.first()
    }

    /// Participants sorted and deduplicated
    pub fn participant_ids(&self) -> Vec<RowRef> {
        let mut ids = self.involved_rows.clone();
        ids.sort();
        ids.dedup();
        ids
    }
}

/// Position of a rule in the rule set passed to the runner, plus its name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RuleId {
    pub index: usize,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    Completed,
    Aborted,
    Cancelled,
}

/// Cooperative cancellation flag, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
