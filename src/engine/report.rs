//! Final run report
//!
//! QA errors (findings in the data) and engine faults (operational
//! failures) are kept in separate collections.

use serde::Serialize;

use super::cache::CacheStats;
use super::dedup::ReportedError;
use super::error::EngineFault;
use super::types::RunStatus;
use crate::geometry::{Geometry, GeometryComponent};

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub status: RunStatus,
    pub errors: Vec<ReportedError>,
    pub faults: Vec<EngineFault>,
    pub tiles_total: usize,
    pub tiles_processed: usize,
    pub cache: CacheStats,
}

impl ErrorReport {
    pub fn errors(&self) -> &[ReportedError] {
        &self.errors
    }

    pub fn faults(&self) -> &[EngineFault] {
        &self.faults
    }

    pub fn is_completed(&self) -> bool {
        self.status == RunStatus::Completed
    }

    /// Errors reported by the rule named `rule`
    pub fn errors_of<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a ReportedError> + 'a {
        self.errors.iter().filter(move |e| e.rule.name == rule)
    }

    /// `component` of every error geometry, skipping errors where it is empty
    pub fn component_geometries(&self, component: GeometryComponent) -> Vec<Geometry> {
        self.errors
            .iter()
            .filter_map(|e| e.component_geometry(component))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
