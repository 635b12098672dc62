//! Per-tile rule invocation
//!
//! Resolves a rule's candidate rows for one tile through the scheduler and
//! the row cache, invokes the rule, and turns its output into raw errors
//! ready for attribution. Rule failures and panics are caught here and
//! reported as faults of this tile and rule only.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use super::cache::RowCache;
use super::error::{EngineFault, FaultKind};
use super::tiling::{Tile, TileScheduler};
use super::types::{CancellationToken, QaError, Row, RowRef, RuleId};
use crate::geometry::{extract, Envelope};
use crate::rules::{CandidateRows, QaRule, RuleInput};

/// A rule's error before attribution to its canonical tile
#[derive(Debug, Clone)]
pub struct RawError {
    pub rule: RuleId,
    pub error: QaError,
    /// Envelope of the primary participant, when it could be resolved
    pub primary_envelope: Option<Envelope>,
}

#[derive(Debug)]
pub enum RuleFailure {
    Fault(EngineFault),
    Cancelled,
}

pub struct RuleExecutionContext<'a> {
    scheduler: TileScheduler<'a>,
    cache: &'a RowCache<'a>,
    cancel: CancellationToken,
    cancel_check_interval: usize,
}

impl<'a> RuleExecutionContext<'a> {
    pub fn new(
        scheduler: TileScheduler<'a>,
        cache: &'a RowCache<'a>,
        cancel: CancellationToken,
        cancel_check_interval: usize,
    ) -> Self {
        Self {
            scheduler,
            cache,
            cancel,
            cancel_check_interval: cancel_check_interval.max(1),
        }
    }

    /// Run `rule` over the candidate rows of `tile`
    pub fn run_rule(&self, rule_id: &RuleId, rule: &dyn QaRule, tile: &Tile) -> Result<Vec<RawError>, RuleFailure> {
        let fault = |kind: FaultKind, message: String| {
            RuleFailure::Fault(EngineFault {
                tile_index: tile.index,
                rule: rule_id.name.clone(),
                kind,
                message,
            })
        };

        let tolerance = rule.search_tolerance();
        let mut tables = Vec::with_capacity(rule.tables().len());
        let mut by_ref: HashMap<RowRef, Arc<Row>> = HashMap::new();
        let mut fetched = 0usize;

        for table in rule.tables() {
            let refs = self
                .scheduler
                .candidate_rows(tile, table, tolerance)
                .map_err(|e| fault(FaultKind::DataSource, e.to_string()))?;

            let mut rows = Vec::with_capacity(refs.len());
            for row_ref in refs {
                if fetched % self.cancel_check_interval == 0 && self.cancel.is_cancelled() {
                    return Err(RuleFailure::Cancelled);
                }
                fetched += 1;
                let row = self
                    .cache
                    .get(&row_ref)
                    .map_err(|e| fault(FaultKind::DataSource, e.to_string()))?;
                by_ref.insert(row_ref, row.clone());
                rows.push(row);
            }
            tables.push(CandidateRows { table: table.clone(), rows });
        }

        let input = RuleInput::new(tile, tables, &self.cancel);
        debug!(
            "[QA] tile {}: evaluating '{}' on {} candidate rows",
            tile.index,
            rule_id.name,
            input.row_count()
        );

        let errors = match catch_unwind(AssertUnwindSafe(|| rule.evaluate(&input))) {
            Ok(Ok(errors)) => errors,
            Ok(Err(e)) => return Err(fault(FaultKind::Rule, format!("{:#}", e))),
            Err(payload) => return Err(fault(FaultKind::Rule, panic_message(payload))),
        };
        if self.cancel.is_cancelled() {
            return Err(RuleFailure::Cancelled);
        }

        Ok(errors
            .into_iter()
            .map(|error| self.resolve(rule_id, error, &by_ref))
            .collect())
    }

    /// Attach the primary participant's envelope and any requested component geometry
    fn resolve(&self, rule_id: &RuleId, mut error: QaError, rows: &HashMap<RowRef, Arc<Row>>) -> RawError {
        let primary = error.primary_row().and_then(|r| {
            rows.get(r).cloned().or_else(|| match self.cache.get(r) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!("[QA] rule '{}' reported unresolvable row {}: {}", rule_id.name, r, e);
                    None
                }
            })
        });

        if error.geometry.is_none() {
            if let (Some(component), Some(row)) = (error.component, primary.as_ref()) {
                let geometry = extract(&row.geometry, component);
                if !geometry.is_empty() {
                    error.geometry = Some(geometry);
                }
            }
        }

        RawError {
            rule: rule_id.clone(),
            primary_envelope: primary.and_then(|row| row.envelope()),
            error,
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("rule panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("rule panicked: {}", s)
    } else {
        "rule panicked".to_string()
    }
}
