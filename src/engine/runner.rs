//! Test runner: drives every tile through the rule set and folds the
//! results into one [`ErrorReport`]

use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;
use tracing::{debug, error, info};

use super::cache::RowCache;
use super::config::{validate_tile_size, RunConfig};
use super::context::{RuleExecutionContext, RuleFailure};
use super::dedup::{ErrorSet, FoldOutcome};
use super::error::{ConfigError, EngineFault, QaEngineError, QaResult};
use super::report::ErrorReport;
use super::source::DataSource;
use super::tiling::{Tile, TileGrid, TileScheduler};
use super::types::{CancellationToken, RuleId, RunStatus, TableId};
use crate::geometry::Envelope;
use crate::rules::QaRule;

pub struct TestRunner<'a> {
    source: &'a dyn DataSource,
    config: RunConfig,
    cancel: CancellationToken,
}

impl<'a> TestRunner<'a> {
    pub fn new(source: &'a dyn DataSource, config: RunConfig) -> Self {
        Self {
            source,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that cancels this runner's runs when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run over the union of the rule tables' extents with the configured tile size
    pub fn run(&self, rules: &[Box<dyn QaRule>]) -> QaResult<ErrorReport> {
        self.execute(rules, None, self.config.tile_size)
    }

    /// Run `rules` over `perimeter` (default: union of the extents of all
    /// referenced tables) split into tiles of `tile_size` (`None`: one tile).
    ///
    /// Configuration faults are returned before any tile is scheduled. Rule
    /// and data-source faults during the run end up in the report.
    pub fn execute(
        &self,
        rules: &[Box<dyn QaRule>],
        perimeter: Option<Envelope>,
        tile_size: Option<f64>,
    ) -> QaResult<ErrorReport> {
        let start = Instant::now();

        self.config.validate_execution()?;
        if let Some(size) = tile_size {
            validate_tile_size(size)?;
        }
        validate_rules(rules)?;

        let perimeter = match perimeter {
            Some(p) => p,
            None => self.default_perimeter(rules)?,
        };
        let grid = TileGrid::new(perimeter, tile_size)?;
        let total = grid.len();

        let rule_ids: Vec<RuleId> = rules
            .iter()
            .enumerate()
            .map(|(index, rule)| RuleId { index, name: rule.name().to_string() })
            .collect();

        info!(
            "[QA] Running {} rules over {} tiles ({} x {}) with {} worker(s)",
            rules.len(),
            total,
            grid.columns(),
            grid.rows(),
            self.config.workers
        );

        let cache = RowCache::new(self.source, self.config.retry.clone(), grid.clone(), max_tolerances(rules));
        let context = RuleExecutionContext::new(
            TileScheduler::new(self.source, self.config.retry.clone()),
            &cache,
            self.cancel.clone(),
            self.config.cancel_check_interval,
        );
        let errors = Mutex::new(ErrorSet::new(grid.clone()));
        let faults: Mutex<Vec<EngineFault>> = Mutex::new(Vec::new());
        let aborted = AtomicBool::new(false);
        let processed = AtomicUsize::new(0);

        let process = |tile: Tile| {
            if self.cancel.is_cancelled() || aborted.load(Ordering::SeqCst) {
                return;
            }

            let mut raws = Vec::new();
            for (rule_id, rule) in rule_ids.iter().zip(rules) {
                match context.run_rule(rule_id, rule.as_ref(), &tile) {
                    Ok(mut found) => raws.append(&mut found),
                    Err(RuleFailure::Cancelled) => {
                        debug!("[QA] tile {}: cancelled", tile.index);
                        return;
                    }
                    Err(RuleFailure::Fault(fault)) => {
                        error!(
                            "[QA] tile {}: rule '{}' failed ({:?}): {}",
                            fault.tile_index, fault.rule, fault.kind, fault.message
                        );
                        faults.lock().push(fault);
                        if self.config.strict {
                            aborted.store(true, Ordering::SeqCst);
                            return;
                        }
                    }
                }
            }

            let raw_count = raws.len();
            let added = {
                let mut set = errors.lock();
                raws.into_iter()
                    .map(|raw| set.fold(&tile, raw))
                    .filter(|outcome| *outcome == FoldOutcome::Added)
                    .count()
            };
            cache.tile_completed(tile.index);
            let done = processed.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(
                "[QA] tile {} done ({}/{}): {} raw errors, {} new",
                tile.index, done, total, raw_count, added
            );
        };

        if self.config.workers <= 1 {
            grid.iter().for_each(&process);
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.workers)
                .build()
                .map_err(|e| QaEngineError::WorkerPool(e.to_string()))?;
            pool.install(|| {
                (0..total)
                    .into_par_iter()
                    .filter_map(|index| grid.tile(index))
                    .for_each(&process);
            });
        }

        let tiles_processed = processed.into_inner();
        let status = if aborted.into_inner() {
            RunStatus::Aborted
        } else if tiles_processed < total && self.cancel.is_cancelled() {
            RunStatus::Cancelled
        } else {
            RunStatus::Completed
        };

        let errors = errors.into_inner();
        let (duplicates, not_canonical) = (errors.duplicates(), errors.not_canonical());
        let report = ErrorReport {
            status,
            errors: errors.into_errors(),
            faults: faults.into_inner(),
            tiles_total: total,
            tiles_processed,
            cache: cache.stats(),
        };

        info!(
            "[QA] Run {:?}: {} errors, {} faults, {}/{} tiles in {:.2}s",
            report.status,
            report.errors.len(),
            report.faults.len(),
            report.tiles_processed,
            report.tiles_total,
            start.elapsed().as_secs_f64()
        );
        debug!(
            "[QA] dropped {} duplicate and {} non-canonical raw errors; cache {:?}",
            duplicates, not_canonical, report.cache
        );
        Ok(report)
    }

    fn default_perimeter(&self, rules: &[Box<dyn QaRule>]) -> QaResult<Envelope> {
        let tables: BTreeSet<&TableId> = rules.iter().flat_map(|r| r.tables()).collect();
        let mut perimeter: Option<Envelope> = None;
        for table in tables {
            let what = format!("extent of {}", table);
            let extent = self.config.retry.run(&what, || self.source.table_extent(table))?;
            if let Some(extent) = extent.filter(|e| !e.is_empty()) {
                perimeter = Some(match perimeter {
                    Some(p) => p.union(&extent),
                    None => extent,
                });
            }
        }
        perimeter.ok_or_else(|| ConfigError::EmptyPerimeter.into())
    }
}

fn validate_rules(rules: &[Box<dyn QaRule>]) -> Result<(), ConfigError> {
    if rules.is_empty() {
        return Err(ConfigError::NoRules);
    }
    for rule in rules {
        if rule.tables().is_empty() {
            return Err(ConfigError::NoInputTables { rule: rule.name().to_string() });
        }
        let tolerance = rule.search_tolerance();
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::InvalidTolerance {
                rule: rule.name().to_string(),
                tolerance,
            });
        }
    }
    Ok(())
}

/// Largest search tolerance applied to each table
fn max_tolerances(rules: &[Box<dyn QaRule>]) -> HashMap<TableId, f64> {
    let mut tolerances: HashMap<TableId, f64> = HashMap::new();
    for rule in rules {
        for table in rule.tables() {
            let entry = tolerances.entry(table.clone()).or_insert(0.0);
            *entry = entry.max(rule.search_tolerance());
        }
    }
    tolerances
}
