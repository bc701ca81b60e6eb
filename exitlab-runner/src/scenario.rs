//! Scenario runner: one simulation per target, data-parallel with a bounded
//! worker pool.
//!
//! Each simulation owns its own state, so no synchronization exists between
//! targets. Fail-fast mode stops *scheduling* new targets after the first
//! failure; in-flight targets still finish, and a failed target never
//! corrupts another's run.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ErrorMode, ScenarioConfig, TargetSpec};
use crate::source::CandleSource;
use exitlab_core::domain::SimulationResult;
use exitlab_core::simulate;

/// Per-target outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TargetStatus {
    Completed { result: SimulationResult },
    Failed { reason: String },
    /// Not scheduled because an earlier target failed in fail-fast mode.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: TargetSpec,
    #[serde(flatten)]
    pub status: TargetStatus,
}

/// Batch-level aggregation consumed by reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub run_id: String,
    pub outcomes: Vec<TargetOutcome>,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Executes a scenario against a candle source.
pub struct ScenarioRunner<S> {
    source: S,
}

impl<S: CandleSource> ScenarioRunner<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Run every target, respecting the configured concurrency bound and
    /// error mode. Outcomes come back in target order regardless of the
    /// parallel schedule.
    pub fn run(&self, config: &ScenarioConfig) -> Result<ScenarioSummary> {
        let run_id = config.run_id();
        info!(run_id = %run_id, targets = config.targets.len(), "starting scenario batch");

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.concurrency)
            .build()
            .context("failed to build scenario worker pool")?;

        let abort = AtomicBool::new(false);
        let fail_fast = config.error_mode == ErrorMode::FailFast;

        let outcomes: Vec<TargetOutcome> = pool.install(|| {
            config
                .targets
                .par_iter()
                .map(|target| {
                    if fail_fast && abort.load(Ordering::Relaxed) {
                        return TargetOutcome {
                            target: target.clone(),
                            status: TargetStatus::Skipped,
                        };
                    }
                    let status = self.run_target(target, config);
                    if fail_fast && matches!(status, TargetStatus::Failed { .. }) {
                        abort.store(true, Ordering::Relaxed);
                    }
                    TargetOutcome {
                        target: target.clone(),
                        status,
                    }
                })
                .collect()
        });

        let succeeded = outcomes
            .iter()
            .filter(|o| matches!(o.status, TargetStatus::Completed { .. }))
            .count();
        let failed = outcomes
            .iter()
            .filter(|o| matches!(o.status, TargetStatus::Failed { .. }))
            .count();
        let skipped = outcomes
            .iter()
            .filter(|o| matches!(o.status, TargetStatus::Skipped))
            .count();
        info!(succeeded, failed, skipped, "scenario batch finished");

        Ok(ScenarioSummary {
            run_id,
            outcomes,
            succeeded,
            failed,
            skipped,
        })
    }

    fn run_target(&self, target: &TargetSpec, config: &ScenarioConfig) -> TargetStatus {
        match self.source.candles(target) {
            Ok(candles) => {
                let result = simulate(&candles, &config.strategy);
                info!(
                    target = %target.label(),
                    candles = candles.len(),
                    final_pnl = result.final_pnl,
                    events = result.events.len(),
                    "target completed"
                );
                TargetStatus::Completed { result }
            }
            Err(err) => {
                warn!(target = %target.label(), error = %err, "target failed");
                TargetStatus::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceError;
    use exitlab_core::domain::Candle;
    use exitlab_core::strategy::StrategyConfig;
    use std::collections::HashMap;

    /// In-memory source for tests: label -> candles, or a simulated failure.
    struct MapSource {
        data: HashMap<String, Vec<Candle>>,
    }

    impl CandleSource for MapSource {
        fn candles(&self, target: &TargetSpec) -> Result<Vec<Candle>, SourceError> {
            self.data
                .get(&target.label())
                .cloned()
                .ok_or_else(|| SourceError::Other(format!("no data for {}", target.label())))
        }
    }

    fn flat_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: 1_700_000_000 + i as i64 * 60,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect()
    }

    fn target(mint: &str) -> TargetSpec {
        TargetSpec {
            mint: mint.into(),
            chain: "solana".into(),
            start_timestamp: 0,
            end_timestamp: i64::MAX,
        }
    }

    fn scenario(targets: Vec<TargetSpec>, error_mode: ErrorMode) -> ScenarioConfig {
        ScenarioConfig {
            targets,
            strategy: StrategyConfig::hold_with_stop(-0.15),
            concurrency: 2,
            error_mode,
        }
    }

    #[test]
    fn collect_mode_records_failures_and_continues() {
        let mut data = HashMap::new();
        data.insert("solana:good".to_string(), flat_candles(&[1.0, 1.2]));
        let runner = ScenarioRunner::new(MapSource { data });
        let config = scenario(vec![target("missing"), target("good")], ErrorMode::Collect);
        let summary = runner.run(&config).unwrap();
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 0);
        // Outcomes preserve target order.
        assert!(matches!(summary.outcomes[0].status, TargetStatus::Failed { .. }));
        assert!(matches!(
            summary.outcomes[1].status,
            TargetStatus::Completed { .. }
        ));
    }

    #[test]
    fn all_targets_succeed_independently() {
        let mut data = HashMap::new();
        data.insert("solana:a".to_string(), flat_candles(&[1.0, 2.0]));
        data.insert("solana:b".to_string(), flat_candles(&[1.0, 0.5]));
        let runner = ScenarioRunner::new(MapSource { data });
        let config = scenario(vec![target("a"), target("b")], ErrorMode::Collect);
        let summary = runner.run(&config).unwrap();
        assert_eq!(summary.succeeded, 2);
        let TargetStatus::Completed { result } = &summary.outcomes[0].status else {
            panic!("expected completion");
        };
        assert!((result.final_pnl - 2.0).abs() < 1e-9);
    }

    #[test]
    fn fail_fast_skips_later_targets() {
        // Single worker makes the schedule sequential, so everything after
        // the failure is skipped deterministically.
        let mut data = HashMap::new();
        data.insert("solana:late".to_string(), flat_candles(&[1.0, 1.1]));
        let runner = ScenarioRunner::new(MapSource { data });
        let mut config = scenario(
            vec![target("missing"), target("late")],
            ErrorMode::FailFast,
        );
        config.concurrency = 1;
        let summary = runner.run(&config).unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.succeeded, 0);
    }

    #[test]
    fn empty_target_list_is_a_clean_batch() {
        let runner = ScenarioRunner::new(MapSource {
            data: HashMap::new(),
        });
        let config = scenario(vec![], ErrorMode::FailFast);
        let summary = runner.run(&config).unwrap();
        assert!(summary.outcomes.is_empty());
        assert_eq!(summary.succeeded + summary.failed + summary.skipped, 0);
    }
}
