//! Strategy configuration: ladder targets, stop policy, entry optimization,
//! re-entry rules, and the cost model parameters.
//!
//! All types are serializable so a scenario file fully determines a run.
//! Validation is deliberately lenient where the simulator can degrade
//! gracefully (target percents not summing to 1 are swept at final exit);
//! it rejects only configs the simulator cannot interpret at all.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signal::SignalGroup;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("profit target {index}: target multiple {target} must be > 0")]
    NonPositiveTarget { index: usize, target: f64 },
    #[error("profit target {index}: percent {percent} must be in (0, 1]")]
    BadTargetPercent { index: usize, percent: f64 },
    #[error("stop loss initial {0} must be negative")]
    NonNegativeInitialStop(f64),
    #[error("rolling trailing stop requires window size >= 1, got {0}")]
    BadTrailingWindow(usize),
    #[error("unrecognized trailing tag '{0}' (expected 'none', a number, or 'post_Nx')")]
    BadTrailingTag(String),
    #[error("re-entry size percent {0} must be in (0, 1]")]
    BadReEntrySize(f64),
}

/// One profit-target leg: sell `percent` of the original position once price
/// reaches `entry_price * target`. An optional signal gates the leg on
/// indicator conditions in addition to the price threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitTarget {
    pub target: f64,
    pub percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalGroup>,
}

/// Trailing behavior of the stop-loss level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TrailingStop {
    /// Fixed stop: never moves.
    None,
    /// Percent trail from peak, armed once price reaches `activation` times entry.
    /// `trail_percent` is negative (e.g. -0.10 trails 10% below the peak).
    Activated { activation: f64, trail_percent: f64 },
    /// Trail under the minimum low of the last `window` candles.
    /// `trail_percent` is positive (candidate = min_low * (1 - trail_percent)).
    Rolling { window: usize, trail_percent: f64 },
}

impl TrailingStop {
    /// Parse the compact tag form used by strategy files: `none`, a bare
    /// activation multiple (`"2.5"`), or `post_Nx` (`post_2x`, `post_1.5x`).
    pub fn parse_tag(tag: &str, trail_percent: f64) -> Result<Self, StrategyError> {
        let tag = tag.trim();
        if tag.eq_ignore_ascii_case("none") {
            return Ok(TrailingStop::None);
        }
        let multiple = if let Some(inner) = tag
            .strip_prefix("post_")
            .and_then(|rest| rest.strip_suffix('x'))
        {
            inner.parse::<f64>().ok()
        } else {
            tag.parse::<f64>().ok()
        };
        match multiple {
            Some(activation) if activation > 0.0 => Ok(TrailingStop::Activated {
                activation,
                trail_percent,
            }),
            _ => Err(StrategyError::BadTrailingTag(tag.to_string())),
        }
    }
}

/// Stop-loss policy: initial level plus optional trailing and time stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopConfig {
    /// Fractional return threshold, negative (-0.15 stops 15% below entry).
    pub initial: f64,
    #[serde(default = "TrailingStop::default")]
    pub trailing: TrailingStop,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_stop_minutes: Option<u64>,
}

impl Default for TrailingStop {
    fn default() -> Self {
        TrailingStop::None
    }
}

/// Entry optimization: wait for a drop, then a rebound, bounded in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryConfig {
    /// Fractional drop from the first candle's open before the entry arms
    /// (None = enter immediately).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_entry: Option<f64>,
    /// Fractional rebound from the observed low that triggers the fill
    /// (None = fill as soon as the drop is reached).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_entry: Option<f64>,
    /// Give up waiting after this many minutes and enter at the close.
    pub max_wait_time_minutes: u64,
    /// Optional indicator gate: entry also requires this signal to be satisfied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalGroup>,
}

impl Default for EntryConfig {
    fn default() -> Self {
        Self {
            initial_entry: None,
            trailing_entry: None,
            max_wait_time_minutes: 0,
            signal: None,
        }
    }
}

/// Re-entry after a full exit: retrace-from-peak trigger, capped count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReEntryConfig {
    /// Fractional retrace from the position's peak that re-arms an entry
    /// (None = never re-enter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_re_entry: Option<f64>,
    #[serde(default)]
    pub max_re_entries: u32,
    /// Fraction of the original notional committed on each re-entry.
    #[serde(default = "default_re_entry_size")]
    pub size_percent: f64,
}

fn default_re_entry_size() -> f64 {
    1.0
}

impl Default for ReEntryConfig {
    fn default() -> Self {
        Self {
            trailing_re_entry: None,
            max_re_entries: 0,
            size_percent: 1.0,
        }
    }
}

/// Cost model parameters, all in basis points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CostConfig {
    #[serde(default)]
    pub entry_slippage_bps: u32,
    #[serde(default)]
    pub exit_slippage_bps: u32,
    #[serde(default)]
    pub taker_fee_bps: u32,
    /// Carried for config parity with margin venues; a spot long has no borrow
    /// leg, so this contributes zero cost in the simulator.
    #[serde(default)]
    pub borrow_apr_bps: u32,
}

/// Full strategy definition handed to the simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub profit_targets: Vec<ProfitTarget>,
    pub stop_loss: StopConfig,
    #[serde(default)]
    pub entry: EntryConfig,
    #[serde(default)]
    pub re_entry: ReEntryConfig,
    #[serde(default)]
    pub costs: CostConfig,
    /// Notional used for the USD-denominated event fields.
    #[serde(default = "default_position_size")]
    pub position_size_usd: f64,
}

fn default_position_size() -> f64 {
    1_000.0
}

impl StrategyConfig {
    /// A hold-to-end strategy with no targets, a fixed stop, and no costs.
    pub fn hold_with_stop(initial_stop: f64) -> Self {
        Self {
            profit_targets: Vec::new(),
            stop_loss: StopConfig {
                initial: initial_stop,
                trailing: TrailingStop::None,
                time_stop_minutes: None,
            },
            entry: EntryConfig::default(),
            re_entry: ReEntryConfig::default(),
            costs: CostConfig::default(),
            position_size_usd: default_position_size(),
        }
    }

    /// Reject configs the simulator cannot interpret. Percent sums over the
    /// ladder are *not* checked here: leftovers sweep at final exit.
    pub fn validate(&self) -> Result<(), StrategyError> {
        for (index, leg) in self.profit_targets.iter().enumerate() {
            if leg.target <= 0.0 {
                return Err(StrategyError::NonPositiveTarget {
                    index,
                    target: leg.target,
                });
            }
            if leg.percent <= 0.0 || leg.percent > 1.0 {
                return Err(StrategyError::BadTargetPercent {
                    index,
                    percent: leg.percent,
                });
            }
        }
        if self.stop_loss.initial >= 0.0 {
            return Err(StrategyError::NonNegativeInitialStop(self.stop_loss.initial));
        }
        if let TrailingStop::Rolling { window, .. } = self.stop_loss.trailing {
            if window == 0 {
                return Err(StrategyError::BadTrailingWindow(window));
            }
        }
        if self.re_entry.trailing_re_entry.is_some()
            && (self.re_entry.size_percent <= 0.0 || self.re_entry.size_percent > 1.0)
        {
            return Err(StrategyError::BadReEntrySize(self.re_entry.size_percent));
        }
        Ok(())
    }
}
