//! Trailing/rolling stop tracker.
//!
//! The stop starts at `entry_price * (1 + initial)` and may only rise,
//! whatever the trailing mode proposes (ratchet invariant). Three modes:
//! fixed, percent-trail armed at an activation multiple, and a trail under
//! the minimum low of the last N candles held in a fixed-capacity ring
//! buffer. Peak price is tracked independently for reporting.

use crate::domain::Candle;
use crate::strategy::{StopConfig, TrailingStop};

/// Fixed-capacity ring buffer of recent candle lows. No per-candle heap
/// allocation once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingLows {
    buf: Vec<f64>,
    capacity: usize,
    head: usize,
    len: usize,
}

impl RollingLows {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity >= 1, "rolling window must hold at least one candle");
        Self {
            buf: vec![0.0; capacity],
            capacity,
            head: 0,
            len: 0,
        }
    }

    /// Push a low, evicting the oldest once full.
    pub fn push(&mut self, low: f64) {
        self.buf[self.head] = low;
        self.head = (self.head + 1) % self.capacity;
        self.len = (self.len + 1).min(self.capacity);
    }

    /// Minimum of the window, `None` while empty.
    pub fn min(&self) -> Option<f64> {
        self.buf[..self.len]
            .iter()
            .copied()
            .fold(None, |acc: Option<f64>, v| {
                Some(acc.map_or(v, |m| m.min(v)))
            })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Per-position stop state machine.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTracker {
    entry_price: f64,
    trailing: TrailingStop,
    current_stop: f64,
    peak_price: f64,
    /// Latched once price reaches the activation multiple; never un-arms.
    armed: bool,
    lows: Option<RollingLows>,
}

impl StopTracker {
    pub fn new(entry_price: f64, stop: &StopConfig) -> Self {
        let lows = match stop.trailing {
            TrailingStop::Rolling { window, .. } => Some(RollingLows::new(window.max(1))),
            _ => None,
        };
        Self {
            entry_price,
            trailing: stop.trailing.clone(),
            current_stop: entry_price * (1.0 + stop.initial),
            peak_price: entry_price,
            armed: false,
            lows,
        }
    }

    pub fn current_stop(&self) -> f64 {
        self.current_stop
    }

    pub fn peak_price(&self) -> f64 {
        self.peak_price
    }

    /// Record a candle high without recomputing the stop. `update` does this
    /// too; calling both for the same candle is harmless.
    pub fn observe_peak(&mut self, high: f64) {
        self.peak_price = self.peak_price.max(high);
    }

    /// Observe one candle and recompute the stop. Returns true when the stop
    /// rose (for `stop_moved` events); it never falls.
    pub fn update(&mut self, candle: &Candle) -> bool {
        self.peak_price = self.peak_price.max(candle.high);

        let candidate = match &self.trailing {
            TrailingStop::None => None,
            TrailingStop::Activated {
                activation,
                trail_percent,
            } => {
                if !self.armed && candle.high >= self.entry_price * activation {
                    self.armed = true;
                }
                self.armed
                    .then(|| self.peak_price * (1.0 + trail_percent))
            }
            TrailingStop::Rolling { trail_percent, .. } => {
                let lows = self.lows.as_mut().expect("rolling mode keeps a window");
                lows.push(candle.low);
                lows.min().map(|low| low * (1.0 - trail_percent))
            }
        };

        match candidate {
            Some(candidate) if candidate > self.current_stop => {
                self.current_stop = candidate;
                true
            }
            _ => false,
        }
    }

    /// A candle whose low touches the stop triggers it.
    pub fn is_triggered(&self, candle: &Candle) -> bool {
        candle.low <= self.current_stop
    }

    /// Fill price for a triggered stop: the stop level, or the open when the
    /// candle gapped through it.
    pub fn fill_price(&self, candle: &Candle) -> f64 {
        self.current_stop.min(candle.open)
    }
}
