//! Mutable state threaded through the simulation fold.
//!
//! One `PositionState` is owned by one run and discarded at its end; the
//! phase enum makes the lifecycle transitions explicit and auditable.

use crate::ladder::LadderState;
use crate::stops::StopTracker;
use crate::strategy::StopConfig;

/// A live position. `remaining_fraction` is measured against the original
/// position (1.0 at first entry, `size_percent` at re-entry).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionState {
    /// Raw fill price, before entry costs.
    pub entry_price_raw: f64,
    /// Cost basis per token unit (raw price inflated by entry costs).
    pub entry_price_net: f64,
    pub entry_timestamp: i64,
    /// Fraction this position opened with.
    pub initial_fraction: f64,
    pub remaining_fraction: f64,
    /// Token units backing one unit of fraction.
    pub qty_per_fraction: f64,
    /// USD spent opening this position.
    pub basis_usd: f64,
    pub stop: StopTracker,
    pub ladder: LadderState,
}

impl PositionState {
    /// Open a position: `fraction` of the run's original sizing, paid for
    /// with `spend_usd` at the net entry price.
    pub fn open(
        entry_price_raw: f64,
        entry_price_net: f64,
        entry_timestamp: i64,
        fraction: f64,
        spend_usd: f64,
        stop_config: &StopConfig,
    ) -> Self {
        let qty = spend_usd / entry_price_net;
        Self {
            entry_price_raw,
            entry_price_net,
            entry_timestamp,
            initial_fraction: fraction,
            remaining_fraction: fraction,
            qty_per_fraction: qty / fraction,
            basis_usd: spend_usd,
            stop: StopTracker::new(entry_price_raw, stop_config),
            ladder: LadderState::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.remaining_fraction <= 0.0
    }
}

/// Entry-optimization scratch state while waiting to enter.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryWait {
    /// Drop threshold reached; a trailing rebound may now trigger the fill.
    pub armed: bool,
    pub lowest: f64,
    pub lowest_timestamp: i64,
}

/// Position lifecycle phase.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    AwaitingEntry(EntryWait),
    Open(PositionState),
    /// Fully exited; may re-arm while re-entries remain.
    Closed {
        peak_price: f64,
    },
    /// Terminal: no further entries possible.
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::TrailingStop;

    #[test]
    fn open_position_bookkeeping() {
        let stop = StopConfig {
            initial: -0.2,
            trailing: TrailingStop::None,
            time_stop_minutes: None,
        };
        let pos = PositionState::open(2.0, 2.02, 1_700_000_000, 1.0, 1_000.0, &stop);
        assert_eq!(pos.remaining_fraction, 1.0);
        assert!((pos.qty_per_fraction - 1_000.0 / 2.02).abs() < 1e-9);
        assert!((pos.stop.current_stop() - 1.6).abs() < 1e-12);
        assert!(!pos.is_flat());
    }

    #[test]
    fn re_entry_sized_position() {
        let stop = StopConfig {
            initial: -0.2,
            trailing: TrailingStop::None,
            time_stop_minutes: None,
        };
        let pos = PositionState::open(1.0, 1.0, 0, 0.5, 500.0, &stop);
        assert_eq!(pos.initial_fraction, 0.5);
        // qty_per_fraction is normalized so selling fraction 0.5 sells the
        // whole 500 units.
        assert!((pos.qty_per_fraction * 0.5 - 500.0).abs() < 1e-9);
    }
}
