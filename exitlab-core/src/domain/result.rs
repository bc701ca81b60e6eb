//! Simulation result and run-level metrics.

use serde::{Deserialize, Serialize};

use crate::domain::event::{EventKind, SimulationEvent};

/// Complete result of one simulation run.
///
/// `final_pnl` is a return multiplier on the original notional (1.0 = break
/// even, 0.0 = total loss). It is never negative: realized proceeds cannot go
/// below zero for a spot long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub events: Vec<SimulationEvent>,
    pub entry_price: f64,
    pub final_price: f64,
    pub total_candles: usize,
    pub final_pnl: f64,
    pub entry_optimization: EntryOptimization,
    pub metrics: SimulationMetrics,
}

impl SimulationResult {
    /// Well-formed zero-trade result for empty or degenerate input.
    pub fn empty(total_candles: usize) -> Self {
        Self {
            events: Vec::new(),
            entry_price: 0.0,
            final_price: 0.0,
            total_candles,
            final_pnl: 0.0,
            entry_optimization: EntryOptimization::default(),
            metrics: SimulationMetrics::default(),
        }
    }
}

/// How the entry optimizer behaved: the low it saw and where it actually filled.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntryOptimization {
    pub lowest_price: f64,
    pub lowest_price_timestamp: i64,
    pub actual_entry_price: f64,
    /// Seconds between the first candle and the entry fill.
    pub entry_delay_secs: i64,
}

/// Aggregate counters derived from the event trace.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationMetrics {
    pub targets_hit: usize,
    pub stops_hit: usize,
    pub time_stops_hit: usize,
    pub re_entries: usize,
    pub total_fees_usd: f64,
    /// Highest `high / entry_price` observed while a position was open.
    pub peak_multiple: f64,
    /// Seconds from first entry to last exit (0 if no trade happened).
    pub hold_time_secs: i64,
}

impl SimulationMetrics {
    /// Derive counters from a finished event trace.
    pub fn from_events(events: &[SimulationEvent], peak_multiple: f64) -> Self {
        let mut metrics = Self {
            peak_multiple,
            ..Self::default()
        };
        let mut first_entry: Option<i64> = None;
        let mut last_exit: Option<i64> = None;
        for ev in events {
            metrics.total_fees_usd += ev.fee_usd;
            match ev.kind {
                EventKind::Entry => first_entry = first_entry.or(Some(ev.timestamp)),
                EventKind::TargetHit => metrics.targets_hit += 1,
                EventKind::StopLoss => metrics.stops_hit += 1,
                EventKind::TimeStop => metrics.time_stops_hit += 1,
                EventKind::ReEntry => metrics.re_entries += 1,
                EventKind::StopMoved => {}
                EventKind::FinalExit => {}
            }
            if ev.kind.is_exit() {
                last_exit = Some(ev.timestamp);
            }
        }
        if let (Some(entry), Some(exit)) = (first_entry, last_exit) {
            metrics.hold_time_secs = exit - entry;
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(kind: EventKind, timestamp: i64, fee_usd: f64) -> SimulationEvent {
        SimulationEvent {
            kind,
            timestamp,
            price: 1.0,
            fraction: 0.5,
            value_usd: 500.0,
            fee_usd,
            pnl_usd: None,
            cumulative_pnl_usd: None,
            position_size_after: 0.5,
        }
    }

    #[test]
    fn empty_result_is_zeroed() {
        let result = SimulationResult::empty(0);
        assert!(result.events.is_empty());
        assert_eq!(result.final_pnl, 0.0);
        assert_eq!(result.total_candles, 0);
    }

    #[test]
    fn metrics_count_event_kinds_and_fees() {
        let events = vec![
            fill(EventKind::Entry, 100, 1.0),
            fill(EventKind::TargetHit, 160, 2.0),
            fill(EventKind::TargetHit, 220, 2.0),
            fill(EventKind::StopLoss, 280, 1.5),
        ];
        let metrics = SimulationMetrics::from_events(&events, 2.5);
        assert_eq!(metrics.targets_hit, 2);
        assert_eq!(metrics.stops_hit, 1);
        assert_eq!(metrics.re_entries, 0);
        assert!((metrics.total_fees_usd - 6.5).abs() < 1e-12);
        assert_eq!(metrics.hold_time_secs, 180);
        assert_eq!(metrics.peak_multiple, 2.5);
    }

    #[test]
    fn result_roundtrips_as_json() {
        let result = SimulationResult::empty(3);
        let json = serde_json::to_string(&result).unwrap();
        let deser: SimulationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(result, deser);
    }
}
