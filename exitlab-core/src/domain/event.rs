//! Simulation events — the append-only trade trace.

use serde::{Deserialize, Serialize};

/// What happened at a given candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Entry,
    TargetHit,
    StopLoss,
    StopMoved,
    TimeStop,
    ReEntry,
    FinalExit,
}

impl EventKind {
    /// True for events that realize proceeds (reduce the position).
    pub fn is_exit(&self) -> bool {
        matches!(
            self,
            EventKind::TargetHit | EventKind::StopLoss | EventKind::TimeStop | EventKind::FinalExit
        )
    }
}

/// One entry in the ordered simulation trace.
///
/// Events are created once and never mutated. `fraction` is the share of the
/// original position touched by this event (0 for `stop_moved`);
/// `position_size_after` is the remaining fraction once it applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub kind: EventKind,
    pub timestamp: i64,
    pub price: f64,
    pub fraction: f64,
    pub value_usd: f64,
    pub fee_usd: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cumulative_pnl_usd: Option<f64>,
    pub position_size_after: f64,
}

impl SimulationEvent {
    /// A bookkeeping event (stop level change) that moves no size and no value.
    pub fn stop_moved(timestamp: i64, new_stop: f64, position_size_after: f64) -> Self {
        Self {
            kind: EventKind::StopMoved,
            timestamp,
            price: new_stop,
            fraction: 0.0,
            value_usd: 0.0,
            fee_usd: 0.0,
            pnl_usd: None,
            cumulative_pnl_usd: None,
            position_size_after,
        }
    }
}
