//! Ladder evaluator — which partial-fill legs are executable this candle.
//!
//! Legs fire at most once; execution is monotonic (an executed leg id is
//! never re-evaluated). Price legs fire when the candle's high reaches
//! `entry_price * target`, in ascending target order; multiple legs may fire
//! in the same candle. Sequential ladders fire only the first unexecuted leg
//! per call. Fraction overshoot is absorbed by the caller capping against the
//! remaining position; `normalized_fractions` renormalizes only when asked.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorSnapshot;
use crate::signal::SignalGroup;

/// What fires a leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LegTrigger {
    /// Fires when the candle high reaches `entry_price * multiple`.
    PriceMultiple { multiple: f64 },
    /// Fires when the signal group is satisfied at the current candle.
    Signal { group: SignalGroup },
    /// Fires unconditionally, once.
    Always,
}

/// One ladder leg: a fraction of the original position and its trigger.
///
/// `signal` is an extra gate on top of the trigger: when present, the leg
/// fires only while both hold on the same candle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderLeg {
    pub id: u32,
    pub fraction: f64,
    pub trigger: LegTrigger,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LadderMode {
    /// Every satisfied leg fires this candle.
    Concurrent,
    /// Only the first unexecuted leg may fire per call.
    Sequential,
}

/// Executed-leg bookkeeping for one position lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LadderState {
    executed: BTreeSet<u32>,
}

impl LadderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_executed(&self, id: u32) -> bool {
        self.executed.contains(&id)
    }

    pub fn executed_count(&self) -> usize {
        self.executed.len()
    }

    /// Reset for a fresh position (re-entry starts a new ladder lifecycle).
    pub fn reset(&mut self) {
        self.executed.clear();
    }
}

/// A leg selected for execution this candle.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderFill {
    pub leg_id: u32,
    pub fraction: f64,
    /// Target multiple for price legs (the fill price anchor), absent otherwise.
    pub price_multiple: Option<f64>,
}

/// Everything a trigger can look at this candle.
#[derive(Debug, Clone, Copy)]
pub struct LadderContext<'a> {
    /// `candle.high / entry_price` for the current candle.
    pub high_multiple: f64,
    pub series: &'a [IndicatorSnapshot],
    pub index: usize,
}

/// Select the legs newly executable this candle and mark them executed.
///
/// Price legs are returned in ascending target order so same-candle multi-leg
/// fills realize lower targets first.
pub fn executable_legs(
    legs: &[LadderLeg],
    mode: LadderMode,
    state: &mut LadderState,
    ctx: &LadderContext<'_>,
) -> Vec<LadderFill> {
    let mut fired: Vec<LadderFill> = Vec::new();

    for leg in legs {
        if state.is_executed(leg.id) {
            continue;
        }
        let triggered = match &leg.trigger {
            LegTrigger::PriceMultiple { multiple } => ctx.high_multiple >= *multiple,
            LegTrigger::Signal { group } => group.evaluate(ctx.series, ctx.index),
            LegTrigger::Always => true,
        };
        let satisfied = triggered
            && leg
                .signal
                .as_ref()
                .map_or(true, |gate| gate.evaluate(ctx.series, ctx.index));
        if mode == LadderMode::Sequential {
            // Sequential: the first unexecuted leg is the only candidate.
            if satisfied {
                state.executed.insert(leg.id);
                fired.push(LadderFill {
                    leg_id: leg.id,
                    fraction: leg.fraction,
                    price_multiple: leg_price_multiple(leg),
                });
            }
            return fired;
        }
        if satisfied {
            state.executed.insert(leg.id);
            fired.push(LadderFill {
                leg_id: leg.id,
                fraction: leg.fraction,
                price_multiple: leg_price_multiple(leg),
            });
        }
    }

    // Ascending target order; non-price legs keep their list position after
    // price legs with no defined ordering against them.
    fired.sort_by(|a, b| {
        a.price_multiple
            .unwrap_or(f64::INFINITY)
            .partial_cmp(&b.price_multiple.unwrap_or(f64::INFINITY))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    fired
}

fn leg_price_multiple(leg: &LadderLeg) -> Option<f64> {
    match leg.trigger {
        LegTrigger::PriceMultiple { multiple } => Some(multiple),
        _ => None,
    }
}

/// Fractions scaled so they sum to 1. Leaves zero-sum ladders untouched.
pub fn normalized_fractions(legs: &[LadderLeg]) -> Vec<f64> {
    let sum: f64 = legs.iter().map(|leg| leg.fraction).sum();
    if sum <= 0.0 {
        return legs.iter().map(|leg| leg.fraction).collect();
    }
    legs.iter().map(|leg| leg.fraction / sum).collect()
}
