//! The per-candle simulation fold.
//!
//! States: AwaitingEntry → Open → (partial exits)* → Closed, with
//! Closed → Open again while re-entries remain. Per candle, exactly one
//! phase acts: the entry candle does not also run exits, and a re-entry
//! candle does not immediately manage the new position. Within an Open
//! candle the order is fixed: profit-target legs (ascending), stop update
//! then stop trigger, then the time stop.
//!
//! Every fill passes through the cost model. The fold is pure: identical
//! `(candles, config)` inputs produce identical traces and PnL.

use crate::costs::{entry_price_with_costs, exit_price_with_costs, trade_fee};
use crate::domain::event::{EventKind, SimulationEvent};
use crate::domain::{Candle, EntryOptimization, SimulationMetrics, SimulationResult};
use crate::engine::state::{EntryWait, Phase, PositionState};
use crate::indicators::{snapshot_series, IndicatorSnapshot};
use crate::ladder::{executable_legs, LadderContext, LadderFill, LadderLeg, LadderMode, LegTrigger};
use crate::strategy::StrategyConfig;

/// Run one strategy against one candle series.
///
/// Total for all well-typed input: empty or single-candle series yield a
/// well-formed zero-trade result. Candles must be sorted ascending by
/// timestamp (caller's contract, not re-checked here).
///
/// Exactly one phase acts per candle: the entry candle never also evaluates
/// targets or stops, and the candle of a full exit never also re-enters.
/// An entry-then-target fill on the same candle is deliberately impossible;
/// fixtures comparing traces against other engines must account for the
/// one-candle lag.
pub fn simulate(candles: &[Candle], config: &StrategyConfig) -> SimulationResult {
    if candles.is_empty() {
        return SimulationResult::empty(0);
    }

    let series = snapshot_series(candles);
    let legs = target_legs(config);
    let mut run = SimRun::new(candles, &series, &legs, config);

    for index in 0..candles.len() {
        run.step(index);
    }
    run.finish()
}

/// Profit targets as ladder legs, ascending by target multiple.
fn target_legs(config: &StrategyConfig) -> Vec<LadderLeg> {
    let mut legs: Vec<LadderLeg> = config
        .profit_targets
        .iter()
        .enumerate()
        .map(|(index, target)| LadderLeg {
            id: index as u32,
            fraction: target.percent,
            trigger: LegTrigger::PriceMultiple {
                multiple: target.target,
            },
            signal: target.signal.clone(),
        })
        .collect();
    legs.sort_by(|a, b| {
        let (LegTrigger::PriceMultiple { multiple: ma }, LegTrigger::PriceMultiple { multiple: mb }) =
            (&a.trigger, &b.trigger)
        else {
            return std::cmp::Ordering::Equal;
        };
        ma.partial_cmp(mb).unwrap_or(std::cmp::Ordering::Equal)
    });
    legs
}

struct SimRun<'a> {
    candles: &'a [Candle],
    series: &'a [IndicatorSnapshot],
    legs: &'a [LadderLeg],
    config: &'a StrategyConfig,
    phase: Phase,
    events: Vec<SimulationEvent>,
    /// Exit proceeds minus re-entry spend, in USD.
    realized_usd: f64,
    cumulative_pnl_usd: f64,
    re_entry_count: u32,
    first_entry_raw: f64,
    first_entry_net: f64,
    entry_report: EntryOptimization,
    entered: bool,
    peak_multiple: f64,
}

impl<'a> SimRun<'a> {
    fn new(
        candles: &'a [Candle],
        series: &'a [IndicatorSnapshot],
        legs: &'a [LadderLeg],
        config: &'a StrategyConfig,
    ) -> Self {
        let first = &candles[0];
        Self {
            candles,
            series,
            legs,
            config,
            phase: Phase::AwaitingEntry(EntryWait {
                armed: false,
                lowest: first.low,
                lowest_timestamp: first.timestamp,
            }),
            events: Vec::new(),
            realized_usd: 0.0,
            cumulative_pnl_usd: 0.0,
            re_entry_count: 0,
            first_entry_raw: 0.0,
            first_entry_net: 0.0,
            entry_report: EntryOptimization::default(),
            entered: false,
            peak_multiple: 0.0,
        }
    }

    fn step(&mut self, index: usize) {
        let candle = self.candles[index];
        if self.entered && self.first_entry_raw > 0.0 {
            self.peak_multiple = self.peak_multiple.max(candle.high / self.first_entry_raw);
        }

        // Exactly one phase acts per candle.
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::AwaitingEntry(mut wait) => {
                self.phase = match self.try_enter(&mut wait, index) {
                    Some(position) => Phase::Open(position),
                    None => Phase::AwaitingEntry(wait),
                };
            }
            Phase::Open(mut position) => {
                self.manage(&mut position, index);
                self.phase = if position.is_flat() {
                    Phase::Closed {
                        peak_price: position.stop.peak_price(),
                    }
                } else {
                    Phase::Open(position)
                };
            }
            Phase::Closed { peak_price } => {
                self.phase = self.maybe_re_enter(peak_price, index);
            }
            Phase::Done => {}
        }
    }

    // ── Entry ───────────────────────────────────────────────────────────

    fn try_enter(&mut self, wait: &mut EntryWait, index: usize) -> Option<PositionState> {
        let candle = self.candles[index];
        if candle.low < wait.lowest {
            wait.lowest = candle.low;
            wait.lowest_timestamp = candle.timestamp;
        }

        let entry = &self.config.entry;
        let gate_open = entry
            .signal
            .as_ref()
            .map_or(true, |group| group.evaluate(self.series, index));
        let elapsed = candle.timestamp - self.candles[0].timestamp;
        let wait_expired =
            entry.max_wait_time_minutes > 0 && elapsed >= entry.max_wait_time_minutes as i64 * 60;

        let fill_price = match entry.initial_entry {
            None => {
                if gate_open {
                    // Immediate mode: first candle fills at the open, a
                    // signal-delayed entry fills at the triggering close.
                    Some(if index == 0 { candle.open } else { candle.close })
                } else if wait_expired {
                    Some(candle.close)
                } else {
                    None
                }
            }
            Some(drop) => {
                let reference = self.candles[0].open;
                if !wait.armed && candle.low <= reference * (1.0 - drop) {
                    wait.armed = true;
                }
                let rebound_ok = match entry.trailing_entry {
                    None => wait.armed,
                    Some(rebound) => {
                        wait.armed && candle.high >= wait.lowest * (1.0 + rebound)
                    }
                };
                if rebound_ok && gate_open {
                    Some(candle.close)
                } else if wait_expired {
                    // Give up optimizing: enter at the close.
                    Some(candle.close)
                } else {
                    None
                }
            }
        }?;

        Some(self.open_position(index, fill_price, 1.0, EventKind::Entry, wait))
    }

    fn open_position(
        &mut self,
        index: usize,
        fill_price: f64,
        fraction: f64,
        kind: EventKind,
        wait: &EntryWait,
    ) -> PositionState {
        let candle = self.candles[index];
        let net = entry_price_with_costs(fill_price, &self.config.costs);
        let spend = fraction * self.config.position_size_usd;
        let fee = trade_fee(spend, &self.config.costs);

        if kind == EventKind::Entry {
            self.first_entry_raw = fill_price;
            self.first_entry_net = net;
            self.entered = true;
            self.peak_multiple = self.peak_multiple.max(candle.high / fill_price);
            self.entry_report = EntryOptimization {
                lowest_price: wait.lowest,
                lowest_price_timestamp: wait.lowest_timestamp,
                actual_entry_price: fill_price,
                entry_delay_secs: candle.timestamp - self.candles[0].timestamp,
            };
        } else {
            // Re-entry spends out of realized proceeds.
            self.realized_usd -= spend;
        }

        self.events.push(SimulationEvent {
            kind,
            timestamp: candle.timestamp,
            price: net,
            fraction,
            value_usd: spend,
            fee_usd: fee,
            pnl_usd: None,
            cumulative_pnl_usd: None,
            position_size_after: fraction,
        });

        PositionState::open(
            fill_price,
            net,
            candle.timestamp,
            fraction,
            spend,
            &self.config.stop_loss,
        )
    }

    // ── Open-position management ────────────────────────────────────────

    fn manage(&mut self, position: &mut PositionState, index: usize) {
        let candle = self.candles[index];

        // Peak must include this candle even if a ladder leg empties the
        // position before the stop tracker runs (re-entry retraces from it).
        position.stop.observe_peak(candle.high);

        // 1. Profit-target legs, ascending.
        let ctx = LadderContext {
            high_multiple: candle.high / position.entry_price_raw,
            series: self.series,
            index,
        };
        let fills = executable_legs(
            self.legs,
            LadderMode::Concurrent,
            &mut position.ladder,
            &ctx,
        );
        for fill in &fills {
            let raw_price = self.target_fill_price(position, fill, &candle);
            self.apply_exit(
                position,
                EventKind::TargetHit,
                candle.timestamp,
                raw_price,
                fill.fraction,
            );
            if position.is_flat() {
                return;
            }
        }

        // 2. Stop: update level, then check the trigger.
        if position.stop.update(&candle) {
            self.events.push(SimulationEvent::stop_moved(
                candle.timestamp,
                position.stop.current_stop(),
                position.remaining_fraction,
            ));
        }
        if position.stop.is_triggered(&candle) {
            let raw_price = position.stop.fill_price(&candle);
            self.apply_exit(
                position,
                EventKind::StopLoss,
                candle.timestamp,
                raw_price,
                position.remaining_fraction,
            );
            return;
        }

        // 3. Time stop, only if nothing above closed the position.
        if let Some(minutes) = self.config.stop_loss.time_stop_minutes {
            let elapsed = candle.timestamp - position.entry_timestamp;
            if elapsed >= minutes as i64 * 60 {
                self.apply_exit(
                    position,
                    EventKind::TimeStop,
                    candle.timestamp,
                    candle.close,
                    position.remaining_fraction,
                );
            }
        }
    }

    /// Fill anchor for a target leg: the target price, or the open when the
    /// candle gapped above it. Signal-triggered legs fill at the close.
    fn target_fill_price(
        &self,
        position: &PositionState,
        fill: &LadderFill,
        candle: &Candle,
    ) -> f64 {
        match fill.price_multiple {
            Some(multiple) => (position.entry_price_raw * multiple).max(candle.open),
            None => candle.close,
        }
    }

    fn apply_exit(
        &mut self,
        position: &mut PositionState,
        kind: EventKind,
        timestamp: i64,
        raw_price: f64,
        fraction: f64,
    ) {
        // The last feasible leg absorbs any overshoot.
        let fraction = fraction.min(position.remaining_fraction);
        if fraction <= 0.0 {
            return;
        }
        let qty = fraction * position.qty_per_fraction;
        let gross = qty * raw_price;
        let fee = trade_fee(gross, &self.config.costs);
        let net_price = exit_price_with_costs(raw_price, &self.config.costs);
        let proceeds = qty * net_price;

        position.remaining_fraction -= fraction;
        if position.remaining_fraction < 1e-12 {
            position.remaining_fraction = 0.0;
        }
        self.realized_usd += proceeds;
        let basis_share = position.basis_usd * fraction / position.initial_fraction;
        let pnl = proceeds - basis_share;
        self.cumulative_pnl_usd += pnl;

        self.events.push(SimulationEvent {
            kind,
            timestamp,
            price: net_price,
            fraction,
            value_usd: proceeds,
            fee_usd: fee,
            pnl_usd: Some(pnl),
            cumulative_pnl_usd: Some(self.cumulative_pnl_usd),
            position_size_after: position.remaining_fraction,
        });
    }

    // ── Re-entry ────────────────────────────────────────────────────────

    fn maybe_re_enter(&mut self, peak_price: f64, index: usize) -> Phase {
        let re_entry = &self.config.re_entry;
        let Some(retrace) = re_entry.trailing_re_entry else {
            return Phase::Done;
        };
        if self.re_entry_count >= re_entry.max_re_entries {
            return Phase::Done;
        }
        let candle = self.candles[index];
        if candle.low > peak_price * (1.0 - retrace) {
            // Not retraced far enough yet; keep waiting.
            return Phase::Closed { peak_price };
        }

        self.re_entry_count += 1;
        let wait = EntryWait {
            armed: false,
            lowest: candle.low,
            lowest_timestamp: candle.timestamp,
        };
        let position = self.open_position(
            index,
            candle.close,
            re_entry.size_percent,
            EventKind::ReEntry,
            &wait,
        );
        Phase::Open(position)
    }

    // ── Finalization ────────────────────────────────────────────────────

    fn finish(mut self) -> SimulationResult {
        let last = self.candles[self.candles.len() - 1];

        // Sweep whatever is still held (including ladder leftover percent).
        if let Phase::Open(mut position) = std::mem::replace(&mut self.phase, Phase::Done) {
            if !position.is_flat() {
                let remaining = position.remaining_fraction;
                self.apply_exit(
                    &mut position,
                    EventKind::FinalExit,
                    last.timestamp,
                    last.close,
                    remaining,
                );
            }
        }

        let final_pnl = if self.entered {
            (self.realized_usd / self.config.position_size_usd).max(0.0)
        } else {
            0.0
        };
        let metrics = SimulationMetrics::from_events(&self.events, self.peak_multiple);

        SimulationResult {
            events: self.events,
            entry_price: self.first_entry_net,
            final_price: last.close,
            total_candles: self.candles.len(),
            final_pnl,
            entry_optimization: self.entry_report,
            metrics,
        }
    }
}
