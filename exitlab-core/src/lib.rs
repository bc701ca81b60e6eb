//! ExitLab Core — deterministic exit/entry strategy simulation over OHLCV candles.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (candles, simulation events, results, position state)
//! - Indicator engine (moving averages, Ichimoku cloud, RSI)
//! - Signal evaluator (boolean condition trees with lookback and cross detection)
//! - Cost model (slippage + taker fee in basis points)
//! - Ladder evaluator (partial-exit legs, sequential or concurrent)
//! - Trailing/rolling stop tracker with a monotonic ratchet
//! - The strategy simulator: a pure per-candle state machine fold
//!
//! The simulator performs no I/O and holds no shared state; identical
//! `(candles, config)` inputs yield identical event traces and PnL.

pub mod costs;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod ladder;
pub mod signal;
pub mod stops;
pub mod strategy;

pub use domain::{Candle, EntryOptimization, SimulationEvent, SimulationMetrics, SimulationResult};
pub use engine::simulate;
pub use strategy::StrategyConfig;
