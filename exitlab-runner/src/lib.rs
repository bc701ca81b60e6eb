//! ExitLab Runner — batch orchestration around the pure simulator.
//!
//! Turns a list of (token, time window) targets into independent simulator
//! invocations run with bounded concurrency. Candle acquisition sits behind
//! the [`source::CandleSource`] trait; blocking work happens there, never
//! inside a simulation.

pub mod config;
pub mod report;
pub mod scenario;
pub mod source;

pub use config::{ErrorMode, ScenarioConfig, TargetSpec};
pub use report::ScenarioReport;
pub use scenario::{ScenarioRunner, ScenarioSummary, TargetOutcome, TargetStatus};
pub use source::{CandleSource, JsonFileSource, SourceError};
