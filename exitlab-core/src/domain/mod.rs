//! Domain types shared across the engine.

pub mod candle;
pub mod event;
pub mod result;

pub use candle::Candle;
pub use event::SimulationEvent;
pub use result::{EntryOptimization, SimulationMetrics, SimulationResult};
