//! Strategy simulator: the per-candle state machine fold.

pub mod simulator;
pub mod state;

pub use simulator::simulate;
pub use state::PositionState;
