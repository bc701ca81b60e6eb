//! Indicator engine: pure per-index calculators over a candle slice.
//!
//! Every calculator returns `None` (not an error) until enough warm-up
//! candles exist. All functions are deterministic and allocation-light; the
//! simulator calls them once per candle.

pub mod ichimoku;
pub mod moving_averages;
pub mod rsi;
pub mod snapshot;

pub use ichimoku::IchimokuData;
pub use moving_averages::MovingAverages;
pub use rsi::rsi_at;
pub use snapshot::{snapshot_series, IndicatorSnapshot};

/// Warm-up requirement for the Ichimoku cloud (senkou B window).
pub const ICHIMOKU_WARMUP: usize = 52;

/// Default RSI period used by the snapshot series.
pub const RSI_PERIOD: usize = 14;

#[cfg(test)]
pub(crate) fn make_candles(closes: &[f64]) -> Vec<crate::domain::Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| crate::domain::Candle {
            timestamp: 1_700_000_000 + i as i64 * 60,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
        })
        .collect()
}

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "expected {expected}, got {actual}"
    );
}

#[cfg(test)]
pub(crate) const DEFAULT_EPSILON: f64 = 1e-9;
