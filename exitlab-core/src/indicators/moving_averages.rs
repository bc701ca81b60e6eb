//! Simple and exponential moving averages (9/20/50).
//!
//! SMA: rolling mean of closes, first valid at index period-1.
//! EMA: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], seeded with the
//! SMA of the first `period` closes. When a previous snapshot is supplied the
//! EMA advances incrementally from it; otherwise it is rebuilt from the seed.
//! Both forms produce identical values for the same index.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;

/// Moving-average values at one candle index. `None` until the window fills.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MovingAverages {
    pub sma9: Option<f64>,
    pub sma20: Option<f64>,
    pub sma50: Option<f64>,
    pub ema9: Option<f64>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
}

impl MovingAverages {
    /// Compute all averages at `index`. `prev` (the snapshot at `index - 1`)
    /// lets the EMAs advance in O(1); without it they are rebuilt from the
    /// SMA seed, which yields the same values.
    pub fn compute(candles: &[Candle], index: usize, prev: Option<&MovingAverages>) -> Self {
        if index >= candles.len() {
            return Self::default();
        }
        Self {
            sma9: sma_at(candles, index, 9),
            sma20: sma_at(candles, index, 20),
            sma50: sma_at(candles, index, 50),
            ema9: ema_at(candles, index, 9, prev.and_then(|p| p.ema9)),
            ema20: ema_at(candles, index, 20, prev.and_then(|p| p.ema20)),
            ema50: ema_at(candles, index, 50, prev.and_then(|p| p.ema50)),
        }
    }
}

/// Mean of the `period` closes ending at `index`, or `None` during warm-up.
pub fn sma_at(candles: &[Candle], index: usize, period: usize) -> Option<f64> {
    if period == 0 || index + 1 < period || index >= candles.len() {
        return None;
    }
    let window = &candles[index + 1 - period..=index];
    let sum: f64 = window.iter().map(|c| c.close).sum();
    Some(sum / period as f64)
}

/// EMA at `index`, advanced from `prev_value` when available.
pub fn ema_at(
    candles: &[Candle],
    index: usize,
    period: usize,
    prev_value: Option<f64>,
) -> Option<f64> {
    if period == 0 || index + 1 < period || index >= candles.len() {
        return None;
    }
    let alpha = 2.0 / (period as f64 + 1.0);

    // Seed candle: the EMA equals the SMA of the first `period` closes.
    if index + 1 == period {
        return sma_at(candles, index, period);
    }

    if let Some(prev) = prev_value {
        return Some(alpha * candles[index].close + (1.0 - alpha) * prev);
    }

    // No previous value: rebuild from the seed forward.
    let mut ema = sma_at(candles, period - 1, period)?;
    for candle in &candles[period..=index] {
        ema = alpha * candle.close + (1.0 - alpha) * ema;
    }
    Some(ema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_candles, DEFAULT_EPSILON};

    #[test]
    fn sma_basic() {
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0]);
        assert!(sma_at(&candles, 1, 3).is_none());
        assert_approx(sma_at(&candles, 2, 3).unwrap(), 11.0, DEFAULT_EPSILON);
        assert_approx(sma_at(&candles, 5, 3).unwrap(), 14.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_seed_is_sma() {
        // alpha = 0.5 for period 3; seed at index 2 = SMA(10,11,12) = 11
        let candles = make_candles(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        assert_approx(ema_at(&candles, 2, 3, None).unwrap(), 11.0, DEFAULT_EPSILON);
        assert_approx(ema_at(&candles, 3, 3, None).unwrap(), 12.0, DEFAULT_EPSILON);
        assert_approx(ema_at(&candles, 4, 3, None).unwrap(), 13.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ema_incremental_matches_rebuilt() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let candles = make_candles(&closes);
        let mut prev: Option<MovingAverages> = None;
        for index in 0..candles.len() {
            let incremental = MovingAverages::compute(&candles, index, prev.as_ref());
            let rebuilt = MovingAverages::compute(&candles, index, None);
            for (a, b) in [
                (incremental.ema9, rebuilt.ema9),
                (incremental.ema20, rebuilt.ema20),
                (incremental.ema50, rebuilt.ema50),
            ] {
                match (a, b) {
                    (Some(x), Some(y)) => assert_approx(x, y, 1e-9),
                    (None, None) => {}
                    _ => panic!("incremental/rebuilt warm-up mismatch at index {index}"),
                }
            }
            prev = Some(incremental);
        }
    }

    #[test]
    fn warmup_produces_none() {
        let candles = make_candles(&[10.0; 30]);
        let ma = MovingAverages::compute(&candles, 10, None);
        assert!(ma.sma9.is_some());
        assert!(ma.sma20.is_none());
        assert!(ma.sma50.is_none());
        assert!(ma.ema50.is_none());
    }

    #[test]
    fn out_of_range_index_is_empty() {
        let candles = make_candles(&[10.0, 11.0]);
        assert_eq!(
            MovingAverages::compute(&candles, 5, None),
            MovingAverages::default()
        );
    }
}
