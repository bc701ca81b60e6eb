//! Per-candle indicator bundle — the signal evaluator's read model.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;
use crate::indicators::{rsi_at, IchimokuData, MovingAverages, RSI_PERIOD};

/// Everything the signal evaluator can reference at one candle index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub candle: Candle,
    pub ma: MovingAverages,
    pub ichimoku: Option<IchimokuData>,
    pub rsi: Option<f64>,
}

impl IndicatorSnapshot {
    /// Snapshot at a single index. EMAs advance from `prev` when supplied.
    pub fn compute(candles: &[Candle], index: usize, prev: Option<&IndicatorSnapshot>) -> Self {
        Self {
            candle: candles[index],
            ma: MovingAverages::compute(candles, index, prev.map(|p| &p.ma)),
            ichimoku: IchimokuData::compute(candles, index),
            rsi: rsi_at(candles, index, RSI_PERIOD),
        }
    }
}

/// Precompute snapshots for every candle, threading the EMA seeds forward.
pub fn snapshot_series(candles: &[Candle]) -> Vec<IndicatorSnapshot> {
    let mut series: Vec<IndicatorSnapshot> = Vec::with_capacity(candles.len());
    for index in 0..candles.len() {
        let prev = series.last().copied();
        series.push(IndicatorSnapshot::compute(candles, index, prev.as_ref()));
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_candles;

    #[test]
    fn series_length_matches_candles() {
        let candles = make_candles(&vec![1.0; 60]);
        let series = snapshot_series(&candles);
        assert_eq!(series.len(), 60);
    }

    #[test]
    fn ichimoku_absent_before_warmup() {
        let candles = make_candles(&vec![1.0; 60]);
        let series = snapshot_series(&candles);
        assert!(series[50].ichimoku.is_none());
        assert!(series[51].ichimoku.is_some());
    }

    #[test]
    fn series_matches_standalone_compute() {
        let closes: Vec<f64> = (0..70).map(|i| 10.0 + (i as f64 * 0.3).cos()).collect();
        let candles = make_candles(&closes);
        let series = snapshot_series(&candles);
        for (index, snap) in series.iter().enumerate() {
            let standalone = IndicatorSnapshot::compute(&candles, index, None);
            match (snap.ma.ema20, standalone.ma.ema20) {
                (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9),
                (None, None) => {}
                _ => panic!("warm-up mismatch at {index}"),
            }
            assert_eq!(snap.ichimoku.is_some(), standalone.ichimoku.is_some());
        }
    }

    #[test]
    fn empty_input_is_empty_series() {
        assert!(snapshot_series(&[]).is_empty());
    }
}
