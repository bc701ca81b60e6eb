//! Ichimoku cloud.
//!
//! Tenkan: (max high + min low) / 2 over the trailing 9 candles.
//! Kijun: same over 26. Senkou B: same over 52. Senkou A: avg(tenkan, kijun).
//! Chikou is the current close (plotted displaced, compared undisplaced here).
//! Requires `index >= 51`; earlier indexes yield `None`, never an error.

use serde::{Deserialize, Serialize};

use crate::domain::Candle;
use crate::indicators::ICHIMOKU_WARMUP;

const TENKAN_WINDOW: usize = 9;
const KIJUN_WINDOW: usize = 26;
const SENKOU_B_WINDOW: usize = 52;

/// Ichimoku values at one candle index, plus the derived cloud booleans.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IchimokuData {
    pub tenkan: f64,
    pub kijun: f64,
    pub senkou_a: f64,
    pub senkou_b: f64,
    pub chikou: f64,
    pub cloud_top: f64,
    pub cloud_bottom: f64,
    pub cloud_thickness: f64,
    pub is_bullish: bool,
    pub is_bearish: bool,
    pub in_cloud: bool,
}

impl IchimokuData {
    /// Compute the cloud at `index`, or `None` with fewer than 52 candles of
    /// history.
    pub fn compute(candles: &[Candle], index: usize) -> Option<Self> {
        if index >= candles.len() || index + 1 < ICHIMOKU_WARMUP {
            return None;
        }
        let tenkan = midpoint(candles, index, TENKAN_WINDOW)?;
        let kijun = midpoint(candles, index, KIJUN_WINDOW)?;
        let senkou_b = midpoint(candles, index, SENKOU_B_WINDOW)?;
        let senkou_a = (tenkan + kijun) / 2.0;
        let cloud_top = senkou_a.max(senkou_b);
        let cloud_bottom = senkou_a.min(senkou_b);
        let close = candles[index].close;
        Some(Self {
            tenkan,
            kijun,
            senkou_a,
            senkou_b,
            chikou: close,
            cloud_top,
            cloud_bottom,
            cloud_thickness: cloud_top - cloud_bottom,
            is_bullish: close > cloud_top,
            is_bearish: close < cloud_bottom,
            in_cloud: close >= cloud_bottom && close <= cloud_top,
        })
    }
}

/// (highest high + lowest low) / 2 over the `window` candles ending at `index`.
fn midpoint(candles: &[Candle], index: usize, window: usize) -> Option<f64> {
    if index + 1 < window {
        return None;
    }
    let slice = &candles[index + 1 - window..=index];
    let mut highest = f64::NEG_INFINITY;
    let mut lowest = f64::INFINITY;
    for candle in slice {
        highest = highest.max(candle.high);
        lowest = lowest.min(candle.low);
    }
    Some((highest + lowest) / 2.0)
}
