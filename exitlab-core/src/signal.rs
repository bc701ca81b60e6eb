//! Signal evaluator: boolean condition trees over indicator snapshots.
//!
//! A `SignalGroup` is AND/OR logic over conditions and nested groups. A
//! condition compares an indicator field against a constant or a second
//! indicator field, optionally re-evaluated over a lookback window or as a
//! cross between consecutive candles.
//!
//! Missing values never error: a condition over a warm-up `None` (or a cross
//! with no previous candle) is simply unsatisfied.

use serde::{Deserialize, Serialize};

use crate::indicators::IndicatorSnapshot;

/// Minimum post-cross gap for oscillating series (RSI-style); suppresses
/// noise-triggered crosses where the lines barely separate.
pub const MIN_CROSS_GAP: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaField {
    Sma9,
    Sma20,
    Sma50,
    Ema9,
    Ema20,
    Ema50,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IchimokuField {
    Tenkan,
    Kijun,
    SenkouA,
    SenkouB,
    Chikou,
    CloudTop,
    CloudBottom,
    CloudThickness,
}

/// Where a condition reads its value from. A closed union: adding an
/// indicator extends this enum and the compiler finds every match to update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "indicator", content = "field", rename_all = "snake_case")]
pub enum IndicatorSource {
    Price(PriceField),
    Ma(MaField),
    Ichimoku(IchimokuField),
    Rsi,
}

/// Behavior class of a series, used by cross detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueClass {
    /// Raw price/volume.
    Price,
    /// Smoothed trend-following series (MAs, Ichimoku lines).
    Trending,
    /// Bounded oscillators (RSI); crosses need a minimum gap.
    Oscillating,
}

impl IndicatorSource {
    pub fn value_class(&self) -> ValueClass {
        match self {
            IndicatorSource::Price(_) => ValueClass::Price,
            IndicatorSource::Ma(_) | IndicatorSource::Ichimoku(_) => ValueClass::Trending,
            IndicatorSource::Rsi => ValueClass::Oscillating,
        }
    }

    /// Read this source from a snapshot; `None` while the indicator warms up.
    pub fn value(&self, snap: &IndicatorSnapshot) -> Option<f64> {
        match self {
            IndicatorSource::Price(field) => Some(match field {
                PriceField::Open => snap.candle.open,
                PriceField::High => snap.candle.high,
                PriceField::Low => snap.candle.low,
                PriceField::Close => snap.candle.close,
                PriceField::Volume => snap.candle.volume,
            }),
            IndicatorSource::Ma(field) => match field {
                MaField::Sma9 => snap.ma.sma9,
                MaField::Sma20 => snap.ma.sma20,
                MaField::Sma50 => snap.ma.sma50,
                MaField::Ema9 => snap.ma.ema9,
                MaField::Ema20 => snap.ma.ema20,
                MaField::Ema50 => snap.ma.ema50,
            },
            IndicatorSource::Ichimoku(field) => snap.ichimoku.map(|cloud| match field {
                IchimokuField::Tenkan => cloud.tenkan,
                IchimokuField::Kijun => cloud.kijun,
                IchimokuField::SenkouA => cloud.senkou_a,
                IchimokuField::SenkouB => cloud.senkou_b,
                IchimokuField::Chikou => cloud.chikou,
                IchimokuField::CloudTop => cloud.cloud_top,
                IchimokuField::CloudBottom => cloud.cloud_bottom,
                IchimokuField::CloudThickness => cloud.cloud_thickness,
            }),
            IndicatorSource::Rsi => snap.rsi,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "crosses_above")]
    CrossesAbove,
    #[serde(rename = "crosses_below")]
    CrossesBelow,
}

/// Right-hand side of a condition: a constant or another indicator field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Value(f64),
    Indicator(IndicatorSource),
}

/// Require the base condition to hold on at least `min_true` of the last
/// `bars` candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lookback {
    pub bars: usize,
    pub min_true: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub source: IndicatorSource,
    pub op: CompareOp,
    pub rhs: Operand,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback: Option<Lookback>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalNode {
    Group(SignalGroup),
    Condition(Condition),
}

/// AND/OR tree of conditions. `AND` over no children is satisfied, `OR` is not
/// (`every()`/`some()` semantics).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalGroup {
    pub logic: Logic,
    pub children: Vec<SignalNode>,
}

impl SignalGroup {
    pub fn all(children: Vec<SignalNode>) -> Self {
        Self {
            logic: Logic::And,
            children,
        }
    }

    pub fn any(children: Vec<SignalNode>) -> Self {
        Self {
            logic: Logic::Or,
            children,
        }
    }

    /// Evaluate this group at `index` of a precomputed snapshot series.
    pub fn evaluate(&self, series: &[IndicatorSnapshot], index: usize) -> bool {
        match self.logic {
            Logic::And => self
                .children
                .iter()
                .all(|child| child.evaluate(series, index)),
            Logic::Or => self
                .children
                .iter()
                .any(|child| child.evaluate(series, index)),
        }
    }
}

impl SignalNode {
    fn evaluate(&self, series: &[IndicatorSnapshot], index: usize) -> bool {
        match self {
            SignalNode::Group(group) => group.evaluate(series, index),
            SignalNode::Condition(cond) => cond.evaluate(series, index),
        }
    }
}

impl Condition {
    /// Evaluate at `index`, applying the lookback window when configured.
    pub fn evaluate(&self, series: &[IndicatorSnapshot], index: usize) -> bool {
        match self.lookback {
            None => self.evaluate_base(series, index),
            Some(Lookback { bars, min_true }) => {
                if bars == 0 || index + 1 < bars {
                    // Not enough history for the window: unsatisfied.
                    return false;
                }
                let satisfied = (index + 1 - bars..=index)
                    .filter(|&i| self.evaluate_base(series, i))
                    .count();
                satisfied >= min_true
            }
        }
    }

    fn evaluate_base(&self, series: &[IndicatorSnapshot], index: usize) -> bool {
        if index >= series.len() {
            return false;
        }
        let Some(lhs) = self.source.value(&series[index]) else {
            return false;
        };
        let rhs = match self.rhs {
            Operand::Value(v) => Some(v),
            Operand::Indicator(src) => src.value(&series[index]),
        };
        let Some(rhs) = rhs else {
            return false;
        };

        match self.op {
            CompareOp::Gt => lhs > rhs,
            CompareOp::Ge => lhs >= rhs,
            CompareOp::Lt => lhs < rhs,
            CompareOp::Le => lhs <= rhs,
            CompareOp::Eq => lhs == rhs,
            CompareOp::Ne => lhs != rhs,
            CompareOp::CrossesAbove => self.cross(series, index, lhs, rhs, true),
            CompareOp::CrossesBelow => self.cross(series, index, lhs, rhs, false),
        }
    }

    /// Cross detection needs both current and previous values; any missing
    /// previous value makes the condition unsatisfied.
    fn cross(
        &self,
        series: &[IndicatorSnapshot],
        index: usize,
        lhs: f64,
        rhs: f64,
        above: bool,
    ) -> bool {
        if index == 0 {
            return false;
        }
        let prev = &series[index - 1];
        let Some(prev_lhs) = self.source.value(prev) else {
            return false;
        };
        let prev_rhs = match self.rhs {
            Operand::Value(v) => Some(v),
            Operand::Indicator(src) => src.value(prev),
        };
        let Some(prev_rhs) = prev_rhs else {
            return false;
        };

        let crossed = if above {
            prev_lhs <= prev_rhs && lhs > rhs
        } else {
            prev_lhs >= prev_rhs && lhs < rhs
        };
        if !crossed {
            return false;
        }

        // Oscillators cross on conviction, not on a hair's width.
        if self.is_oscillating_pair() {
            return (lhs - rhs).abs() > MIN_CROSS_GAP;
        }
        true
    }

    fn is_oscillating_pair(&self) -> bool {
        if self.source.value_class() == ValueClass::Oscillating {
            return true;
        }
        matches!(self.rhs, Operand::Indicator(src) if src.value_class() == ValueClass::Oscillating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Candle;
    use crate::indicators::snapshot_series;

    fn series_from_closes(closes: &[f64]) -> Vec<IndicatorSnapshot> {
        let candles: Vec<Candle> = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: 1_700_000_000 + i as i64 * 60,
                open: close,
                high: close,
                low: close,
                close,
                volume: 1_000.0,
            })
            .collect();
        snapshot_series(&candles)
    }

    fn close_above(value: f64) -> Condition {
        Condition {
            source: IndicatorSource::Price(PriceField::Close),
            op: CompareOp::Gt,
            rhs: Operand::Value(value),
            lookback: None,
        }
    }

    #[test]
    fn simple_comparison() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        assert!(close_above(2.5).evaluate(&series, 2));
        assert!(!close_above(2.5).evaluate(&series, 1));
    }

    #[test]
    fn missing_indicator_is_unsatisfied() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        let cond = Condition {
            source: IndicatorSource::Ma(MaField::Sma50),
            op: CompareOp::Lt,
            rhs: Operand::Value(10.0),
            lookback: None,
        };
        // sma50 is None with 3 candles: never satisfied, never an error.
        assert!(!cond.evaluate(&series, 2));
    }

    #[test]
    fn price_crosses_above_constant() {
        let series = series_from_closes(&[1.0, 1.0, 1.2, 1.3]);
        let cond = Condition {
            source: IndicatorSource::Price(PriceField::Close),
            op: CompareOp::CrossesAbove,
            rhs: Operand::Value(1.1),
            lookback: None,
        };
        assert!(!cond.evaluate(&series, 1)); // still below
        assert!(cond.evaluate(&series, 2)); // crossed this candle
        assert!(!cond.evaluate(&series, 3)); // already above, no new cross
    }

    #[test]
    fn cross_at_index_zero_is_unsatisfied() {
        let series = series_from_closes(&[2.0, 2.5]);
        let cond = Condition {
            source: IndicatorSource::Price(PriceField::Close),
            op: CompareOp::CrossesAbove,
            rhs: Operand::Value(1.0),
            lookback: None,
        };
        assert!(!cond.evaluate(&series, 0));
    }

    #[test]
    fn oscillator_cross_requires_gap() {
        // Build two series crossing a constant: one barely, one decisively.
        let mut barely = series_from_closes(&vec![1.0; 20]);
        let mut decisive = barely.clone();
        for (i, snap) in barely.iter_mut().enumerate() {
            snap.rsi = Some(if i < 19 { 49.0 } else { 50.005 });
        }
        for (i, snap) in decisive.iter_mut().enumerate() {
            snap.rsi = Some(if i < 19 { 49.0 } else { 55.0 });
        }
        let cond = Condition {
            source: IndicatorSource::Rsi,
            op: CompareOp::CrossesAbove,
            rhs: Operand::Value(50.0),
            lookback: None,
        };
        assert!(!cond.evaluate(&barely, 19), "gap 0.005 should be suppressed");
        assert!(cond.evaluate(&decisive, 19));
    }

    #[test]
    fn trending_cross_fires_on_any_sign_change() {
        let series = series_from_closes(&[1.0, 1.0, 1.0001]);
        let cond = Condition {
            source: IndicatorSource::Price(PriceField::Close),
            op: CompareOp::CrossesAbove,
            rhs: Operand::Value(1.00005),
            lookback: None,
        };
        assert!(cond.evaluate(&series, 2));
    }

    #[test]
    fn lookback_counts_true_bars() {
        let series = series_from_closes(&[1.0, 3.0, 1.0, 3.0, 3.0]);
        let cond = Condition {
            lookback: Some(Lookback {
                bars: 4,
                min_true: 3,
            }),
            ..close_above(2.0)
        };
        // Last 4 closes at index 4: [3,1,3,3] → 3 true.
        assert!(cond.evaluate(&series, 4));
        // Last 4 closes at index 3: [1,3,1,3] → 2 true.
        assert!(!cond.evaluate(&series, 3));
    }

    #[test]
    fn lookback_longer_than_history_is_unsatisfied() {
        let series = series_from_closes(&[3.0, 3.0]);
        let cond = Condition {
            lookback: Some(Lookback {
                bars: 5,
                min_true: 1,
            }),
            ..close_above(2.0)
        };
        assert!(!cond.evaluate(&series, 1));
    }

    #[test]
    fn group_logic_and_or() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        let both = SignalGroup::all(vec![
            SignalNode::Condition(close_above(2.5)),
            SignalNode::Condition(close_above(10.0)),
        ]);
        let either = SignalGroup::any(vec![
            SignalNode::Condition(close_above(2.5)),
            SignalNode::Condition(close_above(10.0)),
        ]);
        assert!(!both.evaluate(&series, 2));
        assert!(either.evaluate(&series, 2));
    }

    #[test]
    fn nested_groups() {
        let series = series_from_closes(&[1.0, 2.0, 3.0]);
        let group = SignalGroup::all(vec![
            SignalNode::Condition(close_above(1.5)),
            SignalNode::Group(SignalGroup::any(vec![
                SignalNode::Condition(close_above(100.0)),
                SignalNode::Condition(close_above(2.5)),
            ])),
        ]);
        assert!(group.evaluate(&series, 2));
        assert!(!group.evaluate(&series, 1));
    }

    #[test]
    fn empty_groups_follow_every_some() {
        let series = series_from_closes(&[1.0]);
        assert!(SignalGroup::all(vec![]).evaluate(&series, 0));
        assert!(!SignalGroup::any(vec![]).evaluate(&series, 0));
    }

    #[test]
    fn condition_tree_roundtrips_as_json() {
        let group = SignalGroup::all(vec![
            SignalNode::Condition(Condition {
                source: IndicatorSource::Ma(MaField::Ema9),
                op: CompareOp::CrossesAbove,
                rhs: Operand::Indicator(IndicatorSource::Ma(MaField::Ema20)),
                lookback: None,
            }),
            SignalNode::Condition(Condition {
                source: IndicatorSource::Ichimoku(IchimokuField::CloudTop),
                op: CompareOp::Lt,
                rhs: Operand::Indicator(IndicatorSource::Price(PriceField::Close)),
                lookback: Some(Lookback {
                    bars: 3,
                    min_true: 2,
                }),
            }),
        ]);
        let json = serde_json::to_string(&group).unwrap();
        let deser: SignalGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(group, deser);
    }
}
