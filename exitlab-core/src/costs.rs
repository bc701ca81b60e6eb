//! Cost model — taker fee and slippage in basis points.
//!
//! Entry fills pay more (price inflated by slippage + fee), exit fills
//! receive less (price deflated symmetrically). Fees are additive across
//! sequential partial fills: every fill, partial or full, goes through the
//! same functions.

use crate::strategy::CostConfig;

const BPS_DENOM: f64 = 10_000.0;

/// Taker fee on a gross fill amount. Always in `[0, amount]` for finite
/// non-negative input and fee rates under 100%.
pub fn trade_fee(amount: f64, costs: &CostConfig) -> f64 {
    (amount * costs.taker_fee_bps as f64 / BPS_DENOM).max(0.0)
}

/// Effective per-trade friction: transaction fee plus slippage cost.
/// Never less than the fee alone.
pub fn effective_trade_cost(amount: f64, is_entry: bool, costs: &CostConfig) -> f64 {
    let slippage_bps = if is_entry {
        costs.entry_slippage_bps
    } else {
        costs.exit_slippage_bps
    };
    trade_fee(amount, costs) + (amount * slippage_bps as f64 / BPS_DENOM).max(0.0)
}

/// Price actually paid on entry: raw price inflated by slippage + fee.
pub fn entry_price_with_costs(price: f64, costs: &CostConfig) -> f64 {
    price * (1.0 + (costs.entry_slippage_bps + costs.taker_fee_bps) as f64 / BPS_DENOM)
}

/// Price actually received on exit: raw price deflated by slippage + fee.
pub fn exit_price_with_costs(price: f64, costs: &CostConfig) -> f64 {
    price * (1.0 - (costs.exit_slippage_bps + costs.taker_fee_bps) as f64 / BPS_DENOM)
}
