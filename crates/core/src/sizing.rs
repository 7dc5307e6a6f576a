//! Risk-budget position sizing.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Smallest tradable contract increment on the options venue.
pub const MIN_ORDER_QTY: Decimal = dec!(0.01);

/// Converts a risk budget in quote currency into an order quantity rounded
/// to the exchange increment.
///
/// Returns zero when either the budget or the price is zero (sizing
/// disabled). A budget worth less than one increment still buys exactly one
/// increment; otherwise the raw quantity is rounded to the nearest multiple
/// of `min_qty`, half-to-even on the increment count.
#[must_use]
pub fn order_qty(risk: Decimal, price: Decimal, min_qty: Decimal) -> Decimal {
    if risk <= Decimal::ZERO || price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let mut qty = risk / price;
    if qty < min_qty {
        qty = min_qty;
    }
    let steps = (qty / min_qty).round();
    (steps * min_qty).round_dp(2)
}
