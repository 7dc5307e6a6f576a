//! Risk-budget instrument selection.
//!
//! Best-effort sizing aid: given a template symbol, find the instrument in
//! the nearest expiry cohort whose mark price is closest to the implied
//! per-contract risk target. Degrades to the template on any failure
//! rather than erroring — a worse instrument choice is recoverable, an
//! aborted trade is not.

use rust_decimal::Decimal;
use tracing::warn;

use opt_trade_core::symbol::OptionSymbol;
use opt_trade_bybit::BybitClient;

/// Returns `(symbol, mark_price)` for the instrument best matching
/// `risk / qty`, or `(template, 0)` when sizing is disabled or the chain
/// cannot be consulted.
pub async fn choose_symbol_by_risk(
    client: &BybitClient,
    template: &OptionSymbol,
    risk: Decimal,
    qty: Decimal,
) -> (String, Decimal) {
    let fallback = (template.to_string(), Decimal::ZERO);
    if risk <= Decimal::ZERO || qty <= Decimal::ZERO {
        return fallback;
    }

    let instruments = match client
        .instruments(&template.base_coin, Some(template.option_type))
        .await
    {
        Ok(list) => list,
        Err(e) => {
            warn!(error = %e, "Instrument chain unavailable; keeping template symbol");
            return fallback;
        }
    };

    // The upstream optionType filter is not always honored; enforce it
    // here on the parsed symbols.
    let mut candidates: Vec<(String, OptionSymbol)> = instruments
        .iter()
        .filter_map(|i| i.parsed_symbol().map(|s| (i.symbol.clone(), s)))
        .filter(|(_, s)| s.option_type == template.option_type)
        .collect();
    if candidates.is_empty() {
        return fallback;
    }

    // Prefer the template's expiry cohort when listed, else the single
    // earliest expiry available.
    if candidates.iter().any(|(_, s)| s.expiry == template.expiry) {
        candidates.retain(|(_, s)| s.expiry == template.expiry);
    } else if let Some(earliest) = candidates.iter().map(|(_, s)| s.expiry).min() {
        candidates.retain(|(_, s)| s.expiry == earliest);
    }

    let target = risk / qty;
    let mut best: Option<(String, Decimal, Decimal)> = None;
    for (raw_symbol, _) in candidates {
        let ticker = match client.ticker(&raw_symbol).await {
            Ok(t) => t,
            Err(e) => {
                warn!(symbol = %raw_symbol, error = %e, "Ticker unavailable; skipping candidate");
                continue;
            }
        };
        let Some(mark) = ticker.mark_price() else {
            continue;
        };
        let diff = (mark - target).abs();
        // Strict less-than keeps the first candidate on ties.
        if best.as_ref().map_or(true, |(_, _, d)| diff < *d) {
            best = Some((raw_symbol, mark, diff));
        }
    }

    match best {
        Some((symbol, mark, _)) => (symbol, mark),
        None => fallback,
    }
}
