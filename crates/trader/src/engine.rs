//! One-shot trade orchestration.
//!
//! Wires the pieces together for a single configured trade: balance
//! preflight, optional risk-based symbol/quantity selection, the order
//! lifecycle, and a Greek exposure report sourced from the ticker with
//! the closed-form estimator as fallback.

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

use opt_trade_core::symbol::OptionSymbol;
use opt_trade_core::{estimate_greeks, order_qty, EngineConfig, TradeConfig, MIN_ORDER_QTY};
use opt_trade_bybit::{BybitClient, Side, Ticker};

use crate::lifecycle::{place_and_track, EntryOrder, TradeOutcome};
use crate::selector::choose_symbol_by_risk;
use crate::ticks::TickCache;

/// One Greek's per-contract value and position exposure.
#[derive(Debug, Clone)]
pub struct ExposureRow {
    pub greek: &'static str,
    pub per_contract: f64,
    pub exposure: f64,
}

/// Everything a front end needs to report about one trade attempt.
#[derive(Debug)]
pub struct TradeReport {
    pub timestamp: DateTime<Utc>,
    pub balance: Decimal,
    pub aborted_low_balance: bool,
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub outcome: Option<TradeOutcome>,
    pub exposures: Vec<ExposureRow>,
}

/// Executes the configured trade end to end.
pub async fn run_trade(
    client: &BybitClient,
    ticks: &TickCache,
    trade: &TradeConfig,
    cfg: &EngineConfig,
) -> Result<TradeReport> {
    let timestamp = Utc::now();
    let side: Side = trade.side.parse().map_err(|e: String| anyhow!(e))?;

    let balance = client
        .wallet_balance("USDT")
        .await
        .context("fetching wallet balance")?;
    if balance < cfg.min_balance {
        warn!(%balance, threshold = %cfg.min_balance, "Insufficient balance; aborting trade");
        return Ok(TradeReport {
            timestamp,
            balance,
            aborted_low_balance: true,
            symbol: trade.symbol.clone(),
            side,
            quantity: trade.quantity,
            outcome: None,
            exposures: Vec::new(),
        });
    }

    let mut symbol = trade.symbol.clone();
    let mut quantity = trade.quantity;

    if trade.risk_usd > Decimal::ZERO {
        if let Ok(template) = trade.symbol.parse::<OptionSymbol>() {
            if quantity <= Decimal::ZERO {
                // No quantity configured: size off the template's mark.
                match client.ticker(&symbol).await {
                    Ok(ticker) => {
                        if let Some(mark) = ticker.mark_price() {
                            quantity = order_qty(trade.risk_usd, mark, MIN_ORDER_QTY);
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "Ticker unavailable for risk sizing");
                    }
                }
            }
            let (chosen, mark) =
                choose_symbol_by_risk(client, &template, trade.risk_usd, quantity).await;
            if mark > Decimal::ZERO {
                info!(from = %symbol, to = %chosen, %mark, "Risk selection chose instrument");
                symbol = chosen;
            }
        } else {
            warn!(symbol = %trade.symbol, "Template symbol is not parseable; skipping risk selection");
        }
    }

    if quantity <= Decimal::ZERO {
        bail!("order quantity is zero and risk sizing could not derive one");
    }

    let entry = EntryOrder {
        symbol: symbol.clone(),
        side,
        qty: quantity,
        limit_price: trade.limit_price,
        time_in_force: trade.time_in_force.clone(),
    };
    let outcome = place_and_track(client, ticks, &entry, cfg).await?;

    let exposures = match client.ticker(&symbol).await {
        Ok(ticker) => greek_exposures(&ticker, &symbol, side, quantity, timestamp),
        Err(e) => {
            warn!(error = %e, "Ticker unavailable; skipping Greek report");
            Vec::new()
        }
    };

    Ok(TradeReport {
        timestamp,
        balance,
        aborted_low_balance: false,
        symbol,
        side,
        quantity,
        outcome: Some(outcome),
        exposures,
    })
}

/// Position Greek exposures: the venue's reported Greeks when present,
/// otherwise the closed-form estimate.
fn greek_exposures(
    ticker: &Ticker,
    symbol: &str,
    side: Side,
    quantity: Decimal,
    now: DateTime<Utc>,
) -> Vec<ExposureRow> {
    let direction = match side {
        Side::Buy => 1.0,
        Side::Sell => -1.0,
    };
    let scale = quantity.to_f64().unwrap_or(0.0) * direction;

    let per_contract = ticker
        .greeks()
        .or_else(|| estimated_greeks(ticker, symbol, now));
    let Some((delta, gamma, theta, vega)) = per_contract else {
        return Vec::new();
    };

    [
        ("Delta", delta),
        ("Gamma", gamma),
        ("Theta", theta),
        ("Vega", vega),
    ]
    .into_iter()
    .map(|(greek, per)| ExposureRow {
        greek,
        per_contract: per,
        exposure: per * scale,
    })
    .collect()
}

/// Per-contract `(delta, gamma, theta, vega)` from the Black-Scholes
/// closed form, when the ticker carries enough inputs.
fn estimated_greeks(
    ticker: &Ticker,
    symbol: &str,
    now: DateTime<Utc>,
) -> Option<(f64, f64, f64, f64)> {
    let parsed: OptionSymbol = symbol.parse().ok()?;
    let spot = ticker
        .underlying_price()
        .or_else(|| ticker.index_price().and_then(|d| d.to_f64()))?;
    let strike = parsed.strike.to_f64()?;
    let iv = ticker.mark_iv()?;
    // Options settle at 08:00 UTC on the expiry date.
    let expiry = parsed.expiry.and_hms_opt(8, 0, 0)?.and_utc();
    let years = (expiry - now).num_seconds() as f64 / (365.0 * 86_400.0);
    let g = estimate_greeks(parsed.option_type, spot, strike, years, iv, 1.0)?;
    Some((g.delta, g.gamma, g.theta_per_day, g.vega_per_pct))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ticker(value: serde_json::Value) -> Ticker {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn reported_greeks_win_over_the_estimator() {
        let t = ticker(serde_json::json!({
            "symbol": "BTC-7JUN25-114000-P-USDT",
            "delta": "-0.038841247",
            "gamma": "0.000305838",
            "theta": "-2.161295116",
            "vega": "0.094796374",
            "markIv": "0.55",
            "underlyingPrice": "104000"
        }));
        let rows = greek_exposures(
            &t,
            "BTC-7JUN25-114000-P-USDT",
            Side::Buy,
            dec!(2),
            Utc::now(),
        );
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].greek, "Delta");
        assert!((rows[0].exposure - (-0.038841247 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn sell_side_flips_the_exposure_sign() {
        let t = ticker(serde_json::json!({
            "symbol": "S",
            "delta": "0.5", "gamma": "0.1", "theta": "-1.0", "vega": "0.2"
        }));
        let rows = greek_exposures(&t, "S", Side::Sell, dec!(1), Utc::now());
        assert!(rows[0].exposure < 0.0);
        assert!(rows[2].exposure > 0.0);
    }

    #[test]
    fn estimator_fills_in_when_ticker_omits_greeks() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let t = ticker(serde_json::json!({
            "symbol": "BTC-7JUN25-114000-C-USDT",
            "markPrice": "500",
            "underlyingPrice": "110000",
            "markIv": "0.5"
        }));
        let rows = greek_exposures(&t, "BTC-7JUN25-114000-C-USDT", Side::Buy, dec!(1), now);
        assert_eq!(rows.len(), 4);
        let delta = rows[0].exposure;
        assert!(delta > 0.0 && delta < 1.0, "call delta = {delta}");
        assert!(rows[2].exposure < 0.0, "long theta must bleed");
    }

    #[test]
    fn no_greeks_and_no_inputs_yields_no_rows() {
        let t = ticker(serde_json::json!({ "symbol": "S", "markPrice": "1" }));
        assert!(greek_exposures(&t, "S", Side::Buy, dec!(1), Utc::now()).is_empty());
    }
}
