//! Tick-size cache and price rounding.
//!
//! The venue rejects orders whose price is not aligned to the instrument's
//! minimum increment, and binary floating point is exactly the wrong tool
//! for proving alignment, so rounding happens on `Decimal` values. Tick
//! sizes are fetched once per symbol and cached for the life of the
//! process — an instrument's tick never changes while it is listed.

use std::collections::HashMap;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use rust_decimal::{Decimal, RoundingStrategy};

use opt_trade_bybit::BybitClient;

/// Process-wide cache of instrument tick sizes. Injected, so tests can
/// seed it and concurrent lookups share one fetch result.
#[derive(Debug, Default)]
pub struct TickCache {
    sizes: Mutex<HashMap<String, Decimal>>,
}

impl TickCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populates an entry, bypassing the fetch.
    pub fn seed(&self, symbol: impl Into<String>, tick: Decimal) {
        self.sizes.lock().insert(symbol.into(), tick);
    }

    /// The instrument's tick size, fetched on first use.
    ///
    /// A missing or zero tick size is a hard error — there is no safe
    /// default to round against.
    pub async fn tick_size(&self, client: &BybitClient, symbol: &str) -> Result<Decimal> {
        if let Some(tick) = self.sizes.lock().get(symbol).copied() {
            return Ok(tick);
        }
        let instrument = client
            .instrument(symbol)
            .await
            .with_context(|| format!("fetching instrument metadata for {symbol}"))?
            .ok_or_else(|| anyhow!("unknown instrument: {symbol}"))?;
        let tick = instrument
            .tick_size()
            .ok_or_else(|| anyhow!("instrument {symbol} reports no tick size"))?;
        self.sizes.lock().insert(symbol.to_string(), tick);
        Ok(tick)
    }

    /// Rounds a price to the instrument's tick.
    pub async fn round_price(
        &self,
        client: &BybitClient,
        symbol: &str,
        price: Decimal,
    ) -> Result<Decimal> {
        let tick = self.tick_size(client, symbol).await?;
        Ok(round_to_tick(price, tick))
    }
}

/// Rounds `price` to the nearest multiple of `tick`, half away from zero.
/// `tick` must be non-zero; [`TickCache`] never hands out a zero tick.
#[must_use]
pub fn round_to_tick(price: Decimal, tick: Decimal) -> Decimal {
    let steps = (price / tick).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (steps * tick).normalize()
}
