//! Wire models for the v5 option API.
//!
//! The venue encodes every number as a string and uses the empty string for
//! absent values, so numeric fields are kept as raw strings with typed
//! accessors. Accessors return `None` (or zero, where the caller treats a
//! missing value as zero) instead of failing on the venue's sentinels.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use opt_trade_core::symbol::OptionSymbol;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    #[must_use]
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(format!("invalid order side: {other}")),
        }
    }
}

/// Exchange-assigned order status. The exchange is the sole owner of these
/// transitions; this client only observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
    #[default]
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Whether the order is still working on the book.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Filled | Self::Cancelled)
    }

    /// Whether any quantity has been executed.
    #[must_use]
    pub fn has_fills(&self) -> bool {
        matches!(self, Self::Filled | Self::PartiallyFilled)
    }
}

/// Intent for one order submission.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    /// Limit price; `None` submits a market order.
    pub price: Option<Decimal>,
    pub time_in_force: String,
    pub reduce_only: bool,
}

impl OrderRequest {
    pub fn market(symbol: impl Into<String>, side: Side, qty: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            qty,
            price: None,
            time_in_force: "GTC".to_string(),
            reduce_only: false,
        }
    }

    pub fn limit(symbol: impl Into<String>, side: Side, qty: Decimal, price: Decimal) -> Self {
        Self {
            price: Some(price),
            ..Self::market(symbol, side, qty)
        }
    }

    #[must_use]
    pub fn with_time_in_force(mut self, tif: impl Into<String>) -> Self {
        self.time_in_force = tif.into();
        self
    }

    /// Marks the order as only allowed to decrease an existing position.
    #[must_use]
    pub fn with_reduce_only(mut self, reduce_only: bool) -> Self {
        self.reduce_only = reduce_only;
        self
    }
}

/// Acknowledgement returned by order creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderAck {
    pub order_id: String,
    #[serde(default)]
    pub order_link_id: String,
}

/// Realtime order detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetail {
    pub order_id: String,
    #[serde(default)]
    pub order_link_id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub order_status: OrderStatus,
    #[serde(default)]
    side: String,
    #[serde(default)]
    qty: Option<String>,
    #[serde(default)]
    price: Option<String>,
    #[serde(default)]
    avg_price: Option<String>,
}

impl OrderDetail {
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        self.side.parse().ok()
    }

    /// Average fill price, when the venue reports a non-zero one.
    /// Unfilled orders carry `""` or `"0"`, both of which mean "not yet".
    #[must_use]
    pub fn avg_price(&self) -> Option<Decimal> {
        parse_decimal(self.avg_price.as_deref()).filter(|p| !p.is_zero())
    }

    /// Quoted limit price, when non-zero (market orders carry `"0"`).
    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        parse_decimal(self.price.as_deref()).filter(|p| !p.is_zero())
    }

    #[must_use]
    pub fn qty(&self) -> Option<Decimal> {
        parse_decimal(self.qty.as_deref())
    }
}

/// One fill. Several of these may belong to a single order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub exec_id: Option<String>,
    #[serde(default)]
    pub order_type: Option<String>,
    #[serde(default)]
    side: String,
    #[serde(default)]
    exec_price: Option<String>,
    #[serde(default)]
    exec_qty: Option<String>,
    #[serde(default)]
    exec_fee: Option<String>,
    #[serde(default)]
    exec_value: Option<String>,
    #[serde(default)]
    exec_time: Option<String>,
    #[serde(default)]
    closed_pnl: Option<String>,
    #[serde(default)]
    realised_pnl: Option<String>,
    #[serde(default)]
    exec_pnl: Option<String>,
}

impl ExecutionRecord {
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        self.side.parse().ok()
    }

    #[must_use]
    pub fn price(&self) -> Option<Decimal> {
        parse_decimal(self.exec_price.as_deref())
    }

    #[must_use]
    pub fn qty(&self) -> Option<Decimal> {
        parse_decimal(self.exec_qty.as_deref())
    }

    /// Fee paid on this fill; unparseable or absent counts as zero.
    #[must_use]
    pub fn fee(&self) -> Decimal {
        parse_decimal(self.exec_fee.as_deref()).unwrap_or(Decimal::ZERO)
    }

    /// Traded value; unparseable or absent counts as zero.
    #[must_use]
    pub fn value(&self) -> Decimal {
        parse_decimal(self.exec_value.as_deref()).unwrap_or(Decimal::ZERO)
    }

    /// Execution time as epoch milliseconds.
    #[must_use]
    pub fn exec_time_ms(&self) -> Option<i64> {
        self.exec_time.as_deref().and_then(|t| t.parse().ok())
    }

    /// First P&L figure the venue reported for this fill, if any.
    #[must_use]
    pub fn reported_pnl(&self) -> Option<Decimal> {
        [&self.closed_pnl, &self.realised_pnl, &self.exec_pnl]
            .into_iter()
            .find_map(|f| parse_decimal(f.as_deref()))
    }
}

/// One option delivery (settlement at expiry).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRecord {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    side: String,
    #[serde(default)]
    position: Option<String>,
    #[serde(default)]
    delivery_price: Option<String>,
    #[serde(default)]
    strike: Option<String>,
    #[serde(default)]
    fee: Option<String>,
    #[serde(default)]
    delivery_rpl: Option<String>,
    #[serde(default)]
    delivery_time: Option<String>,
}

impl DeliveryRecord {
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        self.side.parse().ok()
    }

    #[must_use]
    pub fn delivery_price(&self) -> Option<Decimal> {
        parse_decimal(self.delivery_price.as_deref())
    }

    /// Realized P&L of the delivery.
    #[must_use]
    pub fn realized_pnl(&self) -> Option<Decimal> {
        parse_decimal(self.delivery_rpl.as_deref())
    }

    #[must_use]
    pub fn delivery_time_ms(&self) -> Option<i64> {
        self.delivery_time.as_deref().and_then(|t| t.parse().ok())
    }
}

/// An open position. Mutated only by the exchange; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionEntry {
    pub symbol: String,
    #[serde(default)]
    side: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    avg_price: Option<String>,
    #[serde(default)]
    mark_price: Option<String>,
    #[serde(default)]
    unrealised_pnl: Option<String>,
}

impl PositionEntry {
    /// Position side; flat positions report `"None"` and yield `None`.
    #[must_use]
    pub fn side(&self) -> Option<Side> {
        self.side.parse().ok()
    }

    /// Absolute position size; zero when absent.
    #[must_use]
    pub fn size(&self) -> Decimal {
        parse_decimal(self.size.as_deref())
            .map(|d| d.abs())
            .unwrap_or(Decimal::ZERO)
    }

    #[must_use]
    pub fn avg_price(&self) -> Option<Decimal> {
        parse_decimal(self.avg_price.as_deref())
    }

    #[must_use]
    pub fn unrealised_pnl(&self) -> Option<Decimal> {
        parse_decimal(self.unrealised_pnl.as_deref())
    }
}

/// Ticker snapshot: mark price plus optional Greeks. Ephemeral — always
/// re-fetched, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: String,
    #[serde(default)]
    mark_price: Option<String>,
    #[serde(default)]
    index_price: Option<String>,
    #[serde(default)]
    underlying_price: Option<String>,
    #[serde(default)]
    mark_iv: Option<String>,
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    gamma: Option<String>,
    #[serde(default)]
    vega: Option<String>,
    #[serde(default)]
    theta: Option<String>,
}

impl Ticker {
    #[must_use]
    pub fn mark_price(&self) -> Option<Decimal> {
        parse_decimal(self.mark_price.as_deref())
    }

    #[must_use]
    pub fn index_price(&self) -> Option<Decimal> {
        parse_decimal(self.index_price.as_deref())
    }

    #[must_use]
    pub fn underlying_price(&self) -> Option<f64> {
        parse_f64(self.underlying_price.as_deref())
    }

    /// Mark implied volatility as a fraction (e.g. `0.55`).
    #[must_use]
    pub fn mark_iv(&self) -> Option<f64> {
        parse_f64(self.mark_iv.as_deref())
    }

    #[must_use]
    pub fn delta(&self) -> Option<f64> {
        parse_f64(self.delta.as_deref())
    }

    #[must_use]
    pub fn gamma(&self) -> Option<f64> {
        parse_f64(self.gamma.as_deref())
    }

    #[must_use]
    pub fn vega(&self) -> Option<f64> {
        parse_f64(self.vega.as_deref())
    }

    #[must_use]
    pub fn theta(&self) -> Option<f64> {
        parse_f64(self.theta.as_deref())
    }

    /// Per-contract Greeks when the venue reports all four.
    #[must_use]
    pub fn greeks(&self) -> Option<(f64, f64, f64, f64)> {
        Some((self.delta()?, self.gamma()?, self.theta()?, self.vega()?))
    }
}

/// Instrument metadata from instruments-info.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub symbol: String,
    #[serde(default, rename = "optionsType")]
    pub options_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    price_filter: Option<PriceFilter>,
    #[serde(default)]
    lot_size_filter: Option<LotSizeFilter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceFilter {
    #[serde(default)]
    tick_size: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotSizeFilter {
    #[serde(default)]
    min_order_qty: Option<String>,
    #[serde(default)]
    qty_step: Option<String>,
}

impl Instrument {
    /// Minimum price increment, when reported and non-zero.
    #[must_use]
    pub fn tick_size(&self) -> Option<Decimal> {
        self.price_filter
            .as_ref()
            .and_then(|f| parse_decimal(f.tick_size.as_deref()))
            .filter(|t| !t.is_zero())
    }

    #[must_use]
    pub fn min_order_qty(&self) -> Option<Decimal> {
        self.lot_size_filter
            .as_ref()
            .and_then(|f| parse_decimal(f.min_order_qty.as_deref()))
    }

    /// The symbol decomposed into its parts, when well-formed.
    #[must_use]
    pub fn parsed_symbol(&self) -> Option<OptionSymbol> {
        self.symbol.parse().ok()
    }
}

/// Standard `retCode`/`retMsg`/`result` envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope<T> {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    pub result: Option<T>,
}

/// A `result` that is a cursor-paginated list.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CursorPage<T> {
    #[serde(default = "Vec::new")]
    pub list: Vec<T>,
    #[serde(default)]
    pub next_page_cursor: Option<String>,
}

fn parse_decimal(raw: Option<&str>) -> Option<Decimal> {
    raw.filter(|s| !s.is_empty()).and_then(|s| s.parse().ok())
}

fn parse_f64(raw: Option<&str>) -> Option<f64> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}
