//! Bybit v5 REST client for the option category.
//!
//! Private calls are signed per request; market-data calls (tickers,
//! instruments) go out unauthenticated. Every response travels in the
//! `retCode`/`retMsg`/`result` envelope and a non-zero code surfaces as
//! [`ExchangeError::Api`] — with the single exception of "no active orders"
//! on cancel-all, which is vacuous success.

use chrono::{DateTime, Utc};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

use opt_trade_core::symbol::OptionType;

use crate::auth::Credentials;
use crate::error::{ExchangeError, CODE_NO_ACTIVE_ORDERS};
use crate::history::TimeWindows;
use crate::models::{
    CursorPage, DeliveryRecord, Envelope, ExecutionRecord, Instrument, OrderAck, OrderDetail,
    OrderRequest, PositionEntry, Side, Ticker,
};

/// Demo-trading REST endpoint.
pub const DEMO_API_URL: &str = "https://api-demo.bybit.com";

const CATEGORY: &str = "option";

/// REST client for the options venue.
pub struct BybitClient {
    http: Client,
    base_url: String,
    creds: Credentials,
    recv_window_ms: u64,
}

impl BybitClient {
    /// Creates a client against the demo endpoint.
    pub fn new(creds: Credentials) -> Self {
        Self {
            http: Client::new(),
            base_url: DEMO_API_URL.to_string(),
            creds,
            recv_window_ms: 5000,
        }
    }

    /// Sets a custom base URL (live endpoint, or a test server).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Sets the signature receive window in milliseconds.
    #[must_use]
    pub fn with_recv_window(mut self, ms: u64) -> Self {
        self.recv_window_ms = ms;
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // -------------------------------------------------------------------
    // Transport
    // -------------------------------------------------------------------

    async fn get_public<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<Option<T>, ExchangeError> {
        let url = format!("{}{}?{}", self.base_url, path, query);
        tracing::debug!(%url, "GET");
        let resp = self.http.get(&url).send().await?;
        Self::decode(resp).await
    }

    pub(crate) async fn get_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &str,
    ) -> Result<Option<T>, ExchangeError> {
        let timestamp = Utc::now().timestamp_millis().to_string();
        let recv_window = self.recv_window_ms.to_string();
        let signature = self.creds.sign(&timestamp, &recv_window, query);
        let url = format!("{}{}?{}", self.base_url, path, query);
        tracing::debug!(%url, "GET (signed)");
        let resp = self
            .http
            .get(&url)
            .header("X-BAPI-API-KEY", &self.creds.api_key)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-TIMESTAMP", timestamp)
            .header("X-BAPI-RECV-WINDOW", recv_window)
            .header("X-BAPI-SIGN-TYPE", "2")
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn post_signed<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<Option<T>, ExchangeError> {
        let body_str =
            serde_json::to_string(body).map_err(|e| ExchangeError::Decode(e.to_string()))?;
        let timestamp = Utc::now().timestamp_millis().to_string();
        let recv_window = self.recv_window_ms.to_string();
        let signature = self.creds.sign(&timestamp, &recv_window, &body_str);
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, "POST (signed)");
        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-BAPI-API-KEY", &self.creds.api_key)
            .header("X-BAPI-SIGN", signature)
            .header("X-BAPI-TIMESTAMP", timestamp)
            .header("X-BAPI-RECV-WINDOW", recv_window)
            .header("X-BAPI-SIGN-TYPE", "2")
            .body(body_str)
            .send()
            .await?;
        Self::decode(resp).await
    }

    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<Option<T>, ExchangeError> {
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| ExchangeError::Decode(e.to_string()))?;
        if envelope.ret_code != 0 {
            return Err(ExchangeError::Api {
                code: envelope.ret_code,
                message: envelope.ret_msg,
            });
        }
        Ok(envelope.result)
    }

    fn missing(context: &str) -> ExchangeError {
        ExchangeError::Decode(format!("missing result for {context}"))
    }

    // -------------------------------------------------------------------
    // Account
    // -------------------------------------------------------------------

    /// Unified-account wallet balance for one coin; zero if the coin has no
    /// entry.
    pub async fn wallet_balance(&self, coin: &str) -> Result<Decimal, ExchangeError> {
        let page: CursorPage<WalletAccount> = self
            .get_signed("/v5/account/wallet-balance", "accountType=UNIFIED")
            .await?
            .ok_or_else(|| Self::missing("wallet-balance"))?;
        let balance = page
            .list
            .iter()
            .flat_map(|account| &account.coin)
            .find(|c| c.coin == coin)
            .and_then(|c| c.wallet_balance.as_deref())
            .and_then(|b| b.parse().ok())
            .unwrap_or(Decimal::ZERO);
        Ok(balance)
    }

    // -------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------

    /// Submits an order. Limit when a price is set, market otherwise; a
    /// fresh idempotency token is attached so a retried submission is never
    /// duplicated by the venue.
    pub async fn create_order(&self, req: &OrderRequest) -> Result<OrderAck, ExchangeError> {
        let order_link_id = Uuid::new_v4().simple().to_string();
        let mut body = json!({
            "category": CATEGORY,
            "symbol": req.symbol,
            "side": req.side.as_str(),
            "orderType": if req.price.is_some() { "Limit" } else { "Market" },
            "qty": req.qty.to_string(),
            "timeInForce": req.time_in_force,
            "orderLinkId": order_link_id,
        });
        if let Some(price) = req.price {
            body["price"] = json!(price.to_string());
        }
        if req.reduce_only {
            body["reduceOnly"] = json!(true);
        }
        let ack: OrderAck = self
            .post_signed("/v5/order/create", &body)
            .await?
            .ok_or_else(|| Self::missing("order create"))?;
        tracing::info!(
            symbol = %req.symbol,
            side = %req.side,
            qty = %req.qty,
            reduce_only = req.reduce_only,
            order_id = %ack.order_id,
            "Order placed"
        );
        Ok(ack)
    }

    /// Open option orders, with Filled/Cancelled filtered out client-side.
    pub async fn open_orders(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<OrderDetail>, ExchangeError> {
        let mut query = format!("category={CATEGORY}");
        if let Some(symbol) = symbol {
            query.push_str(&format!("&symbol={symbol}"));
        }
        let page: CursorPage<OrderDetail> = self
            .get_signed("/v5/order/realtime", &query)
            .await?
            .ok_or_else(|| Self::missing("open orders"))?;
        Ok(page
            .list
            .into_iter()
            .filter(|o| o.order_status.is_open())
            .collect())
    }

    /// Realtime detail of one order, if the venue still reports it.
    pub async fn order_detail(
        &self,
        symbol: &str,
        order_id: &str,
    ) -> Result<Option<OrderDetail>, ExchangeError> {
        let query = format!("category={CATEGORY}&symbol={symbol}&orderId={order_id}");
        let page: CursorPage<OrderDetail> = self
            .get_signed("/v5/order/realtime", &query)
            .await?
            .ok_or_else(|| Self::missing("order detail"))?;
        Ok(page.list.into_iter().next())
    }

    /// Executions for one order (the venue lists per symbol; the order
    /// filter is applied here).
    pub async fn executions(
        &self,
        symbol: &str,
        order_id: &str,
        limit: u32,
    ) -> Result<Vec<ExecutionRecord>, ExchangeError> {
        let query = format!("category={CATEGORY}&symbol={symbol}&limit={limit}");
        let page: CursorPage<ExecutionRecord> = self
            .get_signed("/v5/execution/list", &query)
            .await?
            .ok_or_else(|| Self::missing("executions"))?;
        Ok(page
            .list
            .into_iter()
            .filter(|r| r.order_id == order_id)
            .collect())
    }

    /// Cancels every open option order. The venue reports "no active
    /// orders" as an error code; that is a no-op, not a failure.
    pub async fn cancel_all_orders(&self) -> Result<(), ExchangeError> {
        let body = json!({ "category": CATEGORY });
        match self
            .post_signed::<serde_json::Value>("/v5/order/cancel-all", &body)
            .await
        {
            Ok(_) => Ok(()),
            Err(ExchangeError::Api { code, .. }) if code == CODE_NO_ACTIVE_ORDERS => {
                tracing::info!("No open orders to cancel");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Amends price and/or quantity of an open order.
    pub async fn amend_order(
        &self,
        order_id: &str,
        price: Option<Decimal>,
        qty: Option<Decimal>,
    ) -> Result<(), ExchangeError> {
        let mut body = json!({ "category": CATEGORY, "orderId": order_id });
        if let Some(price) = price {
            body["price"] = json!(price.to_string());
        }
        if let Some(qty) = qty {
            body["qty"] = json!(qty.to_string());
        }
        self.post_signed::<serde_json::Value>("/v5/order/amend", &body)
            .await?;
        tracing::info!(order_id, "Order amended");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Positions
    // -------------------------------------------------------------------

    /// Current option positions.
    pub async fn positions(
        &self,
        symbol: Option<&str>,
    ) -> Result<Vec<PositionEntry>, ExchangeError> {
        let mut query = format!("category={CATEGORY}");
        if let Some(symbol) = symbol {
            query.push_str(&format!("&symbol={symbol}"));
        }
        let page: CursorPage<PositionEntry> = self
            .get_signed("/v5/position/list", &query)
            .await?
            .ok_or_else(|| Self::missing("positions"))?;
        Ok(page.list)
    }

    /// Closes a position with a reduce-only market order.
    pub async fn close_position(
        &self,
        symbol: &str,
        side: Side,
        qty: Decimal,
    ) -> Result<OrderAck, ExchangeError> {
        self.create_order(&OrderRequest::market(symbol, side, qty).with_reduce_only(true))
            .await
    }

    // -------------------------------------------------------------------
    // Market data (public)
    // -------------------------------------------------------------------

    /// All listed instruments for a base coin, optionally restricted by
    /// option type, draining the cursor chain.
    pub async fn instruments(
        &self,
        base_coin: &str,
        option_type: Option<OptionType>,
    ) -> Result<Vec<Instrument>, ExchangeError> {
        let mut instruments = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut query = format!("category={CATEGORY}&baseCoin={base_coin}&limit=1000");
            if let Some(t) = option_type {
                query.push_str(&format!("&optionType={}", t.api_name()));
            }
            if let Some(c) = &cursor {
                query.push_str(&format!("&cursor={}", urlencoding::encode(c)));
            }
            let page: CursorPage<Instrument> = self
                .get_public("/v5/market/instruments-info", &query)
                .await?
                .ok_or_else(|| Self::missing("instruments"))?;
            instruments.extend(page.list);
            match page.next_page_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(instruments)
    }

    /// Metadata for one instrument, if listed.
    pub async fn instrument(&self, symbol: &str) -> Result<Option<Instrument>, ExchangeError> {
        let query = format!("category={CATEGORY}&symbol={symbol}");
        let page: CursorPage<Instrument> = self
            .get_public("/v5/market/instruments-info", &query)
            .await?
            .ok_or_else(|| Self::missing("instrument"))?;
        Ok(page.list.into_iter().next())
    }

    /// Ticker snapshot for one symbol.
    pub async fn ticker(&self, symbol: &str) -> Result<Ticker, ExchangeError> {
        let query = format!("category={CATEGORY}&symbol={symbol}");
        let page: CursorPage<Ticker> = self
            .get_public("/v5/market/tickers", &query)
            .await?
            .ok_or_else(|| Self::missing("tickers"))?;
        page.list
            .into_iter()
            .next()
            .ok_or_else(|| ExchangeError::Empty(format!("no ticker data for {symbol}")))
    }

    // -------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------

    /// Execution history pager over `[start, end]`, walking backward in
    /// venue-permitted windows.
    pub fn execution_windows(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> TimeWindows<'_, ExecutionRecord> {
        TimeWindows::new(self, "/v5/execution/list", start, end, limit)
    }

    /// Delivery (settlement) history pager over `[start, end]`.
    pub fn delivery_windows(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> TimeWindows<'_, DeliveryRecord> {
        TimeWindows::new(self, "/v5/asset/delivery-record", start, end, limit)
    }
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletAccount {
    #[serde(default)]
    coin: Vec<WalletCoin>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletCoin {
    coin: String,
    #[serde(default)]
    wallet_balance: Option<String>,
}
