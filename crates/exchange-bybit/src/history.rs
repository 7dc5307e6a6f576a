//! Time-windowed history pagination.
//!
//! The venue caps history queries at a 7-day span and paginates each span
//! with an opaque cursor. [`TimeWindows`] decomposes an arbitrary range
//! into permitted windows, walking backward from the end and fully
//! draining each window's cursor chain before stepping earlier. Very old
//! ranges would otherwise scan back to the venue's retention limit, so a
//! run of consecutive empty windows trips a circuit breaker and ends the
//! sequence. Ordering across windows is not chronological; callers
//! re-sort.

use std::cmp;
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;

use crate::client::BybitClient;
use crate::error::ExchangeError;
use crate::models::CursorPage;

const DEFAULT_WINDOW_DAYS: i64 = 7;
const DEFAULT_MAX_EMPTY_WINDOWS: u32 = 3;
const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Lazy sequence of record batches, one batch per time window.
pub struct TimeWindows<'a, T> {
    client: &'a BybitClient,
    path: &'static str,
    start_ms: i64,
    next_end_ms: i64,
    window_ms: i64,
    limit: u32,
    empty_run: u32,
    max_empty_windows: u32,
    tripped: bool,
    _marker: PhantomData<T>,
}

impl<'a, T: DeserializeOwned> TimeWindows<'a, T> {
    pub(crate) fn new(
        client: &'a BybitClient,
        path: &'static str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> Self {
        Self {
            client,
            path,
            start_ms: start.timestamp_millis(),
            next_end_ms: end.timestamp_millis(),
            window_ms: DEFAULT_WINDOW_DAYS * MS_PER_DAY,
            limit,
            empty_run: 0,
            max_empty_windows: DEFAULT_MAX_EMPTY_WINDOWS,
            tripped: false,
            _marker: PhantomData,
        }
    }

    /// Overrides the window span (must stay within what the venue permits).
    #[must_use]
    pub fn with_window_days(mut self, days: i64) -> Self {
        self.window_ms = days * MS_PER_DAY;
        self
    }

    /// Overrides the empty-run circuit breaker count.
    #[must_use]
    pub fn with_max_empty_windows(mut self, count: u32) -> Self {
        self.max_empty_windows = count;
        self
    }

    /// Fetches the next (earlier) window, draining its cursor chain.
    ///
    /// Returns `None` once the range is exhausted or the empty-run breaker
    /// has tripped.
    pub async fn next_window(&mut self) -> Result<Option<Vec<T>>, ExchangeError> {
        if self.tripped || self.next_end_ms <= self.start_ms {
            return Ok(None);
        }
        let window_start = cmp::max(self.start_ms, self.next_end_ms - self.window_ms);

        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let mut query = format!(
                "category=option&startTime={}&endTime={}&limit={}",
                window_start, self.next_end_ms, self.limit
            );
            if let Some(c) = &cursor {
                query.push_str(&format!("&cursor={}", urlencoding::encode(c)));
            }
            let page: CursorPage<T> = self
                .client
                .get_signed(self.path, &query)
                .await?
                .ok_or_else(|| {
                    ExchangeError::Decode("missing result for history window".to_string())
                })?;
            records.extend(page.list);
            match page.next_page_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        self.next_end_ms = window_start;
        if records.is_empty() {
            self.empty_run += 1;
            if self.empty_run >= self.max_empty_windows {
                tracing::debug!(
                    path = self.path,
                    empty_windows = self.empty_run,
                    "History scan stopped by empty-window breaker"
                );
                self.tripped = true;
            }
        } else {
            self.empty_run = 0;
        }
        Ok(Some(records))
    }

    /// Drains every remaining window into one unordered batch.
    pub async fn collect_all(mut self) -> Result<Vec<T>, ExchangeError> {
        let mut all = Vec::new();
        while let Some(batch) = self.next_window().await? {
            all.extend(batch);
        }
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use chrono::TimeZone;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> BybitClient {
        BybitClient::new(Credentials::new("k", "s")).with_base_url(server.uri())
    }

    fn envelope(result: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "retCode": 0, "retMsg": "OK", "result": result })
    }

    fn record(order_id: &str) -> serde_json::Value {
        serde_json::json!({ "symbol": "S", "orderId": order_id, "execPrice": "1.0" })
    }

    #[tokio::test]
    async fn partitions_range_into_permitted_windows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "list": [ record("r") ], "nextPageCursor": "" }),
            )))
            .expect(2)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 11, 0, 0, 0).unwrap();
        // 10 days → a 7-day window plus a 3-day remainder.
        let records = client
            .execution_windows(start, end, 50)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn exact_window_span_makes_one_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "list": [ record("r") ] }),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap();
        let records = client
            .execution_windows(start, end, 50)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn drains_cursor_chain_within_a_window() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .and(query_param("cursor", "more"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "list": [ record("b") ], "nextPageCursor": "" }),
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "list": [ record("a") ], "nextPageCursor": "more" }),
            )))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let start = Utc.with_ymd_and_hms(2025, 6, 5, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap();
        let mut windows = client.execution_windows(start, end, 50);
        let batch = windows.next_window().await.unwrap().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(windows.next_window().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_run_breaker_stops_unbounded_scans() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(serde_json::json!({ "list": [] }))),
            )
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        // Over a year of empty history; the breaker caps it at 3 windows.
        let records = client
            .execution_windows(start, end, 50)
            .collect_all()
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn a_hit_resets_the_empty_run() {
        let server = MockServer::start().await;
        // Windows walk backward: two empties, one hit, then empties again.
        let start = Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 10, 0, 0, 0).unwrap();
        let hit_end = end - chrono::Duration::days(14);
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .and(query_param(
                "endTime",
                hit_end.timestamp_millis().to_string(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "list": [ record("hit") ] }),
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v5/execution/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(serde_json::json!({ "list": [] }))),
            )
            .mount(&server)
            .await;

        let client = test_client(&server);
        let records = client
            .execution_windows(start, end, 50)
            .collect_all()
            .await
            .unwrap();
        // Two empty windows, the hit, then three more empties before the
        // breaker trips — the hit must have reset the count.
        assert_eq!(records.len(), 1);

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 6);
    }

    #[tokio::test]
    async fn delivery_windows_share_the_pager() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v5/asset/delivery-record"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "list": [
                    { "symbol": "BTC-7JUN25-114000-P-USDT", "side": "Buy",
                      "deliveryRpl": "1.5", "deliveryTime": "1715000000000" }
                ]}),
            )))
            .mount(&server)
            .await;

        let client = test_client(&server);
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 6, 8, 0, 0, 0).unwrap();
        let records = client
            .delivery_windows(start, end, 50)
            .collect_all()
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].realized_pnl(),
            Some(rust_decimal_macros::dec!(1.5))
        );
    }
}
