//! Batch profit-target placement.
//!
//! Sweeps every open long position and hangs a reduce-only limit sell at
//! a multiple of its average entry. One bad instrument must not abort the
//! sweep, so per-position failures are logged and skipped.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use opt_trade_bybit::{BybitClient, OrderRequest, Side};

use crate::ticks::TickCache;

/// Places profit targets on all long positions. Returns how many orders
/// were placed.
pub async fn set_profit_targets(
    client: &BybitClient,
    ticks: &TickCache,
    multiple: Decimal,
) -> Result<u32> {
    let positions = client
        .positions(None)
        .await
        .context("fetching positions")?;
    let mut placed = 0;
    for pos in positions {
        if pos.side() != Some(Side::Buy) {
            debug!(symbol = %pos.symbol, "Skipping non-long position");
            continue;
        }
        let qty = pos.size();
        if qty.is_zero() {
            continue;
        }
        let Some(avg_price) = pos.avg_price() else {
            warn!(symbol = %pos.symbol, "Position reports no average price; skipping");
            continue;
        };
        match place_target(client, ticks, &pos.symbol, qty, avg_price * multiple).await {
            Ok(order_id) => {
                info!(symbol = %pos.symbol, order_id, "Profit target placed");
                placed += 1;
            }
            Err(e) => {
                warn!(symbol = %pos.symbol, error = %e, "Failed to place profit target; continuing");
            }
        }
    }
    Ok(placed)
}

async fn place_target(
    client: &BybitClient,
    ticks: &TickCache,
    symbol: &str,
    qty: Decimal,
    raw_target: Decimal,
) -> Result<String> {
    let price = ticks.round_price(client, symbol, raw_target).await?;
    let ack = client
        .create_order(
            &OrderRequest::limit(symbol.to_string(), Side::Sell, qty, price)
                .with_reduce_only(true),
        )
        .await?;
    Ok(ack.order_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opt_trade_bybit::Credentials;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> BybitClient {
        BybitClient::new(Credentials::new("k", "s")).with_base_url(server.uri())
    }

    fn envelope(result: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "retCode": 0, "retMsg": "OK", "result": result })
    }

    async fn mount_positions(server: &MockServer, list: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/v5/position/list"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(envelope(serde_json::json!({ "list": list }))),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn places_reduce_only_sell_at_the_multiple() {
        let server = MockServer::start().await;
        mount_positions(
            &server,
            serde_json::json!([
                { "symbol": "BTC-TEST", "side": "Buy", "size": "1", "avgPrice": "0.5" }
            ]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/v5/order/create"))
            .and(body_string_contains("\"side\":\"Sell\""))
            .and(body_string_contains("\"price\":\"1.5\""))
            .and(body_string_contains("\"reduceOnly\":true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "orderId": "t1", "orderLinkId": "l" }),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let ticks = TickCache::new();
        ticks.seed("BTC-TEST", dec!(0.05));
        let placed = set_profit_targets(&client, &ticks, dec!(3)).await.unwrap();
        assert_eq!(placed, 1);
    }

    #[tokio::test]
    async fn skips_short_positions() {
        let server = MockServer::start().await;
        mount_positions(
            &server,
            serde_json::json!([
                { "symbol": "BTC-TEST", "side": "Sell", "size": "1", "avgPrice": "0.5" }
            ]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/v5/order/create"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "orderId": "t1", "orderLinkId": "l" }),
            )))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let ticks = TickCache::new();
        ticks.seed("BTC-TEST", dec!(0.05));
        let placed = set_profit_targets(&client, &ticks, dec!(3)).await.unwrap();
        assert_eq!(placed, 0);
    }

    #[tokio::test]
    async fn continues_after_one_instrument_fails() {
        let server = MockServer::start().await;
        mount_positions(
            &server,
            serde_json::json!([
                { "symbol": "BTC-FAIL", "side": "Buy", "size": "1", "avgPrice": "0.5" },
                { "symbol": "BTC-OK", "side": "Buy", "size": "1", "avgPrice": "0.5" }
            ]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/v5/order/create"))
            .and(body_string_contains("BTC-FAIL"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "retCode": 10001, "retMsg": "boom", "result": {}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v5/order/create"))
            .and(body_string_contains("BTC-OK"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(
                serde_json::json!({ "orderId": "ok-1", "orderLinkId": "l" }),
            )))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let ticks = TickCache::new();
        ticks.seed("BTC-FAIL", dec!(0.05));
        ticks.seed("BTC-OK", dec!(0.05));
        let placed = set_profit_targets(&client, &ticks, dec!(3)).await.unwrap();
        assert_eq!(placed, 1);
    }

    #[tokio::test]
    async fn flat_positions_are_ignored() {
        let server = MockServer::start().await;
        mount_positions(
            &server,
            serde_json::json!([
                { "symbol": "BTC-FLAT", "side": "None", "size": "0", "avgPrice": "" }
            ]),
        )
        .await;

        let client = test_client(&server);
        let ticks = TickCache::new();
        let placed = set_profit_targets(&client, &ticks, dec!(3)).await.unwrap();
        assert_eq!(placed, 0);
    }
}
