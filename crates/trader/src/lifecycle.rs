//! Order lifecycle driver.
//!
//! One entry order at a time: place it, wait for the venue to report
//! fills, infer the realized entry price, then hang a reduce-only
//! profit-target exit off it. Orders do not fill synchronously and the
//! venue sometimes omits prices, so the driver polls with a bounded
//! timeout and derives the entry price from the first source that has
//! one. A timeout with no fill is a valid outcome, not an error — the
//! exit leg is simply skipped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use opt_trade_core::EngineConfig;
use opt_trade_bybit::{BybitClient, ExecutionRecord, OrderDetail, OrderRequest, Side};

use crate::ticks::TickCache;

const EXEC_FETCH_LIMIT: u32 = 20;

/// Polled view of exchange-owned order state. The driver only ever reads
/// through this seam, which keeps it testable against a fake.
#[async_trait]
pub trait OrderStates {
    async fn executions_for(&self, symbol: &str, order_id: &str) -> Result<Vec<ExecutionRecord>>;
    async fn order_status(&self, symbol: &str, order_id: &str) -> Result<Option<OrderDetail>>;
}

#[async_trait]
impl OrderStates for BybitClient {
    async fn executions_for(&self, symbol: &str, order_id: &str) -> Result<Vec<ExecutionRecord>> {
        Ok(self.executions(symbol, order_id, EXEC_FETCH_LIMIT).await?)
    }

    async fn order_status(&self, symbol: &str, order_id: &str) -> Result<Option<OrderDetail>> {
        Ok(self.order_detail(symbol, order_id).await?)
    }
}

/// An entry order to drive through its fill lifecycle.
#[derive(Debug, Clone)]
pub struct EntryOrder {
    pub symbol: String,
    pub side: Side,
    pub qty: Decimal,
    /// Limit price; `None` goes in as a market order.
    pub limit_price: Option<Decimal>,
    pub time_in_force: String,
}

/// What happened to one entry attempt.
#[derive(Debug)]
pub struct TradeOutcome {
    pub order_id: String,
    pub executions: Vec<ExecutionRecord>,
    /// Realized entry price, when one could be derived.
    pub entry_price: Option<Decimal>,
    /// Exit order id, when the exit leg was placed.
    pub exit_order_id: Option<String>,
    /// Audit artifact for this attempt.
    pub audit_path: PathBuf,
}

/// Polls until executions appear for the order or `timeout` elapses.
///
/// Alternates between the execution list and the order status: a status
/// of Filled/PartiallyFilled triggers one more execution fetch, since the
/// two endpoints converge at different speeds. Returns the records found,
/// or empty on timeout.
pub async fn await_fill<S>(
    states: &S,
    symbol: &str,
    order_id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<Vec<ExecutionRecord>>
where
    S: OrderStates + Sync + ?Sized,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        let trades = states.executions_for(symbol, order_id).await?;
        if !trades.is_empty() {
            return Ok(trades);
        }
        if let Some(detail) = states.order_status(symbol, order_id).await? {
            if detail.order_status.has_fills() {
                let trades = states.executions_for(symbol, order_id).await?;
                if !trades.is_empty() {
                    return Ok(trades);
                }
            }
        }
        sleep(poll_interval).await;
    }
    Ok(Vec::new())
}

/// Places an entry order, tracks it to fill (or timeout), persists the
/// audit artifact, and places the profit-target exit when an entry price
/// could be realized.
pub async fn place_and_track(
    client: &BybitClient,
    ticks: &TickCache,
    entry: &EntryOrder,
    cfg: &EngineConfig,
) -> Result<TradeOutcome> {
    let limit_price = match entry.limit_price {
        Some(p) => Some(ticks.round_price(client, &entry.symbol, p).await?),
        None => None,
    };

    let request = OrderRequest {
        symbol: entry.symbol.clone(),
        side: entry.side,
        qty: entry.qty,
        price: limit_price,
        time_in_force: entry.time_in_force.clone(),
        reduce_only: false,
    };
    let ack = client
        .create_order(&request)
        .await
        .context("placing entry order")?;

    // Fast checks catch immediate fills before the longer poll loop.
    let mut executions = Vec::new();
    for _ in 0..cfg.fast_retries {
        sleep(Duration::from_secs(cfg.fast_retry_delay_secs)).await;
        executions = client
            .executions(&entry.symbol, &ack.order_id, EXEC_FETCH_LIMIT)
            .await?;
        if !executions.is_empty() {
            break;
        }
    }
    if executions.is_empty() {
        executions = await_fill(
            client,
            &entry.symbol,
            &ack.order_id,
            Duration::from_secs(cfg.fill_timeout_secs),
            Duration::from_secs(cfg.poll_interval_secs),
        )
        .await?;
    }

    // The realtime detail doubles as a price fallback source.
    let order = client.order_detail(&entry.symbol, &ack.order_id).await?;
    let audit_path = write_audit_log(&cfg.audit_dir, &ack.order_id, &executions, order.as_ref())?;
    info!(path = %audit_path.display(), "Trade log saved");

    if executions.is_empty() {
        info!(order_id = %ack.order_id, "Order not filled; skipping exit order");
        return Ok(TradeOutcome {
            order_id: ack.order_id,
            executions,
            entry_price: None,
            exit_order_id: None,
            audit_path,
        });
    }

    // Entry price precedence: the submitted limit, the execution matching
    // our side, the order's average fill, the order's quoted price.
    let entry_price = limit_price
        .or_else(|| {
            executions
                .iter()
                .find(|t| t.side() == Some(entry.side))
                .and_then(|t| t.price())
        })
        .or_else(|| order.as_ref().and_then(|o| o.avg_price()))
        .or_else(|| order.as_ref().and_then(|o| o.price()));
    let Some(entry_price) = entry_price else {
        warn!(order_id = %ack.order_id, "No entry trade to infer price; skipping exit order");
        return Ok(TradeOutcome {
            order_id: ack.order_id,
            executions,
            entry_price: None,
            exit_order_id: None,
            audit_path,
        });
    };

    let target = ticks
        .round_price(client, &entry.symbol, entry_price * cfg.profit_multiple)
        .await?;
    let exit = OrderRequest::limit(entry.symbol.clone(), entry.side.opposite(), entry.qty, target)
        .with_time_in_force(entry.time_in_force.clone())
        .with_reduce_only(true);
    let exit_ack = client
        .create_order(&exit)
        .await
        .context("placing exit order")?;

    Ok(TradeOutcome {
        order_id: ack.order_id,
        executions,
        entry_price: Some(entry_price),
        exit_order_id: Some(exit_ack.order_id),
        audit_path,
    })
}

/// Cancels every open order, then market-closes each open position.
/// Per-position failures are logged and do not stop the sweep.
pub async fn cancel_all_and_close(client: &BybitClient) -> Result<u32> {
    client.cancel_all_orders().await?;
    let mut closed = 0;
    for pos in client.positions(None).await? {
        let qty = pos.size();
        if qty.is_zero() {
            continue;
        }
        let Some(side) = pos.side() else { continue };
        match client.close_position(&pos.symbol, side.opposite(), qty).await {
            Ok(_) => closed += 1,
            Err(e) => warn!(symbol = %pos.symbol, error = %e, "Failed to close position"),
        }
    }
    Ok(closed)
}

#[derive(Serialize)]
struct AuditRecord<'a> {
    executions: &'a [ExecutionRecord],
    order: Option<&'a OrderDetail>,
}

/// One durable artifact per entry attempt: the raw execution list plus the
/// realtime order detail, named from a UTC timestamp.
fn write_audit_log(
    dir: &Path,
    order_id: &str,
    executions: &[ExecutionRecord],
    order: Option<&OrderDetail>,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating audit directory {}", dir.display()))?;
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("trade_log_{stamp}_{order_id}.json"));
    let body = serde_json::to_string_pretty(&AuditRecord { executions, order })
        .context("serializing audit record")?;
    std::fs::write(&path, body)
        .with_context(|| format!("writing audit log {}", path.display()))?;
    Ok(path)
}
