//! Export reconciled trade history to CSV.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use opt_trade_core::EngineConfig;
use opt_trade_bybit::{BybitClient, DeliveryRecord};
use opt_trade_trader::{reconcile, report_offset, ReconciledTrade};

const PAGE_LIMIT: u32 = 100;

pub async fn export(
    client: &BybitClient,
    cfg: &EngineConfig,
    days: i64,
    all: bool,
    deliveries: bool,
    output: &Path,
) -> Result<()> {
    let end = Utc::now();
    let start = if all {
        // Scan back until the empty-window breaker trips.
        DateTime::UNIX_EPOCH
    } else {
        end - Duration::days(days)
    };
    let offset = report_offset(cfg.tz_offset_minutes);

    if deliveries {
        let records = client
            .delivery_windows(start, end, PAGE_LIMIT)
            .with_window_days(cfg.window_days)
            .with_max_empty_windows(cfg.max_empty_windows)
            .collect_all()
            .await?;
        if records.is_empty() {
            println!("No delivery records found.");
            return Ok(());
        }
        write_delivery_csv(output, &records, offset)?;
        println!("Saved {} deliveries to {}", records.len(), output.display());
        return Ok(());
    }

    let rows = client
        .execution_windows(start, end, PAGE_LIMIT)
        .with_window_days(cfg.window_days)
        .with_max_empty_windows(cfg.max_empty_windows)
        .collect_all()
        .await?;
    if rows.is_empty() {
        println!("No recent trades found.");
        return Ok(());
    }

    let balance = client
        .wallet_balance("USDT")
        .await
        .context("fetching wallet balance for reconciliation")?;
    let reconciled = reconcile(rows, balance, offset);
    write_trades_csv(output, &reconciled)?;
    println!("Saved {} trades to {}", reconciled.len(), output.display());
    Ok(())
}

fn write_trades_csv(output: &Path, rows: &[ReconciledTrade]) -> Result<()> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("creating {}", output.display()))?;
    writer.write_record([
        "symbol", "side", "orderType", "execPrice", "execQty", "execValue", "execFee",
        "execTime", "netFee", "netPnl", "localTime", "balance",
    ])?;
    for trade in rows {
        let r = &trade.record;
        writer.write_record([
            r.symbol.clone(),
            r.side().map(|s| s.to_string()).unwrap_or_default(),
            r.order_type.clone().unwrap_or_default(),
            opt_dec(r.price()),
            opt_dec(r.qty()),
            r.value().to_string(),
            r.fee().to_string(),
            r.exec_time_ms().map(|t| t.to_string()).unwrap_or_default(),
            trade.net_fee.to_string(),
            trade.net_pnl.to_string(),
            trade.local_time.clone(),
            trade.balance.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_delivery_csv(
    output: &Path,
    records: &[DeliveryRecord],
    offset: chrono::FixedOffset,
) -> Result<()> {
    let mut writer = csv::Writer::from_path(output)
        .with_context(|| format!("creating {}", output.display()))?;
    writer.write_record([
        "symbol", "side", "deliveryPrice", "realizedPnl", "deliveryTime", "localTime",
    ])?;
    for record in records {
        let local_time = record
            .delivery_time_ms()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(|dt| dt.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        writer.write_record([
            record.symbol.clone(),
            record.side().map(|s| s.to_string()).unwrap_or_default(),
            opt_dec(record.delivery_price()),
            opt_dec(record.realized_pnl()),
            record
                .delivery_time_ms()
                .map(|t| t.to_string())
                .unwrap_or_default(),
            local_time,
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn opt_dec(value: Option<Decimal>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
