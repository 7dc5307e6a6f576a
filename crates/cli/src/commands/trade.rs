//! Place the configured trade and print the report.

use anyhow::Result;

use opt_trade_core::{EngineConfig, TradeConfig};
use opt_trade_bybit::BybitClient;
use opt_trade_trader::{run_trade, TickCache};

pub async fn run(
    client: &BybitClient,
    ticks: &TickCache,
    trade_cfg: &TradeConfig,
    engine_cfg: &EngineConfig,
) -> Result<()> {
    let report = run_trade(client, ticks, trade_cfg, engine_cfg).await?;

    println!("Timestamp: {}", report.timestamp.format("%Y-%m-%d %H:%M:%S"));
    println!("Balance: {:.4} USDT", report.balance);
    if report.aborted_low_balance {
        println!("Insufficient balance => abort");
        return Ok(());
    }

    let price_desc = trade_cfg
        .limit_price
        .map_or_else(|| "Market".to_string(), |p| p.to_string());
    println!(
        "Placing {} {} {} @ {}",
        report.side, report.quantity, report.symbol, price_desc
    );

    if let Some(outcome) = &report.outcome {
        println!("Trade log: {}", outcome.audit_path.display());
        match (&outcome.entry_price, &outcome.exit_order_id) {
            (Some(entry), Some(exit_id)) => {
                println!("Entry price: {entry}");
                println!("Exit order placed: {exit_id}");
            }
            _ => println!("Order not filled; no exit order placed"),
        }
    }

    if !report.exposures.is_empty() {
        println!();
        println!("Greek Exposures:");
        println!(
            "{:<8} {:>16} {:>10} {:>16}",
            "Greek", "Per-Contract", "Qty", "Exposure"
        );
        for row in &report.exposures {
            println!(
                "{:<8} {:>16.8} {:>10} {:>16.8}",
                row.greek, row.per_contract, report.quantity, row.exposure
            );
        }
    }

    Ok(())
}
