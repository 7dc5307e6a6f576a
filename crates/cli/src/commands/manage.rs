//! Order and position management commands.

use anyhow::Result;
use rust_decimal::Decimal;

use opt_trade_bybit::BybitClient;
use opt_trade_trader::{cancel_all_and_close, set_profit_targets, TickCache};

pub async fn show(client: &BybitClient) -> Result<()> {
    let orders = client.open_orders(None).await?;
    let positions = client.positions(None).await?;

    println!("Open Orders:");
    if orders.is_empty() {
        println!("  None");
    }
    for order in &orders {
        println!("{}", serde_json::to_string_pretty(order)?);
    }

    println!();
    println!("Open Positions:");
    if positions.is_empty() {
        println!("  None");
    }
    for position in &positions {
        println!("{}", serde_json::to_string_pretty(position)?);
    }
    Ok(())
}

pub async fn cancel_all(client: &BybitClient) -> Result<()> {
    let closed = cancel_all_and_close(client).await?;
    println!("All orders cancelled; {closed} position(s) closed.");
    Ok(())
}

pub async fn amend(
    client: &BybitClient,
    order_id: &str,
    price: Option<Decimal>,
    qty: Option<Decimal>,
) -> Result<()> {
    client.amend_order(order_id, price, qty).await?;
    println!("Order amended.");
    Ok(())
}

pub async fn profit_targets(
    client: &BybitClient,
    ticks: &TickCache,
    multiple: Decimal,
) -> Result<()> {
    let placed = set_profit_targets(client, ticks, multiple).await?;
    println!("Placed {placed} profit-target order(s) at {multiple}x entry.");
    Ok(())
}
