//! Trade-history reconciliation.
//!
//! The venue reports executions but no per-trade account balance, so the
//! balance column is reconstructed backward from the currently observed
//! wallet balance: sort chronologically, derive each row's net P&L, set
//! the implied starting balance to `current − Σpnl`, then walk forward.
//! By construction the final row's balance equals the observed wallet
//! balance.

use chrono::{FixedOffset, Offset, TimeZone, Utc};
use rust_decimal::Decimal;

use opt_trade_bybit::{ExecutionRecord, Side};

/// An execution enriched with derived fee, P&L, localized time, and the
/// running account balance.
#[derive(Debug, Clone)]
pub struct ReconciledTrade {
    pub record: ExecutionRecord,
    pub net_fee: Decimal,
    pub net_pnl: Decimal,
    pub local_time: String,
    pub balance: Decimal,
}

/// Fixed report offset from minutes east of UTC.
#[must_use]
pub fn report_offset(minutes: i32) -> FixedOffset {
    FixedOffset::east_opt(minutes * 60).unwrap_or_else(|| Utc.fix())
}

/// Reconciles raw execution rows against the current wallet balance.
///
/// Requires the full row set up front — no single row's balance is known
/// until every row's P&L is.
#[must_use]
pub fn reconcile(
    mut rows: Vec<ExecutionRecord>,
    current_balance: Decimal,
    offset: FixedOffset,
) -> Vec<ReconciledTrade> {
    rows.sort_by_key(|r| r.exec_time_ms().unwrap_or(0));

    let enriched: Vec<(ExecutionRecord, Decimal, Decimal, String)> = rows
        .into_iter()
        .map(|record| {
            let net_fee = record.fee();
            let net_pnl = record.reported_pnl().unwrap_or_else(|| {
                // No reported P&L on this row: estimate from the traded
                // value (credit for sells, debit for buys) minus the fee.
                let sign = match record.side() {
                    Some(Side::Sell) => Decimal::ONE,
                    _ => -Decimal::ONE,
                };
                sign * record.value() - net_fee
            });
            let local_time = record
                .exec_time_ms()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(|dt| {
                    dt.with_timezone(&offset)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                })
                .unwrap_or_default();
            (record, net_fee, net_pnl, local_time)
        })
        .collect();

    let total_pnl: Decimal = enriched.iter().map(|(_, _, pnl, _)| *pnl).sum();
    let mut balance = current_balance - total_pnl;

    enriched
        .into_iter()
        .map(|(record, net_fee, net_pnl, local_time)| {
            balance += net_pnl;
            ReconciledTrade {
                record,
                net_fee,
                net_pnl,
                local_time,
                balance,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(value: serde_json::Value) -> ExecutionRecord {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn single_row_anchors_to_the_wallet_balance() {
        let rows = vec![record(serde_json::json!({
            "symbol": "S",
            "execTime": "1715000000000",
            "execFee": "0.1",
            "closedPnl": "0.2"
        }))];
        let out = reconcile(rows, dec!(100.0), report_offset(600));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].net_fee, dec!(0.1));
        assert_eq!(out[0].net_pnl, dec!(0.2));
        assert_eq!(out[0].balance, dec!(100.0));
        // 2024-05-06 12:53:20 UTC shifted ten hours east.
        assert_eq!(out[0].local_time, "2024-05-06 22:53:20");
    }

    #[test]
    fn derives_pnl_from_value_and_fee_when_unreported() {
        let sell = record(serde_json::json!({
            "symbol": "S", "side": "Sell", "execValue": "10", "execFee": "0.5"
        }));
        let buy = record(serde_json::json!({
            "symbol": "S", "side": "Buy", "execValue": "10", "execFee": "0.5"
        }));
        let out = reconcile(vec![sell, buy], dec!(0), report_offset(0));
        assert_eq!(out[0].net_pnl, dec!(9.5));
        assert_eq!(out[1].net_pnl, dec!(-10.5));
    }

    #[test]
    fn unparseable_fee_counts_as_zero() {
        let rows = vec![record(serde_json::json!({
            "symbol": "S", "execFee": "??", "closedPnl": "1"
        }))];
        let out = reconcile(rows, dec!(5), report_offset(0));
        assert_eq!(out[0].net_fee, dec!(0));
        assert_eq!(out[0].balance, dec!(5));
    }

    #[test]
    fn sorts_rows_and_walks_the_balance_forward() {
        // Supplied newest-first; reconciliation must re-sort.
        let newer = record(serde_json::json!({
            "symbol": "S", "execTime": "2000", "closedPnl": "2"
        }));
        let older = record(serde_json::json!({
            "symbol": "S", "execTime": "1000", "closedPnl": "1"
        }));
        let out = reconcile(vec![newer, older], dec!(100), report_offset(0));
        assert_eq!(out[0].record.exec_time_ms(), Some(1000));
        assert_eq!(out[0].balance, dec!(98));
        assert_eq!(out[1].balance, dec!(100));
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(reconcile(Vec::new(), dec!(50), report_offset(0)).is_empty());
    }
}
