//! Console tables.
//!
//! Each table is rendered to a `String` so it can be printed or inspected.

use std::fmt::Write;

use tradelink::{OrderExecutionRecord, OrderRequest, Price, Remainder};
use tradelink_broker::{AccountInfo, Balance, BrokerPosition, Quote};

/// Proposed orders and the projected cash left after them.
pub fn orders_table(orders: &[OrderRequest], projected_cash: Price) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>3}  {:6} {:8} {:>8} {:>12} {:>14}",
        "#", "Action", "Symbol", "Shares", "Limit", "Expected Cost"
    );
    for (i, o) in orders.iter().enumerate() {
        let _ = writeln!(
            out,
            "  {:>3}  {:6} {:8} {:>8} {:>12} {:>14}",
            i + 1,
            o.action.to_string(),
            o.symbol,
            o.quantity,
            o.limit_price.to_string(),
            o.notional().to_string(),
        );
    }
    let _ = writeln!(out, "\nCash Left: {projected_cash}");
    out
}

/// Fill state of submitted orders, one row per leg.
pub fn fills_table(records: &[OrderExecutionRecord]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:>5}  {:8} {:6} {:>12} {:14} {:>8} {:>10}",
        "#", "Symbol", "Action", "Order ID", "Status", "Filled", "Remaining"
    );
    for (i, r) in records.iter().enumerate() {
        if r.legs.is_empty() {
            let _ = writeln!(
                out,
                "  {:>5}  {:8} {:6} {:>12} {:14} {:>8} {:>10}",
                format!("{}.0", i + 1),
                "-",
                "-",
                r.order_id,
                r.status.to_string(),
                "-",
                "-"
            );
        }
        for (j, leg) in r.legs.iter().enumerate() {
            let _ = writeln!(
                out,
                "  {:>5}  {:8} {:6} {:>12} {:14} {:>8} {:>10}",
                format!("{}.{}", i + 1, j),
                leg.symbol,
                leg.action.to_string(),
                r.order_id,
                r.status.to_string(),
                leg.quantity_filled,
                leg.unfilled(),
            );
        }
    }
    out
}

/// Unfilled quantity per symbol after the last iteration.
pub fn remainders_table(remainders: &[Remainder]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:8} {:6} {:>8} {:>8} {:>10}",
        "Symbol", "Action", "Ordered", "Filled", "Unfilled"
    );
    for r in remainders.iter().filter(|r| r.unfilled() > 0) {
        let _ = writeln!(
            out,
            "  {:8} {:6} {:>8} {:>8} {:>10}",
            r.symbol,
            r.action.to_string(),
            r.ordered,
            r.filled,
            r.unfilled()
        );
    }
    out
}

pub fn accounts_table(accounts: &[AccountInfo]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:14} {:14} {:10} {:10}",
        "Account", "Alias", "Type", "Status"
    );
    for a in accounts {
        let _ = writeln!(
            out,
            "  {:14} {:14} {:10} {:10}",
            a.account_id, a.alias, a.account_type, a.status
        );
    }
    out
}

pub fn balance_table(balance: &Balance) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "  Account:      {}", balance.account_id);
    let _ = writeln!(out, "  Cash:         ${:.2}", balance.cash_balance);
    let _ = writeln!(out, "  Buying power: ${:.2}", balance.buying_power);
    let _ = writeln!(out, "  Market value: ${:.2}", balance.market_value);
    let _ = writeln!(out, "  Equity:       ${:.2}", balance.equity);
    out
}

pub fn positions_table(positions: &[BrokerPosition]) -> String {
    if positions.is_empty() {
        return "No positions.\n".into();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:8} {:>8} {:>12} {:>14} {:>12}",
        "Symbol", "Qty", "Avg Price", "Market Value", "Unrl P&L"
    );
    for p in positions {
        let _ = writeln!(
            out,
            "  {:8} {:>8} {:>12.2} {:>14.2} {:>12.2}",
            p.symbol, p.quantity, p.average_price, p.market_value, p.unrealized_pnl
        );
    }
    out
}

pub fn quotes_table(quotes: &[Quote]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:8} {:>10} {:>10} {:>10} {:>10}",
        "Symbol", "Bid", "Ask", "Last", "Mid"
    );
    for q in quotes {
        let _ = writeln!(
            out,
            "  {:8} {:>10.2} {:>10.2} {:>10.2} {:>10.3}",
            q.symbol,
            q.bid,
            q.ask,
            q.last,
            q.midpoint()
        );
    }
    out
}
