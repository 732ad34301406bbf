// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Sizing and fill scenarios end to end through the public API.

use tradelink::{
    CashLedger, OrderAction, OrderExecutionRecord, OrderLeg, OrderStatus, Price, SecurityId,
    Transaction, TransactionKind, all_filled, build_orders, net_fills, remainders,
};

fn trx(figi: &str, symbol: &str, kind: TransactionKind, shares: f64, price: f64) -> Transaction {
    Transaction {
        security: SecurityId::new(figi),
        broker_symbol: symbol.into(),
        kind,
        shares,
        price,
    }
}

// ============================================================================
// Sizing
// ============================================================================

#[test]
fn sell_all_aapl_buy_msft() {
    let aapl_ref = 185.125;
    let plan = vec![
        trx("BBG000B9XRY4", "AAPL", TransactionKind::Sell, 10.0, aapl_ref),
        trx("BBG000BPH459", "MSFT", TransactionKind::Buy, 100.0, 10.0),
    ];

    let mut ledger = CashLedger::from_dollars(1000.0);
    let orders = build_orders("11111111", &plan, &mut ledger);

    assert_eq!(orders.len(), 2);

    assert_eq!(orders[0].symbol, "AAPL");
    assert_eq!(orders[0].action, OrderAction::Sell);
    assert_eq!(orders[0].quantity, 10);
    assert_eq!(orders[0].limit_price, Price(185_13));

    assert_eq!(orders[1].symbol, "MSFT");
    assert_eq!(orders[1].action, OrderAction::Buy);
    assert_eq!(orders[1].quantity, 100);
    assert_eq!(orders[1].limit_price, Price(10_00));

    // 1000 − 100 × 10.00 + 10 × 185.13
    assert_eq!(ledger.balance(), Price(1851_30));
}

#[test]
fn empty_plan_builds_nothing() {
    let mut ledger = CashLedger::from_dollars(1000.0);
    assert!(build_orders("ACC", &[], &mut ledger).is_empty());
    assert_eq!(ledger.balance(), Price(1000_00));
}

#[test]
fn rounding_boundaries() {
    let cases = [(0.0, 0), (0.999, 0), (1.5, 1), (1.999, 1)];
    for (shares, expected) in cases {
        let mut ledger = CashLedger::new(Price::ZERO);
        let buy = build_orders(
            "ACC",
            &[trx("F", "X", TransactionKind::Buy, shares, 1.0)],
            &mut ledger,
        );
        let sell = build_orders(
            "ACC",
            &[trx("F", "X", TransactionKind::Sell, shares, 1.0)],
            &mut ledger,
        );
        assert_eq!(buy[0].quantity, expected);
        assert_eq!(sell[0].quantity, expected);
    }
}

// ============================================================================
// Remainders
// ============================================================================

#[test]
fn partial_fill_remainder() {
    let records = vec![OrderExecutionRecord {
        order_id: "924243071".into(),
        status: OrderStatus::Expired,
        status_description: "Expired".into(),
        legs: vec![OrderLeg {
            symbol: "MSFT".into(),
            action: OrderAction::Buy,
            quantity_ordered: 100,
            quantity_filled: 60,
            quantity_remaining: 40,
        }],
    }];

    let rem = remainders(&records);
    assert!(!all_filled(&rem));
    assert_eq!(rem[0].unfilled(), 40);
    assert_eq!(net_fills(&records)["MSFT"], 60);
}

#[test]
fn unobserved_order_counts_as_unfilled() {
    let mut ledger = CashLedger::new(Price::ZERO);
    let orders = build_orders(
        "ACC",
        &[trx("F", "MSFT", TransactionKind::Buy, 25.0, 10.0)],
        &mut ledger,
    );
    let record = OrderExecutionRecord::unobserved("42", &orders[0]);

    assert!(!record.is_settled());
    let rem = remainders(&[record]);
    assert_eq!(rem[0].unfilled(), 25);
}
