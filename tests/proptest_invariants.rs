// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! Property-based tests for sizing and price-coverage invariants.

use proptest::prelude::*;
use tradelink::{
    CashLedger, OrderAction, Price, PriceSnapshot, SecurityId, Transaction, TransactionKind,
    build_orders,
};

fn kind_strategy() -> impl Strategy<Value = TransactionKind> {
    prop_oneof![Just(TransactionKind::Buy), Just(TransactionKind::Sell)]
}

/// A priced transaction on one of a small set of securities.
fn transaction_strategy() -> impl Strategy<Value = Transaction> {
    (0usize..8, kind_strategy(), 0.0f64..10_000.0, 0.01f64..5_000.0).prop_map(
        |(n, kind, shares, price)| Transaction {
            security: SecurityId::new(format!("FIGI{n}")),
            broker_symbol: format!("SYM{n}"),
            kind,
            shares,
            price,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Order quantity is always floor(shares), in both directions.
    #[test]
    fn quantity_is_floor(trxs in prop::collection::vec(transaction_strategy(), 0..20)) {
        let mut ledger = CashLedger::new(Price::ZERO);
        let orders = build_orders("ACC", &trxs, &mut ledger);

        prop_assert_eq!(orders.len(), trxs.len());
        for (order, trx) in orders.iter().zip(&trxs) {
            prop_assert_eq!(order.quantity, trx.shares.floor() as u64);
            prop_assert!(order.quantity as f64 <= trx.shares);
        }
    }

    /// Ledger moves by exactly the signed notional of the orders.
    #[test]
    fn ledger_tracks_signed_notional(
        cash in 0i64..10_000_000_00,
        trxs in prop::collection::vec(transaction_strategy(), 0..20),
    ) {
        let mut ledger = CashLedger::new(Price(cash));
        let orders = build_orders("ACC", &trxs, &mut ledger);

        let delta: i64 = orders
            .iter()
            .map(|o| match o.action {
                OrderAction::Buy => -o.notional().0,
                OrderAction::Sell => o.notional().0,
            })
            .sum();
        prop_assert_eq!(ledger.balance(), Price(cash + delta));
    }

    /// Coverage fails closed exactly when some referenced security is unpriced.
    #[test]
    fn coverage_fails_closed(
        referenced in prop::collection::btree_set(0usize..12, 0..12),
        priced in prop::collection::btree_set(0usize..12, 0..12),
    ) {
        let mut snapshot = PriceSnapshot::new();
        for n in &priced {
            snapshot
                .insert(SecurityId::new(format!("FIGI{n}")), "SYM", 10.0)
                .unwrap();
        }
        let ids: Vec<SecurityId> = referenced
            .iter()
            .map(|n| SecurityId::new(format!("FIGI{n}")))
            .collect();

        let covered = referenced.is_subset(&priced);
        prop_assert_eq!(snapshot.ensure_covers(ids.iter()).is_ok(), covered);
    }
}
