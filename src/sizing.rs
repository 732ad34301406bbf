//! Order sizing: transactions → whole-share limit orders, with cash bookkeeping.
//!
//! The ledger is display-only. The strategy engine saw the live cash balance
//! as a synthetic position, so its plan is trusted to fit; sizing never drops
//! or shrinks an order because the ledger goes negative.

use crate::order::{OrderAction, OrderRequest, OrderType, TimeInForce};
use crate::transaction::{Transaction, TransactionKind};
use crate::types::Price;

/// Running cash projection for one sizing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashLedger {
    balance: Price,
}

impl CashLedger {
    pub fn new(opening: Price) -> Self {
        Self { balance: opening }
    }

    /// Seed from a broker-reported dollar balance (non-finite → zero).
    pub fn from_dollars(cash: f64) -> Self {
        Self::new(Price::from_dollars(cash).unwrap_or(Price::ZERO))
    }

    pub fn apply(&mut self, order: &OrderRequest) {
        let notional = order.notional();
        self.balance = match order.action {
            OrderAction::Buy => self.balance - notional,
            OrderAction::Sell => self.balance + notional,
        };
    }

    /// Projected cash after every order applied so far.
    pub fn balance(&self) -> Price {
        self.balance
    }
}

/// Whole shares for a fractional request: `floor(shares)`, never negative.
pub fn whole_shares(shares: f64) -> u64 {
    if shares.is_finite() && shares > 0.0 {
        shares.floor() as u64
    } else {
        0
    }
}

/// Build one limit order per transaction.
///
/// The limit is the transaction's reference price rounded to the cent; it is a
/// bound, not a fill guarantee. Zero-share orders are still returned so the
/// caller can see them.
pub fn build_orders(
    account_id: &str,
    transactions: &[Transaction],
    ledger: &mut CashLedger,
) -> Vec<OrderRequest> {
    transactions
        .iter()
        .map(|trx| {
            let order = OrderRequest {
                account_id: account_id.to_string(),
                symbol: trx.broker_symbol.clone(),
                action: match trx.kind {
                    TransactionKind::Buy => OrderAction::Buy,
                    TransactionKind::Sell => OrderAction::Sell,
                },
                order_type: OrderType::Limit,
                quantity: whole_shares(trx.shares),
                limit_price: Price::from_dollars(trx.price).unwrap_or(Price::ZERO),
                time_in_force: TimeInForce::Day,
            };
            ledger.apply(&order);
            order
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecurityId;

    fn trx(symbol: &str, kind: TransactionKind, shares: f64, price: f64) -> Transaction {
        Transaction {
            security: SecurityId::new(format!("FIGI-{symbol}")),
            broker_symbol: symbol.to_string(),
            kind,
            shares,
            price,
        }
    }

    #[test]
    fn floors_fractional_shares() {
        for (shares, expected) in [(0.0, 0), (0.999, 0), (1.5, 1), (1.999, 1)] {
            for kind in [TransactionKind::Buy, TransactionKind::Sell] {
                let mut ledger = CashLedger::new(Price::ZERO);
                let orders = build_orders("ACC", &[trx("X", kind, shares, 10.0)], &mut ledger);
                assert_eq!(orders[0].quantity, expected, "{kind} {shares}");
            }
        }
    }

    #[test]
    fn order_shape() {
        let mut ledger = CashLedger::new(Price(1000_00));
        let orders = build_orders(
            "11111111",
            &[trx("MSFT", TransactionKind::Buy, 100.0, 10.0)],
            &mut ledger,
        );
        let o = &orders[0];
        assert_eq!(o.account_id, "11111111");
        assert_eq!(o.symbol, "MSFT");
        assert_eq!(o.action, OrderAction::Buy);
        assert_eq!(o.order_type, OrderType::Limit);
        assert_eq!(o.time_in_force, TimeInForce::Day);
        assert_eq!(o.limit_price, Price(10_00));
        assert_eq!(ledger.balance(), Price::ZERO);
    }

    #[test]
    fn limit_rounds_to_cent() {
        let mut ledger = CashLedger::new(Price::ZERO);
        let orders = build_orders(
            "ACC",
            &[trx("AAPL", TransactionKind::Sell, 3.0, 185.125)],
            &mut ledger,
        );
        assert_eq!(orders[0].limit_price, Price(185_13));
        assert_eq!(ledger.balance(), Price(555_39));
    }

    #[test]
    fn ledger_never_gates() {
        let mut ledger = CashLedger::new(Price(50_00));
        let orders = build_orders(
            "ACC",
            &[trx("MSFT", TransactionKind::Buy, 10.0, 10.0)],
            &mut ledger,
        );
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].quantity, 10);
        assert_eq!(ledger.balance(), Price(-50_00));
    }

    #[test]
    fn negative_or_nan_shares_size_to_zero() {
        assert_eq!(whole_shares(-3.0), 0);
        assert_eq!(whole_shares(f64::NAN), 0);
        assert_eq!(whole_shares(f64::INFINITY), 0);
    }
}
