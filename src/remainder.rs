//! Unfilled remainders and fill summaries computed from execution records.

use rustc_hash::FxHashMap;

use crate::order::{OrderAction, OrderExecutionRecord, OrderLeg, OrderRequest, OrderStatus};

/// Unfilled quantity of one security/direction after monitoring.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Remainder {
    pub symbol: String,
    pub action: OrderAction,
    pub ordered: u64,
    pub filled: u64,
}

impl Remainder {
    pub fn unfilled(&self) -> u64 {
        self.ordered.saturating_sub(self.filled)
    }
}

/// Aggregate legs by (symbol, action), preserving first-seen order.
pub fn remainders(records: &[OrderExecutionRecord]) -> Vec<Remainder> {
    let mut out: Vec<Remainder> = Vec::new();
    let mut index: FxHashMap<(String, OrderAction), usize> = FxHashMap::default();

    for leg in records.iter().flat_map(|r| r.legs.iter()) {
        let key = (leg.symbol.clone(), leg.action);
        match index.get(&key) {
            Some(&i) => {
                out[i].ordered += leg.quantity_ordered;
                out[i].filled += leg.quantity_filled;
            }
            None => {
                index.insert(key, out.len());
                out.push(Remainder {
                    symbol: leg.symbol.clone(),
                    action: leg.action,
                    ordered: leg.quantity_ordered,
                    filled: leg.quantity_filled,
                });
            }
        }
    }
    out
}

/// True when every leg filled completely.
pub fn all_filled(remainders: &[Remainder]) -> bool {
    remainders.iter().all(|r| r.unfilled() == 0)
}

/// Signed filled quantity per symbol (+ bought, − sold).
pub fn net_fills(records: &[OrderExecutionRecord]) -> FxHashMap<String, i64> {
    let mut net: FxHashMap<String, i64> = FxHashMap::default();
    for leg in records.iter().flat_map(|r| r.legs.iter()) {
        *net.entry(leg.symbol.clone()).or_insert(0) +=
            leg.action.sign() * leg.quantity_filled as i64;
    }
    net
}

impl OrderExecutionRecord {
    /// Stand-in for a submitted order the broker has not reported on:
    /// nothing filled, status unknown.
    pub fn unobserved(order_id: &str, request: &OrderRequest) -> Self {
        Self {
            order_id: order_id.to_string(),
            status: OrderStatus::Other("UNREPORTED".into()),
            status_description: "not reported by broker".into(),
            legs: vec![OrderLeg {
                symbol: request.symbol.clone(),
                action: request.action,
                quantity_ordered: request.quantity,
                quantity_filled: 0,
                quantity_remaining: request.quantity,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, status: &str, legs: Vec<OrderLeg>) -> OrderExecutionRecord {
        OrderExecutionRecord {
            order_id: id.into(),
            status: OrderStatus::from_code(status),
            status_description: String::new(),
            legs,
        }
    }

    fn leg(symbol: &str, action: OrderAction, ordered: u64, filled: u64) -> OrderLeg {
        OrderLeg {
            symbol: symbol.into(),
            action,
            quantity_ordered: ordered,
            quantity_filled: filled,
            quantity_remaining: ordered - filled,
        }
    }

    #[test]
    fn partial_buy_leaves_remainder() {
        let records = vec![record("1", "FLP", vec![leg("MSFT", OrderAction::Buy, 100, 60)])];
        let rem = remainders(&records);
        assert_eq!(rem.len(), 1);
        assert_eq!(rem[0].unfilled(), 40);
        assert!(!all_filled(&rem));
    }

    #[test]
    fn full_fills_converge() {
        let records = vec![
            record("1", "FLL", vec![leg("MSFT", OrderAction::Buy, 100, 100)]),
            record("2", "FLL", vec![leg("AAPL", OrderAction::Sell, 10, 10)]),
        ];
        assert!(all_filled(&remainders(&records)));
    }

    #[test]
    fn aggregates_same_symbol_and_side() {
        let records = vec![
            record("1", "FLP", vec![leg("MSFT", OrderAction::Buy, 50, 20)]),
            record("2", "FLP", vec![leg("MSFT", OrderAction::Buy, 50, 50)]),
            record("3", "FLL", vec![leg("MSFT", OrderAction::Sell, 5, 5)]),
        ];
        let rem = remainders(&records);
        assert_eq!(rem.len(), 2);
        assert_eq!(rem[0].ordered, 100);
        assert_eq!(rem[0].unfilled(), 30);
    }

    #[test]
    fn net_fills_signed() {
        let records = vec![
            record("1", "FLL", vec![leg("MSFT", OrderAction::Buy, 100, 60)]),
            record("2", "FLL", vec![leg("AAPL", OrderAction::Sell, 10, 10)]),
        ];
        let net = net_fills(&records);
        assert_eq!(net["MSFT"], 60);
        assert_eq!(net["AAPL"], -10);
    }

    #[test]
    fn no_legs_is_converged() {
        assert!(all_filled(&remainders(&[])));
    }
}
