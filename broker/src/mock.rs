//! Mock brokerage for testing: implements [`Brokerage`] with scripted fills.
//!
//! Fills are applied to the mock's own positions and cash at the order's
//! limit price, so a follow-up `positions()` call sees the result the way a
//! real account would.
//!
//! ```
//! use tradelink_broker::Brokerage;
//! use tradelink_broker::mock::{FillMode, MockBrokerage};
//!
//! let broker = MockBrokerage::builder()
//!     .fill_mode(FillMode::ImmediateFull)
//!     .with_position("AAPL", 10)
//!     .with_quote("AAPL", 185.00, 185.10)
//!     .with_cash(1_000.00)
//!     .build();
//!
//! assert_eq!(broker.positions("SIM123").unwrap()[0].quantity, 10);
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use rustc_hash::FxHashMap;
use tradelink::{OrderExecutionRecord, OrderLeg, OrderRequest, OrderStatus};

use crate::Brokerage;
use crate::error::BrokerError;
use crate::types::*;

/// How the mock brokerage handles a submitted order group.
#[derive(Clone, Debug, PartialEq)]
pub enum FillMode {
    /// Every order fills completely at its limit price.
    ImmediateFull,
    /// Every order fills the given fraction (floored to whole shares), then
    /// expires with the rest unfilled.
    ImmediatePartial(f64),
    /// Orders are accepted and stay open without any fill.
    Never,
    /// The whole group is rejected at submission.
    Reject,
}

struct State {
    cash: f64,
    positions: Vec<(String, i64)>,
    quotes: FxHashMap<String, Quote>,
    records: Vec<OrderExecutionRecord>,
    submissions: Vec<Vec<OrderRequest>>,
    fill_script: VecDeque<FillMode>,
    next_order_id: u64,
    quote_requests: usize,
    position_requests: usize,
}

/// Builder for [`MockBrokerage`].
pub struct MockBrokerageBuilder {
    account_id: String,
    fill_mode: FillMode,
    fill_script: VecDeque<FillMode>,
    cash: f64,
    positions: Vec<(String, i64)>,
    quotes: FxHashMap<String, Quote>,
}

impl MockBrokerageBuilder {
    pub fn account_id(mut self, account_id: &str) -> Self {
        self.account_id = account_id.to_string();
        self
    }

    /// Fill mode used once the fill script is exhausted.
    pub fn fill_mode(mut self, mode: FillMode) -> Self {
        self.fill_mode = mode;
        self
    }

    /// Fill modes for successive submissions, consumed in order.
    pub fn fill_script(mut self, modes: impl IntoIterator<Item = FillMode>) -> Self {
        self.fill_script = modes.into_iter().collect();
        self
    }

    pub fn with_cash(mut self, cash: f64) -> Self {
        self.cash = cash;
        self
    }

    pub fn with_position(mut self, symbol: &str, quantity: i64) -> Self {
        self.positions.push((symbol.to_string(), quantity));
        self
    }

    pub fn with_quote(mut self, symbol: &str, bid: f64, ask: f64) -> Self {
        self.quotes.insert(symbol.to_string(), quote(symbol, bid, ask));
        self
    }

    pub fn build(self) -> MockBrokerage {
        MockBrokerage {
            account_id: self.account_id,
            fill_mode: self.fill_mode,
            state: Mutex::new(State {
                cash: self.cash,
                positions: self.positions,
                quotes: self.quotes,
                records: Vec::new(),
                submissions: Vec::new(),
                fill_script: self.fill_script,
                next_order_id: 1,
                quote_requests: 0,
                position_requests: 0,
            }),
        }
    }
}

fn quote(symbol: &str, bid: f64, ask: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        bid,
        ask,
        last: (bid + ask) / 2.0,
    }
}

/// In-memory brokerage that records submissions and applies scripted fills.
pub struct MockBrokerage {
    account_id: String,
    fill_mode: FillMode,
    state: Mutex<State>,
}

impl MockBrokerage {
    pub fn builder() -> MockBrokerageBuilder {
        MockBrokerageBuilder {
            account_id: "SIM123".to_string(),
            fill_mode: FillMode::ImmediateFull,
            fill_script: VecDeque::new(),
            cash: 100_000.0,
            positions: Vec::new(),
            quotes: FxHashMap::default(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a test thread panicked mid-update.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_account(&self, account_id: &str) -> Result<(), BrokerError> {
        if account_id == self.account_id {
            Ok(())
        } else {
            Err(BrokerError::UnknownAccount(account_id.to_string()))
        }
    }

    /// Replace or add a quote, e.g. to move the market between iterations.
    pub fn set_quote(&self, symbol: &str, bid: f64, ask: f64) {
        self.state()
            .quotes
            .insert(symbol.to_string(), quote(symbol, bid, ask));
    }

    /// Every submitted order group, in submission order.
    pub fn submissions(&self) -> Vec<Vec<OrderRequest>> {
        self.state().submissions.clone()
    }

    /// Current cash balance.
    pub fn cash(&self) -> f64 {
        self.state().cash
    }

    /// Current quantity held of `symbol`.
    pub fn quantity(&self, symbol: &str) -> i64 {
        self.state()
            .positions
            .iter()
            .find(|(s, _)| s == symbol)
            .map_or(0, |(_, q)| *q)
    }

    /// Number of `quotes()` calls served.
    pub fn quote_requests(&self) -> usize {
        self.state().quote_requests
    }

    /// Number of `positions()` calls served.
    pub fn position_requests(&self) -> usize {
        self.state().position_requests
    }
}

fn apply_fill(state: &mut State, order: &OrderRequest, filled: u64) {
    if filled == 0 {
        return;
    }
    let signed = order.action.sign() * filled as i64;
    state.cash -= signed as f64 * order.limit_price.as_dollars();
    match state.positions.iter_mut().find(|(s, _)| *s == order.symbol) {
        Some((_, qty)) => *qty += signed,
        None => state.positions.push((order.symbol.clone(), signed)),
    }
    state.positions.retain(|(_, q)| *q != 0);
}

impl Brokerage for MockBrokerage {
    fn accounts(&self) -> Result<Vec<AccountInfo>, BrokerError> {
        Ok(vec![AccountInfo {
            account_id: self.account_id.clone(),
            alias: "mock".into(),
            account_type: "Cash".into(),
            status: "Active".into(),
        }])
    }

    fn balance(&self, account_id: &str) -> Result<Balance, BrokerError> {
        self.check_account(account_id)?;
        let state = self.state();
        let market_value: f64 = state
            .positions
            .iter()
            .map(|(s, q)| state.quotes.get(s).map_or(0.0, |qt| qt.midpoint()) * *q as f64)
            .sum();
        Ok(Balance {
            account_id: account_id.to_string(),
            cash_balance: state.cash,
            buying_power: state.cash,
            equity: state.cash + market_value,
            market_value,
        })
    }

    fn positions(&self, account_id: &str) -> Result<Vec<BrokerPosition>, BrokerError> {
        self.check_account(account_id)?;
        let mut state = self.state();
        state.position_requests += 1;
        Ok(state
            .positions
            .iter()
            .map(|(symbol, quantity)| {
                let price = state.quotes.get(symbol).map_or(0.0, |q| q.midpoint());
                BrokerPosition {
                    symbol: symbol.clone(),
                    quantity: *quantity,
                    average_price: price,
                    market_value: price * *quantity as f64,
                    unrealized_pnl: 0.0,
                }
            })
            .collect())
    }

    fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError> {
        let mut state = self.state();
        state.quote_requests += 1;
        symbols
            .iter()
            .map(|s| {
                state.quotes.get(s).cloned().ok_or_else(|| BrokerError::Quote {
                    symbol: s.clone(),
                    message: "unknown symbol".into(),
                })
            })
            .collect()
    }

    fn submit_order_group(
        &self,
        account_id: &str,
        orders: &[OrderRequest],
    ) -> Result<Vec<OrderExecutionRecord>, BrokerError> {
        self.check_account(account_id)?;
        let mut state = self.state();
        state.submissions.push(orders.to_vec());
        let mode = state
            .fill_script
            .pop_front()
            .unwrap_or_else(|| self.fill_mode.clone());
        if mode == FillMode::Reject {
            return Err(BrokerError::Order("mock: order group rejected".into()));
        }

        let mut placed = Vec::with_capacity(orders.len());
        for order in orders {
            let filled = match mode {
                FillMode::ImmediateFull => order.quantity,
                FillMode::ImmediatePartial(frac) => {
                    ((order.quantity as f64 * frac.clamp(0.0, 1.0)).floor() as u64)
                        .min(order.quantity)
                }
                FillMode::Never | FillMode::Reject => 0,
            };
            let status = match mode {
                FillMode::Never => OrderStatus::Open,
                _ if filled == order.quantity => OrderStatus::Filled,
                _ => OrderStatus::Expired,
            };
            apply_fill(&mut state, order, filled);

            let order_id = format!("MOCK-{}", state.next_order_id);
            state.next_order_id += 1;
            state.records.push(OrderExecutionRecord {
                order_id: order_id.clone(),
                status,
                status_description: String::new(),
                legs: vec![OrderLeg {
                    symbol: order.symbol.clone(),
                    action: order.action,
                    quantity_ordered: order.quantity,
                    quantity_filled: filled,
                    quantity_remaining: order.quantity - filled,
                }],
            });
            placed.push(OrderExecutionRecord {
                order_id,
                status: OrderStatus::Received,
                status_description: "mock: order received".into(),
                legs: vec![OrderLeg {
                    symbol: order.symbol.clone(),
                    action: order.action,
                    quantity_ordered: order.quantity,
                    quantity_filled: 0,
                    quantity_remaining: order.quantity,
                }],
            });
        }
        Ok(placed)
    }

    fn order_status(&self, account_id: &str) -> Result<Vec<OrderExecutionRecord>, BrokerError> {
        self.check_account(account_id)?;
        Ok(self.state().records.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradelink::{OrderAction, OrderType, Price, TimeInForce};

    fn order(symbol: &str, action: OrderAction, quantity: u64, limit: i64) -> OrderRequest {
        OrderRequest {
            account_id: "SIM123".into(),
            symbol: symbol.into(),
            action,
            order_type: OrderType::Limit,
            quantity,
            limit_price: Price(limit),
            time_in_force: TimeInForce::Day,
        }
    }

    #[test]
    fn builder_basic() {
        let broker = MockBrokerage::builder()
            .with_position("AAPL", 100)
            .with_quote("AAPL", 149.50, 150.50)
            .with_cash(5_000.0)
            .build();

        let positions = broker.positions("SIM123").unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].quantity, 100);

        let balance = broker.balance("SIM123").unwrap();
        assert_eq!(balance.cash_balance, 5_000.0);
        assert_eq!(balance.equity, 5_000.0 + 15_000.0);
    }

    #[test]
    fn unknown_account() {
        let broker = MockBrokerage::builder().build();
        assert!(matches!(
            broker.positions("OTHER"),
            Err(BrokerError::UnknownAccount(_))
        ));
    }

    #[test]
    fn missing_quote_errors() {
        let broker = MockBrokerage::builder().with_quote("AAPL", 1.0, 2.0).build();
        let err = broker
            .quotes(&["AAPL".to_string(), "ZZZZ".to_string()])
            .unwrap_err();
        assert!(matches!(err, BrokerError::Quote { ref symbol, .. } if symbol == "ZZZZ"));
    }

    #[test]
    fn full_fill_moves_cash_and_positions() {
        let broker = MockBrokerage::builder()
            .with_position("AAPL", 10)
            .with_cash(0.0)
            .build();
        broker
            .submit_order_group(
                "SIM123",
                &[
                    order("AAPL", OrderAction::Sell, 10, 185_00),
                    order("MSFT", OrderAction::Buy, 4, 400_00),
                ],
            )
            .unwrap();

        assert_eq!(broker.quantity("AAPL"), 0);
        assert_eq!(broker.quantity("MSFT"), 4);
        assert!((broker.cash() - 250.0).abs() < 1e-9);

        let records = broker.order_status("SIM123").unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == OrderStatus::Filled));
    }

    #[test]
    fn partial_then_full_script() {
        let broker = MockBrokerage::builder()
            .fill_script([FillMode::ImmediatePartial(0.6)])
            .fill_mode(FillMode::ImmediateFull)
            .build();

        broker
            .submit_order_group("SIM123", &[order("MSFT", OrderAction::Buy, 100, 10_00)])
            .unwrap();
        assert_eq!(broker.quantity("MSFT"), 60);
        let first = broker.order_status("SIM123").unwrap();
        assert_eq!(first[0].status, OrderStatus::Expired);
        assert_eq!(first[0].legs[0].unfilled(), 40);

        broker
            .submit_order_group("SIM123", &[order("MSFT", OrderAction::Buy, 40, 10_00)])
            .unwrap();
        assert_eq!(broker.quantity("MSFT"), 100);
        assert_eq!(broker.submissions().len(), 2);
    }

    #[test]
    fn reject_mode() {
        let broker = MockBrokerage::builder().fill_mode(FillMode::Reject).build();
        let result =
            broker.submit_order_group("SIM123", &[order("MSFT", OrderAction::Buy, 1, 1_00)]);
        assert!(result.is_err());
        assert_eq!(broker.submissions().len(), 1);
        assert!(broker.order_status("SIM123").unwrap().is_empty());
    }

    #[test]
    fn never_fill_stays_open() {
        let broker = MockBrokerage::builder().fill_mode(FillMode::Never).build();
        broker
            .submit_order_group("SIM123", &[order("MSFT", OrderAction::Buy, 5, 1_00)])
            .unwrap();
        let records = broker.order_status("SIM123").unwrap();
        assert_eq!(records[0].status, OrderStatus::Open);
        assert!(!records[0].is_settled());
        assert_eq!(broker.quantity("MSFT"), 0);
    }
}
