// Allow our dollar.cents digit grouping convention (e.g., 100_00 = $100.00)
#![allow(clippy::inconsistent_digit_grouping)]

//! # tradelink
//!
//! Core types for keeping a brokerage account in line with an allocation plan
//! computed by an external strategy engine.
//!
//! The crate holds the pieces of one planning pass that do not touch the
//! network:
//!
//! - **Identities**: [`SecurityId`] (strategy-engine identifier) vs. broker symbols
//! - **Prices**: [`PriceSnapshot`] of bid/ask midpoints, failing closed on gaps
//! - **Plans**: [`AllocationTarget`] and [`Transaction`]s from the engine
//! - **Sizing**: [`build_orders`] turns transactions into whole-share limit orders
//! - **Fills**: [`remainders`] of what the broker left unfilled
//!
//! ## Quick Start
//!
//! ```
//! use tradelink::{build_orders, CashLedger, Price, SecurityId, Transaction, TransactionKind};
//!
//! let plan = vec![Transaction {
//!     security: SecurityId::new("BBG000BPH459"),
//!     broker_symbol: "MSFT".into(),
//!     kind: TransactionKind::Buy,
//!     shares: 100.6,
//!     price: 10.0,
//! }];
//!
//! let mut ledger = CashLedger::new(Price(1000_00));
//! let orders = build_orders("11111111", &plan, &mut ledger);
//!
//! assert_eq!(orders[0].quantity, 100); // truncated to whole shares
//! assert_eq!(orders[0].limit_price, Price(10_00));
//! assert_eq!(ledger.balance(), Price(0));
//! ```
//!
//! ## Price Representation
//!
//! Reference prices from quotes stay in dollars (`f64`) because the strategy
//! engine consumes them that way. Anything sent to the broker, and the cash
//! ledger, is in integer cents:
//!
//! ```
//! use tradelink::Price;
//!
//! assert_eq!(Price::from_dollars(185.125), Some(Price(185_13)));
//! assert_eq!(format!("{}", Price(100_50)), "$100.50");
//! ```

pub mod allocation;
pub mod error;
pub mod order;
pub mod position;
pub mod remainder;
pub mod sizing;
pub mod snapshot;
pub mod transaction;
pub mod types;

pub use allocation::AllocationTarget;
pub use error::PlanError;
pub use order::{
    OrderAction, OrderExecutionRecord, OrderLeg, OrderRequest, OrderStatus, OrderType, TimeInForce,
};
pub use position::{Position, held_quantity};
pub use remainder::{Remainder, all_filled, net_fills, remainders};
pub use sizing::{CashLedger, build_orders, whole_shares};
pub use snapshot::{PriceSnapshot, midpoint};
pub use transaction::{Transaction, TransactionKind};
pub use types::{CASH_ID, Price, SecurityId};
