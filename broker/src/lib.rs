//! Brokerage trait and implementations for tradelink.
//!
//! Provides a `Brokerage` trait that abstracts over the order-execution API.
//! Implementations:
//!
//! - **TradeStation** (feature `tradestation`, default): REST v3 over blocking reqwest
//! - **Mock**: in-memory brokerage with scripted fills, for tests

pub mod error;
pub mod mock;
pub mod types;

#[cfg(feature = "tradestation")]
pub mod tradestation;

pub use error::BrokerError;
pub use types::*;

use tradelink::{OrderExecutionRecord, OrderRequest};

/// A brokerage that can report holdings and quotes and execute order groups.
///
/// All methods are blocking. Implementations must be `Sync`; pricing may
/// fan out over threads.
pub trait Brokerage: Sync {
    /// Accounts visible to the current credentials.
    fn accounts(&self) -> Result<Vec<AccountInfo>, BrokerError>;

    /// Current balances of `account_id`.
    fn balance(&self, account_id: &str) -> Result<Balance, BrokerError>;

    /// Current positions of `account_id`.
    fn positions(&self, account_id: &str) -> Result<Vec<BrokerPosition>, BrokerError>;

    /// Quotes for `symbols`. A per-symbol error fails the whole call.
    fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError>;

    /// Submit `orders` as one order group. Returns one record per placed order,
    /// in request order.
    fn submit_order_group(
        &self,
        account_id: &str,
        orders: &[OrderRequest],
    ) -> Result<Vec<OrderExecutionRecord>, BrokerError>;

    /// Today's orders of `account_id` with their current fill state.
    fn order_status(&self, account_id: &str) -> Result<Vec<OrderExecutionRecord>, BrokerError>;

    /// Cash balance of `account_id`.
    fn cash_balance(&self, account_id: &str) -> Result<f64, BrokerError> {
        self.balance(account_id).map(|b| b.cash_balance)
    }
}
