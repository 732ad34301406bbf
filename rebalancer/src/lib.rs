//! tradelink-rebalancer: keeps a TradeStation account in sync with a PV-API
//! strategy allocation.
//!
//! Each sync resolves the account's holdings to strategy identifiers, prices
//! them together with the target allocation, asks the strategy engine for a
//! transaction plan, sizes it into whole-share limit orders, and submits them
//! after confirmation. Fills are monitored and any unfilled remainder is
//! re-planned until the account converges or the retry budget runs out.

pub mod audit;
pub mod config;
pub mod confirm;
pub mod error;
pub mod execution;
pub mod identity;
pub mod monitor;
pub mod planner;
pub mod pricing;
pub mod report;
pub mod strategy;
