//! TradeStation brokerage implementation.

pub mod client;
pub mod types;

use std::time::Duration;

use log::{debug, warn};
use zeroize::Zeroizing;

use tradelink::{OrderExecutionRecord, OrderLeg, OrderRequest, OrderStatus};

use crate::Brokerage;
use crate::error::BrokerError;
use crate::types::*;
use client::TradeStationClient;
use types::{OrderGroupRequest, TsOrderRequest, check_errors};

pub use client::{LIVE_BASE_URL, SIM_BASE_URL};

/// Maximum symbols per quote request.
pub const DEFAULT_QUOTE_BATCH: usize = 100;

/// Upper bound on order-listing pages followed in one call.
const MAX_ORDER_PAGES: usize = 50;

/// TradeStation brokerage implementing [`Brokerage`].
pub struct TradeStationBroker {
    client: TradeStationClient,
    quote_batch: usize,
}

impl TradeStationBroker {
    /// Create a broker against the simulator or the live API.
    pub fn new(
        access_token: Zeroizing<String>,
        simulation: bool,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        let base_url = if simulation { SIM_BASE_URL } else { LIVE_BASE_URL };
        Self::with_base_url(access_token, base_url, timeout)
    }

    /// Create a broker against an explicit base URL.
    pub fn with_base_url(
        access_token: Zeroizing<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        Ok(Self {
            client: TradeStationClient::new(access_token, base_url, timeout)?,
            quote_batch: DEFAULT_QUOTE_BATCH,
        })
    }

    /// Set the number of symbols per quote request (minimum 1).
    pub fn with_quote_batch(mut self, batch: usize) -> Self {
        self.quote_batch = batch.max(1);
        self
    }
}

impl Brokerage for TradeStationBroker {
    fn accounts(&self) -> Result<Vec<AccountInfo>, BrokerError> {
        let resp = self.client.accounts()?;
        Ok(resp.accounts.into_iter().map(AccountInfo::from).collect())
    }

    fn balance(&self, account_id: &str) -> Result<Balance, BrokerError> {
        let resp = self.client.balances(account_id)?;
        check_errors(&resp.errors)?;
        resp.balances
            .iter()
            .find(|b| b.account_id == account_id)
            .or_else(|| resp.balances.first())
            .ok_or_else(|| BrokerError::UnknownAccount(account_id.to_string()))?
            .to_balance()
    }

    fn positions(&self, account_id: &str) -> Result<Vec<BrokerPosition>, BrokerError> {
        let resp = self.client.positions(account_id)?;
        check_errors(&resp.errors)?;
        resp.positions.iter().map(|p| p.to_position()).collect()
    }

    fn quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError> {
        let mut quotes = Vec::with_capacity(symbols.len());
        for chunk in symbols.chunks(self.quote_batch) {
            let resp = self.client.quotes(chunk)?;
            if let Some(err) = resp.errors.first() {
                return Err(BrokerError::Quote {
                    symbol: err.symbol.clone(),
                    message: err.error.clone(),
                });
            }
            for q in &resp.quotes {
                quotes.push(q.to_quote()?);
            }
        }
        debug!("Fetched {} quotes for {} symbols", quotes.len(), symbols.len());
        Ok(quotes)
    }

    fn submit_order_group(
        &self,
        account_id: &str,
        orders: &[OrderRequest],
    ) -> Result<Vec<OrderExecutionRecord>, BrokerError> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(o) = orders.iter().find(|o| o.account_id != account_id) {
            return Err(BrokerError::Order(format!(
                "order for {} targets account {} instead of {account_id}",
                o.symbol, o.account_id
            )));
        }

        let group = OrderGroupRequest {
            orders: orders.iter().map(TsOrderRequest::from).collect(),
            group_type: "NORMAL",
        };
        let resp = self.client.place_order_group(&group)?;
        if !resp.errors.is_empty() {
            let placed = resp.orders.len();
            let detail = resp
                .errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(BrokerError::Order(format!(
                "{placed} of {} orders placed; rejected: {detail}",
                orders.len()
            )));
        }
        if resp.orders.len() != orders.len() {
            warn!(
                "Order group returned {} orders for {} requests",
                resp.orders.len(),
                orders.len()
            );
        }

        // Placement responses carry only IDs; legs come from the request.
        Ok(resp
            .orders
            .iter()
            .zip(orders)
            .map(|(placed, req)| OrderExecutionRecord {
                order_id: placed.order_id.clone(),
                status: OrderStatus::Received,
                status_description: placed.message.clone(),
                legs: vec![OrderLeg {
                    symbol: req.symbol.clone(),
                    action: req.action,
                    quantity_ordered: req.quantity,
                    quantity_filled: 0,
                    quantity_remaining: req.quantity,
                }],
            })
            .collect())
    }

    fn order_status(&self, account_id: &str) -> Result<Vec<OrderExecutionRecord>, BrokerError> {
        let mut records = Vec::new();
        let mut next_token: Option<String> = None;
        for _ in 0..MAX_ORDER_PAGES {
            let resp = self.client.orders_page(account_id, next_token.as_deref())?;
            check_errors(&resp.errors)?;
            for order in &resp.orders {
                records.push(order.to_record()?);
            }
            match resp.next_token {
                Some(token) if !token.is_empty() => next_token = Some(token),
                _ => return Ok(records),
            }
        }
        warn!("Order listing exceeded {MAX_ORDER_PAGES} pages; returning partial results");
        Ok(records)
    }
}
