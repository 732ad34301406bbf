//! TradeStation v3 REST client.

use std::time::Duration;

use log::debug;
use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use super::types::{
    AccountsResponse, BalancesResponse, OrderGroupRequest, OrdersResponse, PositionsResponse,
    QuotesResponse,
};
use crate::error::BrokerError;

pub const SIM_BASE_URL: &str = "https://sim-api.tradestation.com/v3";
pub const LIVE_BASE_URL: &str = "https://api.tradestation.com/v3";

/// Blocking TradeStation REST client authenticated with a bearer token.
pub struct TradeStationClient {
    client: Client,
    access_token: Zeroizing<String>,
    base_url: String,
}

impl TradeStationClient {
    /// Create a client against `base_url` (see [`SIM_BASE_URL`], [`LIVE_BASE_URL`]).
    pub fn new(
        access_token: Zeroizing<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, BrokerError> {
        if access_token.is_empty() {
            return Err(BrokerError::Auth("empty access token".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BrokerError::Connection(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            access_token,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /brokerage/accounts
    pub fn accounts(&self) -> Result<AccountsResponse, BrokerError> {
        self.get("/brokerage/accounts")
    }

    /// GET /brokerage/accounts/{id}/balances
    pub fn balances(&self, account_id: &str) -> Result<BalancesResponse, BrokerError> {
        self.get(&format!("/brokerage/accounts/{account_id}/balances"))
    }

    /// GET /brokerage/accounts/{id}/positions
    pub fn positions(&self, account_id: &str) -> Result<PositionsResponse, BrokerError> {
        self.get(&format!("/brokerage/accounts/{account_id}/positions"))
    }

    /// GET /marketdata/quotes/{symbols}
    pub fn quotes(&self, symbols: &[String]) -> Result<QuotesResponse, BrokerError> {
        self.get(&format!("/marketdata/quotes/{}", symbols.join(",")))
    }

    /// POST /orderexecution/ordergroups
    pub fn place_order_group(
        &self,
        group: &OrderGroupRequest,
    ) -> Result<OrdersResponse, BrokerError> {
        let path = "/orderexecution/ordergroups";
        debug!("Submitting TradeStation order group: {} orders", group.orders.len());
        let req = self.client.post(self.url(path)).json(group);
        self.send(path, req)
    }

    /// GET /brokerage/accounts/{id}/orders, one page.
    pub fn orders_page(
        &self,
        account_id: &str,
        next_token: Option<&str>,
    ) -> Result<OrdersResponse, BrokerError> {
        let path = format!("/brokerage/accounts/{account_id}/orders");
        let mut req = self.client.get(self.url(&path));
        if let Some(token) = next_token {
            req = req.query(&[("nextToken", token)]);
        }
        self.send(&path, req)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let req = self.client.get(self.url(path));
        self.send(path, req)
    }

    fn send<T: DeserializeOwned>(&self, path: &str, req: RequestBuilder) -> Result<T, BrokerError> {
        debug!("TradeStation request: {path}");
        let resp = req
            .bearer_auth(self.access_token.as_str())
            .send()
            .map_err(|e| BrokerError::Connection(format!("{path} failed: {e}")))?;
        decode(path, resp)
    }
}

fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, BrokerError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(BrokerError::Auth(format!(
            "{path} rejected the access token"
        )));
    }
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(BrokerError::Http {
            endpoint: path.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    resp.json::<T>().map_err(|e| BrokerError::Decode {
        what: path.to_string(),
        detail: e.to_string(),
    })
}
