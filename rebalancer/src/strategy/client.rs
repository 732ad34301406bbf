//! PV-API REST client.

use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use zeroize::Zeroizing;

use super::types::{RebalanceRequest, RebalanceResponse, StrategySecurity};
use super::{StrategyEngine, StrategyError};

/// Blocking PV-API client. Authenticates with the `X-Pv-Api` header.
pub struct PvApiClient {
    client: Client,
    api_key: Zeroizing<String>,
    base_url: String,
}

impl PvApiClient {
    pub fn new(
        api_key: Zeroizing<String>,
        base_url: &str,
        timeout: Duration,
    ) -> Result<Self, StrategyError> {
        if api_key.is_empty() {
            return Err(StrategyError::Auth("empty API key".into()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StrategyError::Connection(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

/// Path segment for a security query: `/` must survive as `%2F`.
pub fn encode_query(query: &str) -> String {
    query.replace('/', "%2F")
}

impl StrategyEngine for PvApiClient {
    fn resolve_security(&self, query: &str) -> Result<StrategySecurity, StrategyError> {
        let path = format!("/v1/security/{}/", encode_query(query));
        debug!("PV-API security lookup: {query}");
        let resp = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("X-Pv-Api", self.api_key.as_str())
            .send()
            .map_err(|e| StrategyError::Connection(format!("{path} failed: {e}")))?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(StrategyError::NotFound(query.to_string()));
        }
        let security: StrategySecurity = decode(&path, resp)?;
        if security.composite_figi.is_empty() {
            return Err(StrategyError::NotFound(query.to_string()));
        }
        Ok(security)
    }

    fn rebalance(
        &self,
        portfolio_id: &str,
        request: &RebalanceRequest,
    ) -> Result<RebalanceResponse, StrategyError> {
        let path = format!("/v1/portfolio/{portfolio_id}/rebalance");
        debug!(
            "PV-API rebalance: portfolio={portfolio_id} allocation_only={} positions={} prices={}",
            request.allocation_only,
            request.positions.len(),
            request.price_data.len()
        );
        let resp = self
            .client
            .post(format!("{}{path}", self.base_url))
            .header("X-Pv-Api", self.api_key.as_str())
            .json(request)
            .send()
            .map_err(|e| StrategyError::Connection(format!("{path} failed: {e}")))?;
        decode(&path, resp)
    }
}

fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T, StrategyError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StrategyError::Auth(format!("{path} rejected the API key")));
    }
    if !status.is_success() {
        let body = resp.text().unwrap_or_default();
        return Err(StrategyError::Http {
            endpoint: path.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    resp.json::<T>().map_err(|e| StrategyError::Decode {
        what: path.to_string(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_separator_is_escaped() {
        assert_eq!(encode_query("BRK/B"), "BRK%2FB");
        assert_eq!(encode_query("AAPL"), "AAPL");
    }

    #[test]
    fn rejects_empty_key() {
        let result = PvApiClient::new(
            Zeroizing::new(String::new()),
            "https://api.pennyvault.com",
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(StrategyError::Auth(_))));
    }
}
