//! PV-API request/response types.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Entry of the strategy engine's security directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct StrategySecurity {
    #[serde(rename = "compositeFigi")]
    pub composite_figi: String,
    pub ticker: String,
}

/// Holding as the strategy engine sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PvPosition {
    #[serde(rename = "CompositeFIGI")]
    pub composite_figi: String,
    pub ticker: String,
    pub shares: f64,
}

/// Body of `POST /v1/portfolio/{id}/rebalance`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RebalanceRequest {
    pub allocation_only: bool,
    pub positions: Vec<PvPosition>,
    pub precision: u32,
    /// Composite FIGI → reference price.
    pub price_data: BTreeMap<String, f64>,
}

impl RebalanceRequest {
    /// Ask only for the target allocation: no positions, no prices.
    pub fn allocation_only() -> Self {
        Self {
            allocation_only: true,
            positions: Vec::new(),
            precision: 0,
            price_data: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PvAllocation {
    pub date: String,
    /// Composite FIGI → weight.
    pub members: FxHashMap<String, f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PvTransaction {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "CompositeFIGI")]
    pub composite_figi: String,
    pub kind: String,
    pub price_per_share: f64,
    pub shares: f64,
    pub ticker: String,
    pub total_value: f64,
    pub memo: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RebalanceResponse {
    pub allocation: Option<PvAllocation>,
    pub next_trade_date: String,
    pub transactions: Vec<PvTransaction>,
}

impl RebalanceResponse {
    /// Next scheduled trade date, if the engine reported a parseable one.
    pub fn next_trade_date(&self) -> Option<NaiveDate> {
        parse_date(&self.next_trade_date)
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.date_naive());
    }
    NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_names() {
        let mut req = RebalanceRequest::allocation_only();
        req.allocation_only = false;
        req.positions.push(PvPosition {
            composite_figi: "$CASH".into(),
            ticker: "$CASH".into(),
            shares: 1250.5,
        });
        req.price_data.insert("BBG000B9XRY4".into(), 185.1);

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["AllocationOnly"], false);
        assert_eq!(json["Precision"], 0);
        assert_eq!(json["Positions"][0]["CompositeFIGI"], "$CASH");
        assert_eq!(json["Positions"][0]["Shares"], 1250.5);
        assert_eq!(json["PriceData"]["BBG000B9XRY4"], 185.1);
    }

    #[test]
    fn parse_rebalance_response() {
        let json = r#"{
            "Allocation": { "Date": "2024-01-02", "Members": { "BBG000BPH459": 0.6, "$CASH": 0.4 } },
            "NextTradeDate": "2024-02-01T00:00:00Z",
            "Transactions": [
                { "CompositeFIGI": "BBG000BPH459", "Kind": "BUY", "PricePerShare": 400.2,
                  "Shares": 10.4, "Ticker": "MSFT", "TotalValue": 4162.08, "Cleared": false }
            ]
        }"#;
        let resp: RebalanceResponse = serde_json::from_str(json).unwrap();
        let alloc = resp.allocation.as_ref().unwrap();
        assert_eq!(alloc.members.len(), 2);
        assert_eq!(resp.transactions[0].kind, "BUY");
        assert_eq!(
            resp.next_trade_date(),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
    }

    #[test]
    fn parse_security() {
        let sec: StrategySecurity =
            serde_json::from_str(r#"{"compositeFigi":"BBG000DWG505","ticker":"BRK/B"}"#).unwrap();
        assert_eq!(sec.ticker, "BRK/B");
    }

    #[test]
    fn dates() {
        assert_eq!(parse_date("2024-03-01"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("soon"), None);
    }
}
