//! Scripted strategy engine for tests.
//!
//! Holds a security directory and a target share count per security. Each
//! rebalance request is answered with the buys and sells that move the
//! request's positions to the targets, priced from the request's price data.
//!
//! ```
//! use tradelink_rebalancer::strategy::mock::ScriptedEngine;
//! use tradelink_rebalancer::strategy::{RebalanceRequest, StrategyEngine};
//!
//! let engine = ScriptedEngine::new()
//!     .with_security("MSFT", "BBG000BPH459")
//!     .with_target("BBG000BPH459", 0.5, 10.0);
//!
//! let plan = engine.rebalance("p-1", &RebalanceRequest::allocation_only()).unwrap();
//! assert_eq!(plan.allocation.unwrap().members.len(), 1);
//! assert!(plan.transactions.is_empty());
//! ```

use std::sync::{Mutex, MutexGuard};

use rustc_hash::FxHashMap;

use super::types::{PvAllocation, PvTransaction, RebalanceRequest, RebalanceResponse};
use super::{StrategyEngine, StrategyError, StrategySecurity};

type Planner = Box<dyn Fn(&RebalanceRequest) -> Vec<PvTransaction> + Send + Sync>;

pub struct ScriptedEngine {
    /// Query (ticker or FIGI) → security.
    directory: FxHashMap<String, StrategySecurity>,
    /// FIGI → (weight, target shares), in insertion order.
    targets: Vec<(String, f64, f64)>,
    planner: Option<Planner>,
    next_trade_date: String,
    fail_rebalance: bool,
    requests: Mutex<Vec<RebalanceRequest>>,
    lookups: Mutex<Vec<String>>,
}

impl Default for ScriptedEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            directory: FxHashMap::default(),
            targets: Vec::new(),
            planner: None,
            next_trade_date: String::new(),
            fail_rebalance: false,
            requests: Mutex::new(Vec::new()),
            lookups: Mutex::new(Vec::new()),
        }
    }

    /// Register a security under its ticker (strategy `/` form) and FIGI.
    pub fn with_security(mut self, ticker: &str, figi: &str) -> Self {
        let security = StrategySecurity {
            composite_figi: figi.to_string(),
            ticker: ticker.to_string(),
        };
        self.directory.insert(ticker.to_string(), security.clone());
        self.directory.insert(figi.to_string(), security);
        self
    }

    /// Hold `shares` of `figi` at allocation weight `weight`.
    pub fn with_target(mut self, figi: &str, weight: f64, shares: f64) -> Self {
        self.targets.push((figi.to_string(), weight, shares));
        self
    }

    /// Replace the target-seeking planner.
    pub fn with_planner(
        mut self,
        planner: impl Fn(&RebalanceRequest) -> Vec<PvTransaction> + Send + Sync + 'static,
    ) -> Self {
        self.planner = Some(Box::new(planner));
        self
    }

    pub fn with_next_trade_date(mut self, date: &str) -> Self {
        self.next_trade_date = date.to_string();
        self
    }

    /// Make every rebalance request fail.
    pub fn failing(mut self) -> Self {
        self.fail_rebalance = true;
        self
    }

    /// Every rebalance request received.
    pub fn requests(&self) -> Vec<RebalanceRequest> {
        guard(&self.requests).clone()
    }

    /// Every security query received.
    pub fn lookups(&self) -> Vec<String> {
        guard(&self.lookups).clone()
    }

    fn ticker_of(&self, figi: &str) -> String {
        self.directory
            .get(figi)
            .map_or_else(|| figi.to_string(), |s| s.ticker.clone())
    }

    fn seek_targets(&self, request: &RebalanceRequest) -> Vec<PvTransaction> {
        let mut held: FxHashMap<&str, f64> = FxHashMap::default();
        for p in &request.positions {
            if p.composite_figi != tradelink::CASH_ID {
                *held.entry(p.composite_figi.as_str()).or_default() += p.shares;
            }
        }

        let mut wanted: Vec<(String, f64)> = self
            .targets
            .iter()
            .map(|(figi, _, shares)| (figi.clone(), *shares))
            .collect();
        for p in &request.positions {
            let figi = &p.composite_figi;
            if figi != tradelink::CASH_ID && !wanted.iter().any(|(f, _)| f == figi) {
                wanted.push((figi.clone(), 0.0));
            }
        }

        // Sells first, as the engine orders them.
        let mut sells = Vec::new();
        let mut buys = Vec::new();
        for (figi, target) in wanted {
            let delta = target - held.get(figi.as_str()).copied().unwrap_or(0.0);
            if delta.abs() < 1e-9 {
                continue;
            }
            let price = request.price_data.get(&figi).copied().unwrap_or(0.0);
            let tx = PvTransaction {
                composite_figi: figi.clone(),
                kind: if delta > 0.0 { "BUY" } else { "SELL" }.into(),
                price_per_share: price,
                shares: delta.abs(),
                ticker: self.ticker_of(&figi),
                total_value: price * delta.abs(),
                ..Default::default()
            };
            if delta > 0.0 {
                buys.push(tx);
            } else {
                sells.push(tx);
            }
        }
        sells.extend(buys);
        sells
    }
}

impl StrategyEngine for ScriptedEngine {
    fn resolve_security(&self, query: &str) -> Result<StrategySecurity, StrategyError> {
        guard(&self.lookups).push(query.to_string());
        self.directory
            .get(query)
            .cloned()
            .ok_or_else(|| StrategyError::NotFound(query.to_string()))
    }

    fn rebalance(
        &self,
        portfolio_id: &str,
        request: &RebalanceRequest,
    ) -> Result<RebalanceResponse, StrategyError> {
        guard(&self.requests).push(request.clone());
        if self.fail_rebalance {
            return Err(StrategyError::Http {
                endpoint: format!("/v1/portfolio/{portfolio_id}/rebalance"),
                status: 500,
                body: "scripted failure".into(),
            });
        }
        let members = self
            .targets
            .iter()
            .map(|(figi, weight, _)| (figi.clone(), *weight))
            .collect();
        let transactions = if request.allocation_only {
            Vec::new()
        } else {
            match &self.planner {
                Some(planner) => planner(request),
                None => self.seek_targets(request),
            }
        };
        Ok(RebalanceResponse {
            allocation: Some(PvAllocation {
                date: String::new(),
                members,
            }),
            next_trade_date: self.next_trade_date.clone(),
            transactions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::PvPosition;

    #[test]
    fn seeks_targets_from_positions() {
        let engine = ScriptedEngine::new()
            .with_security("AAPL", "F-AAPL")
            .with_security("MSFT", "F-MSFT")
            .with_target("F-MSFT", 1.0, 100.0);

        let mut req = RebalanceRequest::allocation_only();
        req.allocation_only = false;
        req.positions = vec![
            PvPosition {
                composite_figi: "F-AAPL".into(),
                ticker: "AAPL".into(),
                shares: 10.0,
            },
            PvPosition {
                composite_figi: "F-MSFT".into(),
                ticker: "MSFT".into(),
                shares: 60.0,
            },
        ];
        req.price_data.insert("F-AAPL".into(), 185.0);
        req.price_data.insert("F-MSFT".into(), 400.0);

        let txs = engine.rebalance("p", &req).unwrap().transactions;
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].kind, "SELL");
        assert_eq!(txs[0].ticker, "AAPL");
        assert_eq!(txs[0].shares, 10.0);
        assert_eq!(txs[1].kind, "BUY");
        assert_eq!(txs[1].shares, 40.0);
        assert_eq!(txs[1].price_per_share, 400.0);
    }

    #[test]
    fn unknown_query() {
        let engine = ScriptedEngine::new();
        assert!(matches!(
            engine.resolve_security("ZZZZ"),
            Err(StrategyError::NotFound(_))
        ));
    }
}
