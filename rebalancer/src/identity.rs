//! Broker symbol ⇄ strategy identifier resolution.
//!
//! TradeStation writes share classes with a dot (`BRK.B`), the strategy
//! engine with a slash (`BRK/B`). Lookups go through the engine's security
//! directory and are cached for the lifetime of one resolver, i.e. one sync.

use std::sync::Mutex;

use log::debug;
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use tradelink::{Position, SecurityId};
use tradelink_broker::BrokerPosition;

use crate::config::DualClassPair;
use crate::error::{Error, Result};
use crate::strategy::{StrategyEngine, StrategySecurity};

/// Broker symbol → strategy query form (`BRK.B` → `BRK/B`).
pub fn query_form(broker_symbol: &str) -> String {
    broker_symbol.replace('.', "/")
}

/// Strategy ticker → broker form (`BRK/B` → `BRK.B`).
pub fn broker_form(ticker: &str) -> String {
    ticker.replace('/', ".")
}

pub struct SecurityResolver<'a, E: StrategyEngine + ?Sized> {
    engine: &'a E,
    dual_class: &'a [DualClassPair],
    cache: Mutex<FxHashMap<String, StrategySecurity>>,
}

impl<'a, E: StrategyEngine + ?Sized> SecurityResolver<'a, E> {
    pub fn new(engine: &'a E, dual_class: &'a [DualClassPair]) -> Self {
        Self {
            engine,
            dual_class,
            cache: Mutex::new(FxHashMap::default()),
        }
    }

    fn lookup(&self, query: &str) -> Result<StrategySecurity> {
        if let Some(hit) = self.cache_guard().get(query) {
            return Ok(hit.clone());
        }
        // The lock is not held across the request; concurrent misses on the
        // same key both resolve and the second insert wins.
        let security = self
            .engine
            .resolve_security(query)
            .map_err(|source| Error::Resolution {
                query: query.to_string(),
                source,
            })?;
        debug!(
            "Resolved {query} -> {} ({})",
            security.composite_figi, security.ticker
        );
        self.cache_guard()
            .insert(query.to_string(), security.clone());
        Ok(security)
    }

    fn cache_guard(&self) -> std::sync::MutexGuard<'_, FxHashMap<String, StrategySecurity>> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Strategy identifier of a broker symbol.
    pub fn to_strategy_identity(&self, broker_symbol: &str) -> Result<SecurityId> {
        let security = self.lookup(&query_form(broker_symbol))?;
        Ok(SecurityId::new(security.composite_figi))
    }

    /// Broker symbol of a strategy identifier.
    pub fn to_broker_symbol(&self, id: &SecurityId) -> Result<String> {
        let security = self.lookup(id.as_str())?;
        Ok(self.broker_symbol_for_ticker(&security.ticker))
    }

    /// Broker symbol for a strategy ticker. The high-priced class of a
    /// dual-class pair is traded through its low-priced class.
    pub fn broker_symbol_for_ticker(&self, ticker: &str) -> String {
        let symbol = broker_form(ticker);
        match self.dual_class.iter().find(|p| p.high == symbol) {
            Some(pair) => pair.low.clone(),
            None => symbol,
        }
    }

    /// The high-priced sibling of `broker_symbol`, if it is the low-priced
    /// class of a configured pair.
    pub fn dual_class_high(&self, broker_symbol: &str) -> Option<&'a str> {
        self.dual_class
            .iter()
            .find(|p| p.low == broker_symbol)
            .map(|p| p.high.as_str())
    }

    /// Resolve every broker position. Lookups run in parallel; any failure
    /// fails the whole batch.
    pub fn resolve_positions(&self, positions: &[BrokerPosition]) -> Result<Vec<Position>> {
        positions
            .par_iter()
            .map(|p| {
                let id = self.to_strategy_identity(&p.symbol)?;
                Ok(Position::new(id, p.symbol.clone(), p.quantity))
            })
            .collect()
    }

    /// Broker symbols for a set of strategy identifiers, in input order.
    pub fn broker_symbols(&self, ids: &[SecurityId]) -> Result<Vec<String>> {
        ids.par_iter().map(|id| self.to_broker_symbol(id)).collect()
    }

    /// Number of distinct lookups cached so far.
    pub fn cached(&self) -> usize {
        self.cache_guard().len()
    }
}
