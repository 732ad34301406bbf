//! Reference prices for a planning pass.
//!
//! One quote request covers every symbol the pass touches. The reference
//! price is the bid/ask midpoint; anything short of a positive, finite
//! midpoint for every requested symbol fails the snapshot.

use log::{debug, info};
use rustc_hash::FxHashSet;

use tradelink::{PriceSnapshot, SecurityId};
use tradelink_broker::{BrokerError, Brokerage};

use crate::error::{Error, Result};
use crate::identity::SecurityResolver;
use crate::strategy::StrategyEngine;

/// Sorted, de-duplicated symbol list.
pub fn quote_universe<'s>(symbols: impl IntoIterator<Item = &'s str>) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut out: Vec<String> = symbols
        .into_iter()
        .filter(|s| !s.is_empty() && seen.insert(*s))
        .map(str::to_string)
        .collect();
    out.sort();
    out
}

/// Quote `symbols` and key the midpoints by strategy identifier.
///
/// When the low-priced class of a dual-class pair is quoted, its high-priced
/// sibling is registered at the same price.
pub fn snapshot<B, E>(
    broker: &B,
    resolver: &SecurityResolver<'_, E>,
    account_id: &str,
    symbols: &[String],
) -> Result<PriceSnapshot>
where
    B: Brokerage + ?Sized,
    E: StrategyEngine + ?Sized,
{
    let mut snapshot = PriceSnapshot::new();
    if symbols.is_empty() {
        return Ok(snapshot);
    }

    let quotes = broker.quotes(symbols).map_err(|e| match e {
        BrokerError::Quote { symbol, message } => Error::Pricing {
            security: SecurityId::new(symbol),
            detail: message,
        },
        other => Error::broker("quotes", account_id, other),
    })?;

    for symbol in symbols {
        let quote = quotes
            .iter()
            .find(|q| &q.symbol == symbol)
            .ok_or_else(|| Error::Pricing {
                security: SecurityId::new(symbol.as_str()),
                detail: "no quote returned".into(),
            })?;
        let mid = quote.midpoint();
        let id = resolver.to_strategy_identity(symbol)?;
        snapshot
            .insert(id.clone(), symbol, mid)
            .map_err(|e| Error::Pricing {
                security: id,
                detail: e.to_string(),
            })?;
        debug!("{symbol}: bid={} ask={} mid={mid:.4}", quote.bid, quote.ask);

        if let Some(high) = resolver.dual_class_high(symbol) {
            let high_id = resolver.to_strategy_identity(high)?;
            snapshot
                .insert(high_id.clone(), high, mid)
                .map_err(|e| Error::Pricing {
                    security: high_id,
                    detail: e.to_string(),
                })?;
            debug!("{high}: priced from {symbol}");
        }
    }

    info!("Priced {} securities from {} quotes", snapshot.len(), symbols.len());
    Ok(snapshot)
}
