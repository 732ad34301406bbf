//! Reference-price snapshot for one planning pass.
//!
//! A snapshot maps strategy identities to the bid/ask midpoint observed when
//! the quotes were taken. It never holds a zero or non-finite price: inserts
//! validate, and lookups of absent securities fail instead of defaulting.

use rustc_hash::FxHashMap;

use crate::error::PlanError;
use crate::types::SecurityId;

/// Bid/ask midpoint: `bid + (ask - bid) / 2`.
pub fn midpoint(bid: f64, ask: f64) -> f64 {
    bid + (ask - bid) / 2.0
}

/// Security → reference price in dollars.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PriceSnapshot {
    prices: FxHashMap<SecurityId, f64>,
}

impl PriceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reference price. `symbol` is only used for the error message.
    pub fn insert(&mut self, id: SecurityId, symbol: &str, price: f64) -> Result<(), PlanError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(PlanError::InvalidPrice {
                symbol: symbol.to_string(),
                price,
            });
        }
        self.prices.insert(id, price);
        Ok(())
    }

    pub fn get(&self, id: &SecurityId) -> Option<f64> {
        self.prices.get(id).copied()
    }

    /// Price for `id`, or [`PlanError::MissingPrice`].
    pub fn require(&self, id: &SecurityId) -> Result<f64, PlanError> {
        self.get(id).ok_or_else(|| PlanError::MissingPrice(id.clone()))
    }

    /// Fail on the first non-cash identifier without a price.
    pub fn ensure_covers<'a, I>(&self, ids: I) -> Result<(), PlanError>
    where
        I: IntoIterator<Item = &'a SecurityId>,
    {
        for id in ids {
            if !id.is_cash() {
                self.require(id)?;
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: &SecurityId) -> bool {
        self.prices.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SecurityId, f64)> {
        self.prices.iter().map(|(id, &p)| (id, p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_of_quote() {
        assert_eq!(midpoint(99.0, 101.0), 100.0);
        assert_eq!(midpoint(10.0, 10.0), 10.0);
        assert!((midpoint(185.10, 185.15) - 185.125).abs() < 1e-9);
    }

    #[test]
    fn rejects_zero_and_nan() {
        let mut snap = PriceSnapshot::new();
        assert!(snap.insert(SecurityId::new("A"), "A", 0.0).is_err());
        assert!(snap.insert(SecurityId::new("A"), "A", f64::NAN).is_err());
        assert!(snap.insert(SecurityId::new("A"), "A", -1.0).is_err());
        assert!(snap.is_empty());
    }

    #[test]
    fn require_fails_closed() {
        let mut snap = PriceSnapshot::new();
        snap.insert(SecurityId::new("A"), "A", 12.5).unwrap();
        assert_eq!(snap.require(&SecurityId::new("A")), Ok(12.5));
        assert_eq!(
            snap.require(&SecurityId::new("B")),
            Err(PlanError::MissingPrice(SecurityId::new("B")))
        );
    }

    #[test]
    fn cash_needs_no_price() {
        let snap = PriceSnapshot::new();
        let ids = [SecurityId::cash()];
        assert!(snap.ensure_covers(ids.iter()).is_ok());
        let ids = [SecurityId::cash(), SecurityId::new("A")];
        assert!(snap.ensure_covers(ids.iter()).is_err());
    }
}
