//! Core types: Price, SecurityId

use std::fmt;

/// Money amount in cents.
///
/// `Price(10050)` represents $100.50. Limit prices and the cash ledger use
/// fixed-point cents so order arithmetic stays exact; the strategy engine's
/// fractional dollar prices are converted at the edge with [`Price::from_dollars`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Price(pub i64);

impl Price {
    pub const ZERO: Price = Price(0);

    /// Round a dollar amount to the nearest cent.
    ///
    /// Returns `None` for NaN or infinite input.
    pub fn from_dollars(dollars: f64) -> Option<Price> {
        if !dollars.is_finite() {
            return None;
        }
        Some(Price((dollars * 100.0).round() as i64))
    }

    /// Dollar value as a float (for display and wire formats).
    pub fn as_dollars(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Notional of `quantity` shares at this price.
    pub fn times(self, quantity: u64) -> Price {
        Price(self.0.saturating_mul(quantity as i64))
    }
}

impl std::ops::Add for Price {
    type Output = Price;

    fn add(self, rhs: Price) -> Price {
        Price(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Price {
    type Output = Price;

    fn sub(self, rhs: Price) -> Price {
        Price(self.0 - rhs.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dollars = self.0 / 100;
        let cents = (self.0 % 100).abs();
        if self.0 < 0 {
            write!(f, "-${}.{:02}", dollars.abs(), cents)
        } else {
            write!(f, "${}.{:02}", dollars, cents)
        }
    }
}

/// Strategy-engine security identifier (a composite FIGI, or `$CASH`).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SecurityId(String);

/// Reserved identifier (and ticker) of the synthetic cash position.
pub const CASH_ID: &str = "$CASH";

impl SecurityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The synthetic cash identifier.
    pub fn cash() -> Self {
        Self(CASH_ID.to_string())
    }

    pub fn is_cash(&self) -> bool {
        self.0 == CASH_ID
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SecurityId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
