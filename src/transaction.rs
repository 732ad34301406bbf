//! Buy/sell transactions produced by the strategy engine.

use std::fmt;
use std::str::FromStr;

use crate::types::SecurityId;

/// Direction of a planned transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TransactionKind {
    Buy,
    Sell,
}

impl FromStr for TransactionKind {
    type Err = String;

    /// Parses the engine's `"BUY"` / `"SELL"`; anything else is returned as the error.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(TransactionKind::Buy),
            "SELL" => Ok(TransactionKind::Sell),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionKind::Buy => write!(f, "BUY"),
            TransactionKind::Sell => write!(f, "SELL"),
        }
    }
}

/// A single planned change, priced at the snapshot's reference price.
///
/// `shares` may be fractional; sizing truncates it to whole shares.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transaction {
    pub security: SecurityId,
    pub broker_symbol: String,
    pub kind: TransactionKind,
    pub shares: f64,
    /// Reference price in dollars.
    pub price: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_kinds() {
        assert_eq!("BUY".parse::<TransactionKind>(), Ok(TransactionKind::Buy));
        assert_eq!("SELL".parse::<TransactionKind>(), Ok(TransactionKind::Sell));
        assert_eq!(
            "DEPOSIT".parse::<TransactionKind>(),
            Err("DEPOSIT".to_string())
        );
        // Case matters: the engine only emits upper case.
        assert!("buy".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for kind in [TransactionKind::Buy, TransactionKind::Sell] {
            assert_eq!(kind.to_string().parse::<TransactionKind>(), Ok(kind));
        }
    }
}
