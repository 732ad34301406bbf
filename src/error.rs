//! Planning errors raised by the core types.

use crate::types::SecurityId;

/// Errors that make a plan unusable. All of them are fatal for the sync.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// A security referenced by a position or transaction has no price.
    #[error("no reference price for security {0}")]
    MissingPrice(SecurityId),

    /// A quote produced a non-positive or non-finite midpoint.
    #[error("invalid reference price {price} for {symbol}")]
    InvalidPrice { symbol: String, price: f64 },

    /// The allocation target violates its weight invariants.
    #[error("invalid allocation: {0}")]
    InvalidAllocation(String),

    /// The strategy engine returned a transaction kind other than BUY/SELL.
    #[error("unknown transaction kind '{kind}' for {security}")]
    UnknownTransactionKind { kind: String, security: SecurityId },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let err = PlanError::MissingPrice(SecurityId::new("BBG000B9XRY4"));
        assert_eq!(err.to_string(), "no reference price for security BBG000B9XRY4");

        let err = PlanError::UnknownTransactionKind {
            kind: "DIVIDEND".into(),
            security: SecurityId::new("BBG000B9XRY4"),
        };
        assert!(err.to_string().contains("DIVIDEND"));
    }
}
