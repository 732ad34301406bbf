//! Account holdings expressed in strategy-engine identities.

use crate::types::SecurityId;

/// One holding, resolved to its strategy-engine identity.
///
/// `quantity` is signed: positive = long, negative = short.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub security: SecurityId,
    pub broker_symbol: String,
    pub quantity: i64,
}

impl Position {
    pub fn new(security: SecurityId, broker_symbol: impl Into<String>, quantity: i64) -> Self {
        Self {
            security,
            broker_symbol: broker_symbol.into(),
            quantity,
        }
    }
}

/// Net signed quantity held for `security` (0 if absent).
pub fn held_quantity(positions: &[Position], security: &SecurityId) -> i64 {
    positions
        .iter()
        .filter(|p| &p.security == security)
        .map(|p| p.quantity)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_quantity_sums_lots() {
        let aapl = SecurityId::new("BBG000B9XRY4");
        let positions = vec![
            Position::new(aapl.clone(), "AAPL", 10),
            Position::new(aapl.clone(), "AAPL", 5),
            Position::new(SecurityId::new("BBG000BPH459"), "MSFT", 7),
        ];
        assert_eq!(held_quantity(&positions, &aapl), 15);
        assert_eq!(held_quantity(&positions, &SecurityId::new("X")), 0);
    }
}
