//! Target allocation returned by the strategy engine's allocation-only call.

use rustc_hash::FxHashMap;

use crate::error::PlanError;
use crate::types::SecurityId;

/// Tolerance on the weight sum; engines round weights independently.
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// Security → target weight. Whatever the weights leave below 1.0 is cash.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct AllocationTarget {
    weights: FxHashMap<SecurityId, f64>,
}

impl AllocationTarget {
    /// Build a target, rejecting negative, non-finite, or over-allocated weights.
    pub fn new(weights: FxHashMap<SecurityId, f64>) -> Result<Self, PlanError> {
        let mut sum = 0.0;
        for (id, &w) in &weights {
            if !w.is_finite() || w < 0.0 {
                return Err(PlanError::InvalidAllocation(format!(
                    "weight {w} for {id} outside [0, 1]"
                )));
            }
            sum += w;
        }
        if sum > 1.0 + WEIGHT_SUM_EPSILON {
            return Err(PlanError::InvalidAllocation(format!(
                "weights sum to {sum:.6} (> 1.0)"
            )));
        }
        Ok(Self { weights })
    }

    pub fn weight(&self, id: &SecurityId) -> Option<f64> {
        self.weights.get(id).copied()
    }

    /// Securities in the target, sorted, cash excluded.
    pub fn securities(&self) -> Vec<SecurityId> {
        let mut ids: Vec<SecurityId> = self
            .weights
            .keys()
            .filter(|id| !id.is_cash())
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Implicit cash weight (1 − Σ non-cash weights), never negative.
    pub fn cash_weight(&self) -> f64 {
        let invested: f64 = self
            .weights
            .iter()
            .filter(|(id, _)| !id.is_cash())
            .map(|(_, w)| w)
            .sum();
        (1.0 - invested).max(0.0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(pairs: &[(&str, f64)]) -> Result<AllocationTarget, PlanError> {
        AllocationTarget::new(
            pairs
                .iter()
                .map(|&(id, w)| (SecurityId::new(id), w))
                .collect(),
        )
    }

    #[test]
    fn valid_target() {
        let t = target(&[("B", 0.4), ("A", 0.5)]).unwrap();
        assert_eq!(t.securities(), vec![SecurityId::new("A"), SecurityId::new("B")]);
        assert!((t.cash_weight() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn rejects_over_allocation() {
        assert!(target(&[("A", 0.7), ("B", 0.4)]).is_err());
    }

    #[test]
    fn rejects_negative_and_nan() {
        assert!(target(&[("A", -0.1)]).is_err());
        assert!(target(&[("A", f64::NAN)]).is_err());
    }

    #[test]
    fn cash_member_not_a_security() {
        let t = target(&[("$CASH", 0.2), ("A", 0.8)]).unwrap();
        assert_eq!(t.securities(), vec![SecurityId::new("A")]);
    }
}
