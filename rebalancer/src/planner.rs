//! Allocation planning against the strategy engine.
//!
//! Two calls per pass: allocation-only to learn which securities the target
//! holds (so they can be priced), then a full rebalance with current
//! positions, cash and prices. The rebalance call is made fresh every pass.

use chrono::NaiveDate;
use log::{debug, info, warn};
use rustc_hash::FxHashMap;

use tradelink::{
    AllocationTarget, CASH_ID, PlanError, Position, PriceSnapshot, SecurityId, Transaction,
    TransactionKind, held_quantity,
};

use crate::config::UnknownKindPolicy;
use crate::error::{Error, Result};
use crate::identity::{SecurityResolver, query_form};
use crate::strategy::{PvPosition, RebalanceRequest, StrategyEngine};

/// Output of a rebalance call.
#[derive(Debug, Clone, Default)]
pub struct RebalancePlan {
    pub transactions: Vec<Transaction>,
    /// Transactions dropped for an unrecognized kind.
    pub skipped: usize,
    pub next_trade_date: Option<NaiveDate>,
}

pub struct AllocationPlanner<'a, E: StrategyEngine + ?Sized> {
    engine: &'a E,
    portfolio_id: &'a str,
    unknown_kind: UnknownKindPolicy,
}

impl<'a, E: StrategyEngine + ?Sized> AllocationPlanner<'a, E> {
    pub fn new(engine: &'a E, portfolio_id: &'a str, unknown_kind: UnknownKindPolicy) -> Self {
        Self {
            engine,
            portfolio_id,
            unknown_kind,
        }
    }

    fn plan_error(&self, source: PlanError) -> Error {
        Error::Plan {
            portfolio: self.portfolio_id.to_string(),
            source,
        }
    }

    /// Target allocation, without positions or prices.
    pub fn plan_allocation_only(&self) -> Result<AllocationTarget> {
        let resp = self
            .engine
            .rebalance(self.portfolio_id, &RebalanceRequest::allocation_only())
            .map_err(|source| Error::Strategy {
                portfolio: self.portfolio_id.to_string(),
                source,
            })?;
        let members = resp.allocation.map(|a| a.members).unwrap_or_default();
        let weights: FxHashMap<SecurityId, f64> = members
            .into_iter()
            .map(|(figi, w)| (SecurityId::new(figi), w))
            .collect();
        let target = AllocationTarget::new(weights).map_err(|e| self.plan_error(e))?;
        info!(
            "Allocation for {}: {} securities, cash weight {:.4}",
            self.portfolio_id,
            target.securities().len(),
            target.cash_weight()
        );
        Ok(target)
    }

    /// Transactions that move `positions` + `cash` to the target.
    ///
    /// Fails closed if any position or any transaction lacks a price.
    pub fn plan_rebalance(
        &self,
        resolver: &SecurityResolver<'_, E>,
        positions: &[Position],
        cash: f64,
        snapshot: &PriceSnapshot,
    ) -> Result<RebalancePlan> {
        snapshot
            .ensure_covers(positions.iter().map(|p| &p.security))
            .map_err(|e| self.plan_error(e))?;

        let request = rebalance_request(positions, cash, snapshot);
        let resp = self
            .engine
            .rebalance(self.portfolio_id, &request)
            .map_err(|source| Error::Strategy {
                portfolio: self.portfolio_id.to_string(),
                source,
            })?;

        let mut plan = RebalancePlan {
            next_trade_date: resp.next_trade_date(),
            ..Default::default()
        };
        for tx in &resp.transactions {
            let security = SecurityId::new(tx.composite_figi.as_str());
            if security.is_cash() {
                debug!("Ignoring cash transaction of kind {}", tx.kind);
                continue;
            }
            let kind = match tx.kind.parse::<TransactionKind>() {
                Ok(kind) => kind,
                Err(kind) => match self.unknown_kind {
                    UnknownKindPolicy::Skip => {
                        warn!(
                            "Skipping transaction for {} ({}) with unknown kind '{kind}'",
                            tx.ticker, tx.composite_figi
                        );
                        plan.skipped += 1;
                        continue;
                    }
                    UnknownKindPolicy::Fail => {
                        return Err(
                            self.plan_error(PlanError::UnknownTransactionKind { kind, security })
                        );
                    }
                },
            };
            let price = snapshot
                .require(&security)
                .map_err(|e| self.plan_error(e))?;
            if tx.price_per_share > 0.0 && (tx.price_per_share - price).abs() > 0.005 {
                debug!(
                    "{}: engine price {} differs from quote midpoint {price}",
                    tx.ticker, tx.price_per_share
                );
            }
            let broker_symbol = if tx.ticker.is_empty() {
                resolver.to_broker_symbol(&security)?
            } else {
                resolver.broker_symbol_for_ticker(&tx.ticker)
            };
            plan.transactions.push(Transaction {
                security,
                broker_symbol,
                kind,
                shares: tx.shares,
                price,
            });
        }

        info!(
            "Plan for {}: {} transactions ({} skipped)",
            self.portfolio_id,
            plan.transactions.len(),
            plan.skipped
        );
        Ok(plan)
    }
}

/// Rebalance request body: positions in strategy form plus the synthetic
/// cash position, and every snapshot price.
pub fn rebalance_request(
    positions: &[Position],
    cash: f64,
    snapshot: &PriceSnapshot,
) -> RebalanceRequest {
    // Lots of the same security are sent as one position.
    let mut pv_positions: Vec<PvPosition> = Vec::with_capacity(positions.len() + 1);
    for p in positions {
        let figi = p.security.as_str();
        if pv_positions.iter().any(|pv| pv.composite_figi == figi) {
            continue;
        }
        pv_positions.push(PvPosition {
            composite_figi: figi.to_string(),
            ticker: query_form(&p.broker_symbol),
            shares: held_quantity(positions, &p.security) as f64,
        });
    }
    pv_positions.push(PvPosition {
        composite_figi: CASH_ID.to_string(),
        ticker: CASH_ID.to_string(),
        shares: cash,
    });

    RebalanceRequest {
        allocation_only: false,
        positions: pv_positions,
        precision: 0,
        price_data: snapshot
            .iter()
            .map(|(id, p)| (id.as_str().to_string(), p))
            .collect(),
    }
}
