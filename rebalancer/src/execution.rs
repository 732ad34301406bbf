//! The sync loop: plan, confirm, submit, monitor, re-plan until converged.
//!
//! Every iteration starts from the brokerage's current positions and cash,
//! so whatever filled in the previous iteration is already held and whatever
//! did not is planned again at fresh prices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, info, warn};

use tradelink::{
    CashLedger, OrderExecutionRecord, OrderRequest, Price, Remainder, all_filled, build_orders,
    net_fills, remainders,
};
use tradelink_broker::Brokerage;

use crate::audit::{self, AuditLog};
use crate::config::{Config, SyncPlan};
use crate::confirm::{ConfirmationProvider, ConfirmationRequest};
use crate::error::{Error, Result};
use crate::identity::SecurityResolver;
use crate::monitor::{Clock, FillMonitor, SubmittedOrder};
use crate::planner::AllocationPlanner;
use crate::pricing;
use crate::report;
use crate::strategy::StrategyEngine;

/// Controller states, in the order a successful iteration visits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Planning,
    AwaitingConfirmation,
    Submitting,
    Monitoring,
    Converged,
    Aborted,
}

/// How a sync ended. Fatal problems are [`Error`]s instead.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Nothing left to trade.
    Converged { iterations: u32 },
    /// Budget exhausted (or orders left open) with shares still unfilled.
    NotConverged {
        iterations: u32,
        remainders: Vec<Remainder>,
    },
    /// The confirmation gate said no. Nothing was submitted in that iteration.
    Declined { iteration: u32 },
    /// The plan's next trade date has not arrived.
    NotDue { next_trade_date: Option<NaiveDate> },
}

impl SyncOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SyncOutcome::Converged { .. } => "converged",
            SyncOutcome::NotConverged { .. } => "not_converged",
            SyncOutcome::Declined { .. } => "declined",
            SyncOutcome::NotDue { .. } => "not_due",
        }
    }
}

/// One pass through the loop.
#[derive(Debug, Clone)]
pub struct IterationSummary {
    pub iteration: u32,
    pub orders: Vec<OrderRequest>,
    pub projected_cash: Price,
    pub records: Vec<OrderExecutionRecord>,
    pub remainders: Vec<Remainder>,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub outcome: SyncOutcome,
    /// Every state entered, in order.
    pub trace: Vec<SyncState>,
    pub iterations: Vec<IterationSummary>,
    /// Reported by the strategy engine on the last rebalance call.
    pub next_trade_date: Option<NaiveDate>,
}

enum Step {
    Continue(IterationSummary),
    Done(SyncOutcome, Option<IterationSummary>),
}

pub struct ExecutionController<'a, B: Brokerage + ?Sized, E: StrategyEngine + ?Sized> {
    broker: &'a B,
    engine: &'a E,
    config: &'a Config,
    plan: &'a SyncPlan,
    confirm: &'a dyn ConfirmationProvider,
    clock: &'a dyn Clock,
    cancel: &'a AtomicBool,
    audit: Option<AuditLog>,
    trace: Vec<SyncState>,
    next_trade_date: Option<NaiveDate>,
}

impl<'a, B: Brokerage + ?Sized, E: StrategyEngine + ?Sized> ExecutionController<'a, B, E> {
    pub fn new(
        broker: &'a B,
        engine: &'a E,
        config: &'a Config,
        plan: &'a SyncPlan,
        confirm: &'a dyn ConfirmationProvider,
        clock: &'a dyn Clock,
        cancel: &'a AtomicBool,
    ) -> Self {
        Self {
            broker,
            engine,
            config,
            plan,
            confirm,
            clock,
            cancel,
            audit: None,
            trace: Vec::new(),
            next_trade_date: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    fn enter(&mut self, state: SyncState) {
        debug!("State -> {state:?}");
        self.trace.push(state);
    }

    fn audit(&mut self, f: impl FnOnce(&mut AuditLog) -> Result<()>) -> Result<()> {
        match self.audit.as_mut() {
            Some(log) => f(log),
            None => Ok(()),
        }
    }

    /// Run the sync as of `today`.
    pub fn run(mut self, today: NaiveDate) -> Result<SyncReport> {
        if !self.plan.is_due(today) {
            info!(
                "No trades necessary: next trade date {:?} has not arrived",
                self.plan.next_trade_date
            );
            return Ok(SyncReport {
                outcome: SyncOutcome::NotDue {
                    next_trade_date: self.plan.next_trade_date,
                },
                trace: Vec::new(),
                iterations: Vec::new(),
                next_trade_date: self.plan.next_trade_date,
            });
        }

        let plan = self.plan;
        let (portfolio, account) = (plan.portfolio_id.as_str(), plan.account_id.as_str());
        info!("Sync started: portfolio={portfolio} account={account}");
        self.audit(|a| audit::log_run_started(a, portfolio, account))?;

        let mut summaries = Vec::new();
        let mut iteration = 0;
        let outcome = match self.drive(&mut summaries, &mut iteration) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Sync aborted: {e}");
                let reason = e.to_string();
                // The audit write is best effort; the original error wins.
                let _ = self.audit(|a| audit::log_run_aborted(a, &reason, iteration));
                return Err(e);
            }
        };

        info!("Sync finished: {}", outcome.label());
        let label = outcome.label();
        self.audit(|a| audit::log_run_completed(a, label, iteration))?;
        Ok(SyncReport {
            outcome,
            trace: self.trace,
            iterations: summaries,
            next_trade_date: self.next_trade_date,
        })
    }

    /// Iterate until an outcome is reached. `iteration` tracks the pass in
    /// progress so a failure can be reported against it.
    fn drive(
        &mut self,
        summaries: &mut Vec<IterationSummary>,
        iteration: &mut u32,
    ) -> Result<SyncOutcome> {
        let (plan, config, engine) = (self.plan, self.config, self.engine);
        let resolver = SecurityResolver::new(engine, &config.identity.dual_class);
        let planner = AllocationPlanner::new(
            engine,
            plan.portfolio_id.as_str(),
            config.execution.unknown_kind,
        );
        let exec = &config.execution;
        let max_elapsed = exec.max_elapsed_secs.map(Duration::from_secs);
        let started = self.clock.elapsed();

        // The target universe is fixed for the whole sync.
        let target = planner.plan_allocation_only()?;
        let target_symbols = resolver.broker_symbols(&target.securities())?;

        loop {
            *iteration += 1;
            let iteration = *iteration;
            if self.cancel.load(Ordering::Relaxed) {
                return Err(Error::Cancelled);
            }

            match self.iterate(iteration, &resolver, &planner, &target_symbols)? {
                Step::Done(outcome, summary) => {
                    summaries.extend(summary);
                    return Ok(outcome);
                }
                Step::Continue(summary) => {
                    let unfilled: u64 = summary.remainders.iter().map(Remainder::unfilled).sum();
                    let last = summary.remainders.clone();
                    summaries.push(summary);

                    let over_time =
                        max_elapsed.is_some_and(|max| self.clock.elapsed() - started >= max);
                    if iteration >= exec.max_iterations || over_time {
                        warn!(
                            "Did not converge after {iteration} iterations; {unfilled} shares unfilled"
                        );
                        self.enter(SyncState::Aborted);
                        return Ok(SyncOutcome::NotConverged {
                            iterations: iteration,
                            remainders: last,
                        });
                    }
                    info!("Re-planning: {unfilled} shares unfilled after iteration {iteration}");
                }
            }
        }
    }

    fn iterate(
        &mut self,
        iteration: u32,
        resolver: &SecurityResolver<'_, E>,
        planner: &AllocationPlanner<'_, E>,
        target_symbols: &[String],
    ) -> Result<Step> {
        let (plan, config) = (self.plan, self.config);
        let account = plan.account_id.as_str();
        self.enter(SyncState::Planning);

        let broker_positions = self
            .broker
            .positions(account)
            .map_err(|e| Error::broker("positions", account, e))?;
        let cash = self
            .broker
            .cash_balance(account)
            .map_err(|e| Error::broker("balance", account, e))?;
        let positions = resolver.resolve_positions(&broker_positions)?;
        info!(
            "Iteration {iteration}: {} positions, cash ${cash:.2}",
            positions.len()
        );
        self.audit(|a| audit::log_positions(a, iteration, &positions, cash))?;

        let universe = pricing::quote_universe(
            positions
                .iter()
                .map(|p| p.broker_symbol.as_str())
                .chain(target_symbols.iter().map(String::as_str)),
        );
        let snapshot = pricing::snapshot(self.broker, resolver, account, &universe)?;

        let rebalance = planner.plan_rebalance(resolver, &positions, cash, &snapshot)?;
        if rebalance.next_trade_date.is_some() {
            self.next_trade_date = rebalance.next_trade_date;
        }

        let mut ledger = CashLedger::from_dollars(cash);
        let (orders, dropped): (Vec<OrderRequest>, Vec<OrderRequest>) =
            build_orders(account, &rebalance.transactions, &mut ledger)
                .into_iter()
                .partition(|o| o.quantity > 0);
        for o in &dropped {
            info!("Dropping {} {}: less than one whole share", o.action, o.symbol);
        }
        let projected_cash = ledger.balance();
        self.audit(|a| audit::log_plan(a, iteration, &orders, projected_cash, rebalance.skipped))?;

        if orders.is_empty() {
            info!("Iteration {iteration}: nothing to trade");
            self.enter(SyncState::Converged);
            return Ok(Step::Done(
                SyncOutcome::Converged {
                    iterations: iteration,
                },
                None,
            ));
        }

        self.enter(SyncState::AwaitingConfirmation);
        let approved = self.confirm.confirm(&ConfirmationRequest {
            iteration,
            account_id: account,
            orders: &orders,
            projected_cash,
        })?;
        self.audit(|a| audit::log_confirmation(a, iteration, approved))?;
        if !approved {
            info!("Orders not confirmed; nothing submitted");
            self.enter(SyncState::Aborted);
            let summary = IterationSummary {
                iteration,
                orders,
                projected_cash,
                records: Vec::new(),
                remainders: Vec::new(),
            };
            return Ok(Step::Done(SyncOutcome::Declined { iteration }, Some(summary)));
        }

        self.enter(SyncState::Submitting);
        let placed = self
            .broker
            .submit_order_group(account, &orders)
            .map_err(|source| Error::Submission {
                account: account.to_string(),
                source,
            })?;
        let submitted: Vec<SubmittedOrder> = placed
            .iter()
            .zip(&orders)
            .map(|(record, request)| SubmittedOrder {
                order_id: record.order_id.clone(),
                request: request.clone(),
            })
            .collect();
        info!("Submitted {} orders", submitted.len());
        self.audit(|a| audit::log_submitted(a, iteration, &submitted))?;

        self.enter(SyncState::Monitoring);
        let exec = &config.execution;
        let monitor = FillMonitor::new(self.clock, self.cancel).with_timing(
            Duration::from_secs(exec.initial_wait_secs),
            Duration::from_secs(exec.poll_interval_secs),
            Duration::from_secs(exec.monitor_timeout_secs),
        );
        let mut result = monitor.wait_for_fills(self.broker, account, &submitted)?;
        // Orders the broker did not accept never fill.
        for request in orders.iter().skip(submitted.len()) {
            result
                .records
                .push(OrderExecutionRecord::unobserved("-", request));
        }
        self.audit(|a| audit::log_fills(a, iteration, &result.records, result.settled))?;
        print!("{}", report::fills_table(&result.records));
        let mut net: Vec<(String, i64)> = net_fills(&result.records).into_iter().collect();
        net.sort();
        for (symbol, qty) in &net {
            info!("Net fill {symbol}: {qty:+}");
        }

        let left = remainders(&result.records);
        let summary = IterationSummary {
            iteration,
            orders,
            projected_cash,
            records: result.records,
            remainders: left.clone(),
        };
        if all_filled(&left) {
            self.enter(SyncState::Converged);
            return Ok(Step::Done(
                SyncOutcome::Converged {
                    iterations: iteration,
                },
                Some(summary),
            ));
        }
        if !result.settled {
            if exec.stop_on_open_orders {
                warn!("Orders still open after monitoring; not re-planning");
                self.enter(SyncState::Aborted);
                return Ok(Step::Done(
                    SyncOutcome::NotConverged {
                        iterations: iteration,
                        remainders: left,
                    },
                    Some(summary),
                ));
            }
            warn!("Orders still open after monitoring; re-planning against current positions");
        }
        Ok(Step::Continue(summary))
    }
}
