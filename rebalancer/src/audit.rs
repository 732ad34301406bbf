//! JSONL audit trail logging.
//!
//! Each sync appends events to an audit.jsonl file, one JSON object per
//! line. Money is written in dollars.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use tradelink::{OrderExecutionRecord, OrderRequest, Position, Price};

use crate::error::Result;
use crate::monitor::SubmittedOrder;

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

fn orders_json(orders: &[OrderRequest]) -> Vec<serde_json::Value> {
    orders
        .iter()
        .map(|o| {
            serde_json::json!({
                "symbol": o.symbol,
                "action": o.action.to_string(),
                "shares": o.quantity,
                "limit": o.limit_price.as_dollars(),
            })
        })
        .collect()
}

pub fn log_run_started(audit: &mut AuditLog, portfolio_id: &str, account_id: &str) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "portfolio": portfolio_id,
            "account": account_id,
        }),
    )
}

pub fn log_positions(
    audit: &mut AuditLog,
    iteration: u32,
    positions: &[Position],
    cash: f64,
) -> Result<()> {
    let pos_data: Vec<_> = positions
        .iter()
        .map(|p| {
            serde_json::json!({
                "security": p.security.as_str(),
                "symbol": p.broker_symbol,
                "qty": p.quantity,
            })
        })
        .collect();

    audit.log(
        "positions_fetched",
        serde_json::json!({
            "iteration": iteration,
            "positions": pos_data,
            "cash": cash,
        }),
    )
}

pub fn log_plan(
    audit: &mut AuditLog,
    iteration: u32,
    orders: &[OrderRequest],
    projected_cash: Price,
    skipped: usize,
) -> Result<()> {
    audit.log(
        "plan_computed",
        serde_json::json!({
            "iteration": iteration,
            "orders": orders_json(orders),
            "projected_cash": projected_cash.as_dollars(),
            "skipped": skipped,
        }),
    )
}

pub fn log_confirmation(audit: &mut AuditLog, iteration: u32, approved: bool) -> Result<()> {
    audit.log(
        "user_confirmed",
        serde_json::json!({ "iteration": iteration, "approved": approved }),
    )
}

pub fn log_submitted(
    audit: &mut AuditLog,
    iteration: u32,
    orders: &[SubmittedOrder],
) -> Result<()> {
    let data: Vec<_> = orders
        .iter()
        .map(|o| {
            serde_json::json!({
                "order_id": o.order_id,
                "symbol": o.request.symbol,
                "action": o.request.action.to_string(),
                "shares": o.request.quantity,
                "limit": o.request.limit_price.as_dollars(),
            })
        })
        .collect();
    audit.log(
        "orders_submitted",
        serde_json::json!({ "iteration": iteration, "orders": data }),
    )
}

pub fn log_fills(
    audit: &mut AuditLog,
    iteration: u32,
    records: &[OrderExecutionRecord],
    settled: bool,
) -> Result<()> {
    let data: Vec<_> = records
        .iter()
        .flat_map(|r| {
            r.legs.iter().map(move |leg| {
                serde_json::json!({
                    "order_id": r.order_id,
                    "status": r.status.to_string(),
                    "symbol": leg.symbol,
                    "ordered": leg.quantity_ordered,
                    "filled": leg.quantity_filled,
                })
            })
        })
        .collect();
    audit.log(
        "fills_observed",
        serde_json::json!({ "iteration": iteration, "settled": settled, "legs": data }),
    )
}

pub fn log_run_completed(audit: &mut AuditLog, outcome: &str, iterations: u32) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({ "outcome": outcome, "iterations": iterations }),
    )
}

/// A sync that ended in an error, including cancellation.
pub fn log_run_aborted(audit: &mut AuditLog, reason: &str, iteration: u32) -> Result<()> {
    audit.log(
        "run_aborted",
        serde_json::json!({ "reason": reason, "iteration": iteration }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradelink::SecurityId;

    #[test]
    fn audit_log_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_audit.jsonl");

        {
            let mut log = AuditLog::open(&path).unwrap();
            log_run_started(&mut log, "p-1", "SIM123").unwrap();
            log_positions(
                &mut log,
                1,
                &[Position::new(SecurityId::new("F-AAPL"), "AAPL", 10)],
                250.0,
            )
            .unwrap();
        }

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        for line in &lines {
            let _: serde_json::Value = serde_json::from_str(line).unwrap();
        }

        assert!(lines[0].contains("\"event\":\"run_started\""));
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["positions"][0]["symbol"], "AAPL");
        assert_eq!(second["cash"], 250.0);
    }

    #[test]
    fn audit_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subdir").join("deep").join("audit.jsonl");

        let mut log = AuditLog::open(&path).unwrap();
        log_run_completed(&mut log, "converged", 1).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn audit_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        for _ in 0..2 {
            let mut log = AuditLog::open(&path).unwrap();
            log_confirmation(&mut log, 1, false).unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}
