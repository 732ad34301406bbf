//! Error types for the rebalancer.

use std::path::PathBuf;

use tradelink::{PlanError, SecurityId};
use tradelink_broker::BrokerError;

use crate::strategy::StrategyError;

/// All errors that can occur during a sync.
///
/// Non-convergence and a declined confirmation are not errors; see
/// [`crate::execution::SyncOutcome`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to write plan file {path}: {detail}")]
    PlanWrite { path: PathBuf, detail: String },

    #[error("missing secret: environment variable {0} is not set")]
    MissingSecret(String),

    #[error("could not resolve {query}: {source}")]
    Resolution {
        query: String,
        source: StrategyError,
    },

    #[error("no price for {security}: {detail}")]
    Pricing { security: SecurityId, detail: String },

    #[error("planning failed for portfolio {portfolio}: {source}")]
    Plan {
        portfolio: String,
        source: PlanError,
    },

    #[error("strategy engine request for portfolio {portfolio} failed: {source}")]
    Strategy {
        portfolio: String,
        source: StrategyError,
    },

    #[error("broker {operation} failed for account {account}: {source}")]
    Broker {
        operation: &'static str,
        account: String,
        source: BrokerError,
    },

    #[error("order submission failed for account {account}: {source}")]
    Submission {
        account: String,
        source: BrokerError,
    },

    #[error("monitoring cancelled")]
    Cancelled,

    #[error("prompt error: {0}")]
    Prompt(String),

    #[error("audit log error: {0}")]
    Audit(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn broker(operation: &'static str, account: &str, source: BrokerError) -> Self {
        Error::Broker {
            operation,
            account: account.to_string(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
