//! Strategy engine (PV-API) interface.

pub mod client;
pub mod mock;
pub mod types;

pub use client::PvApiClient;
pub use types::{
    PvAllocation, PvPosition, PvTransaction, RebalanceRequest, RebalanceResponse,
    StrategySecurity,
};

/// Errors from the strategy engine.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Http {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {what}: {detail}")]
    Decode { what: String, detail: String },

    #[error("security not found: {0}")]
    NotFound(String),

    #[error("authentication error: {0}")]
    Auth(String),
}

/// The remote service that owns security identities and computes plans.
///
/// Implementations must be `Sync`; identity lookups fan out over threads.
pub trait StrategyEngine: Sync {
    /// Look up a security by ticker (in `/` class form) or composite FIGI.
    fn resolve_security(&self, query: &str) -> Result<StrategySecurity, StrategyError>;

    /// Ask for a rebalance plan for `portfolio_id`.
    fn rebalance(
        &self,
        portfolio_id: &str,
        request: &RebalanceRequest,
    ) -> Result<RebalanceResponse, StrategyError>;
}
