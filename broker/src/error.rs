//! Broker error types.

/// Errors that can occur during broker operations.
#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
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

    /// Errors the broker reported inside an otherwise successful response.
    #[error("broker rejected request: {0}")]
    Api(String),

    #[error("order error: {0}")]
    Order(String),

    #[error("quote error for {symbol}: {message}")]
    Quote { symbol: String, message: String },

    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("authentication error: {0}")]
    Auth(String),
}
