//! Shared broker types: accounts, balances, positions, quotes.
//!
//! Amounts are dollars as the broker reports them. Conversion to cents
//! happens in the core crate when orders are sized.

/// Brokerage account.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountInfo {
    pub account_id: String,
    pub alias: String,
    pub account_type: String,
    pub status: String,
}

/// Account balances.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Balance {
    pub account_id: String,
    pub cash_balance: f64,
    pub buying_power: f64,
    pub equity: f64,
    pub market_value: f64,
}

/// Broker-level position, keyed by the broker's ticker symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct BrokerPosition {
    pub symbol: String,
    /// Positive = long, negative = short.
    pub quantity: i64,
    pub average_price: f64,
    pub market_value: f64,
    pub unrealized_pnl: f64,
}

/// Live quote.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub symbol: String,
    pub bid: f64,
    pub ask: f64,
    pub last: f64,
}

impl Quote {
    /// Bid/ask midpoint.
    pub fn midpoint(&self) -> f64 {
        tradelink::midpoint(self.bid, self.ask)
    }
}
