//! Broker order requests and the execution records the broker reports back.

use std::fmt;

use crate::types::Price;

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderAction {
    Buy,
    Sell,
}

impl OrderAction {
    /// Parse a broker-reported side ("Buy", "Sell Short", ...). Short-side
    /// variants fold into their direction.
    pub fn from_broker(s: &str) -> Option<OrderAction> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_uppercase();
        match normalized.as_str() {
            "BUY" | "BUYTOCOVER" => Some(OrderAction::Buy),
            "SELL" | "SELLSHORT" => Some(OrderAction::Sell),
            _ => None,
        }
    }

    /// +1 for buys, −1 for sells.
    pub fn sign(self) -> i64 {
        match self {
            OrderAction::Buy => 1,
            OrderAction::Sell => -1,
        }
    }
}

impl fmt::Display for OrderAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderAction::Buy => write!(f, "BUY"),
            OrderAction::Sell => write!(f, "SELL"),
        }
    }
}

/// Order type. Sizing only ever produces limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderType {
    Limit,
}

/// Time in force. Sizing only ever produces day orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeInForce {
    Day,
}

/// A broker-native order request.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderRequest {
    pub account_id: String,
    pub symbol: String,
    pub action: OrderAction,
    pub order_type: OrderType,
    /// Whole shares.
    pub quantity: u64,
    pub limit_price: Price,
    pub time_in_force: TimeInForce,
}

impl OrderRequest {
    /// Limit price × quantity.
    pub fn notional(&self) -> Price {
        self.limit_price.times(self.quantity)
    }
}

/// Broker order status.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OrderStatus {
    Received,
    Queued,
    Open,
    PartialFill,
    PartialFillAlive,
    Filled,
    Canceled,
    CancelSent,
    Rejected,
    Expired,
    Broken,
    /// Any status without a dedicated variant, kept verbatim.
    Other(String),
}

impl OrderStatus {
    /// Map a TradeStation three-letter status code.
    pub fn from_code(code: &str) -> OrderStatus {
        match code {
            "ACK" => OrderStatus::Received,
            "DON" => OrderStatus::Queued,
            "OPN" => OrderStatus::Open,
            "FLP" => OrderStatus::PartialFill,
            "FPR" => OrderStatus::PartialFillAlive,
            "FLL" => OrderStatus::Filled,
            "CAN" => OrderStatus::Canceled,
            "UCN" => OrderStatus::CancelSent,
            "REJ" => OrderStatus::Rejected,
            "EXP" => OrderStatus::Expired,
            "BRO" => OrderStatus::Broken,
            other => OrderStatus::Other(other.to_string()),
        }
    }

    /// Terminal statuses: the broker will not fill any more of the order.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
                | OrderStatus::Broken
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Other(code) => write!(f, "{code}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// One security-level component of an order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderLeg {
    pub symbol: String,
    pub action: OrderAction,
    pub quantity_ordered: u64,
    pub quantity_filled: u64,
    pub quantity_remaining: u64,
}

impl OrderLeg {
    /// Unfilled portion: ordered − filled.
    pub fn unfilled(&self) -> u64 {
        self.quantity_ordered.saturating_sub(self.quantity_filled)
    }
}

/// The broker's view of one order. Polled, never mutated locally.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OrderExecutionRecord {
    pub order_id: String,
    pub status: OrderStatus,
    pub status_description: String,
    pub legs: Vec<OrderLeg>,
}

impl OrderExecutionRecord {
    pub fn is_settled(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        for code in ["FLL", "CAN", "REJ", "EXP", "BRO"] {
            assert!(OrderStatus::from_code(code).is_terminal(), "{code}");
        }
        for code in ["ACK", "DON", "OPN", "FLP", "FPR", "UCN", "SUS"] {
            assert!(!OrderStatus::from_code(code).is_terminal(), "{code}");
        }
    }

    #[test]
    fn unknown_code_kept() {
        assert_eq!(
            OrderStatus::from_code("SUS"),
            OrderStatus::Other("SUS".into())
        );
        assert_eq!(OrderStatus::from_code("SUS").to_string(), "SUS");
        assert_eq!(OrderStatus::Filled.to_string(), "Filled");
    }

    #[test]
    fn broker_sides() {
        assert_eq!(OrderAction::from_broker("Buy"), Some(OrderAction::Buy));
        assert_eq!(OrderAction::from_broker("SELLSHORT"), Some(OrderAction::Sell));
        assert_eq!(OrderAction::from_broker("Sell Short"), Some(OrderAction::Sell));
        assert_eq!(OrderAction::from_broker("Buy to Cover"), Some(OrderAction::Buy));
        assert_eq!(OrderAction::from_broker("HOLD"), None);
    }

    #[test]
    fn leg_unfilled() {
        let leg = OrderLeg {
            symbol: "MSFT".into(),
            action: OrderAction::Buy,
            quantity_ordered: 100,
            quantity_filled: 60,
            quantity_remaining: 40,
        };
        assert_eq!(leg.unfilled(), 40);
    }
}
