//! TradeStation v3 request/response types.
//!
//! TradeStation encodes every number as a string and reports per-item errors
//! alongside results, so every response type carries an `Errors` list and the
//! conversions below parse numbers explicitly. Empty strings mean zero.

use serde::{Deserialize, Serialize};

use tradelink::{OrderAction, OrderExecutionRecord, OrderLeg, OrderRequest, OrderStatus};

use crate::error::BrokerError;
use crate::types::{AccountInfo, Balance, BrokerPosition, Quote};

/// Error entry embedded in a response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TsError {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    #[serde(rename = "OrderID")]
    pub order_id: String,
    pub error: String,
    pub message: String,
}

impl std::fmt::Display for TsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Join embedded errors into a single [`BrokerError::Api`], if there are any.
pub fn check_errors(errors: &[TsError]) -> Result<(), BrokerError> {
    if errors.is_empty() {
        return Ok(());
    }
    let joined = errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ");
    Err(BrokerError::Api(joined))
}

// ============================================================================
// Number parsing
// ============================================================================

pub fn parse_decimal(what: &str, value: &str) -> Result<f64, BrokerError> {
    if value.is_empty() {
        return Ok(0.0);
    }
    value.parse::<f64>().map_err(|e| BrokerError::Decode {
        what: what.to_string(),
        detail: format!("'{value}': {e}"),
    })
}

pub fn parse_count(what: &str, value: &str) -> Result<i64, BrokerError> {
    if value.is_empty() {
        return Ok(0);
    }
    value.parse::<i64>().map_err(|e| BrokerError::Decode {
        what: what.to_string(),
        detail: format!("'{value}': {e}"),
    })
}

fn parse_shares(what: &str, value: &str) -> Result<u64, BrokerError> {
    let n = parse_count(what, value)?;
    u64::try_from(n).map_err(|_| BrokerError::Decode {
        what: what.to_string(),
        detail: format!("negative share count {n}"),
    })
}

// ============================================================================
// Accounts & balances
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AccountsResponse {
    pub accounts: Vec<TsAccount>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TsAccount {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    pub alias: String,
    pub account_type: String,
    pub status: String,
}

impl From<TsAccount> for AccountInfo {
    fn from(a: TsAccount) -> Self {
        AccountInfo {
            account_id: a.account_id,
            alias: a.alias,
            account_type: a.account_type,
            status: a.status,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BalancesResponse {
    pub balances: Vec<TsBalance>,
    pub errors: Vec<TsError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TsBalance {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    pub cash_balance: String,
    pub buying_power: String,
    pub equity: String,
    pub market_value: String,
}

impl TsBalance {
    pub fn to_balance(&self) -> Result<Balance, BrokerError> {
        Ok(Balance {
            account_id: self.account_id.clone(),
            cash_balance: parse_decimal("CashBalance", &self.cash_balance)?,
            buying_power: parse_decimal("BuyingPower", &self.buying_power)?,
            equity: parse_decimal("Equity", &self.equity)?,
            market_value: parse_decimal("MarketValue", &self.market_value)?,
        })
    }
}

// ============================================================================
// Positions
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct PositionsResponse {
    pub positions: Vec<TsPosition>,
    pub errors: Vec<TsError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TsPosition {
    pub symbol: String,
    pub quantity: String,
    pub long_short: String,
    pub average_price: String,
    pub market_value: String,
    pub unrealized_profit_loss: String,
}

impl TsPosition {
    pub fn to_position(&self) -> Result<BrokerPosition, BrokerError> {
        let mut quantity = parse_count("Quantity", &self.quantity)?;
        if self.long_short.eq_ignore_ascii_case("short") && quantity > 0 {
            quantity = -quantity;
        }
        Ok(BrokerPosition {
            symbol: self.symbol.clone(),
            quantity,
            average_price: parse_decimal("AveragePrice", &self.average_price)?,
            market_value: parse_decimal("MarketValue", &self.market_value)?,
            unrealized_pnl: parse_decimal("UnrealizedProfitLoss", &self.unrealized_profit_loss)?,
        })
    }
}

// ============================================================================
// Quotes
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct QuotesResponse {
    pub quotes: Vec<TsQuote>,
    pub errors: Vec<TsQuoteError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TsQuote {
    pub symbol: String,
    pub bid: String,
    pub ask: String,
    pub last: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TsQuoteError {
    pub symbol: String,
    pub error: String,
}

impl TsQuote {
    pub fn to_quote(&self) -> Result<Quote, BrokerError> {
        Ok(Quote {
            symbol: self.symbol.clone(),
            bid: parse_decimal("Bid", &self.bid)?,
            ask: parse_decimal("Ask", &self.ask)?,
            last: parse_decimal("Last", &self.last)?,
        })
    }
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TsTimeInForce {
    pub duration: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TsOrderRequest {
    #[serde(rename = "AccountID")]
    pub account_id: String,
    pub limit_price: String,
    pub order_type: &'static str,
    pub quantity: String,
    pub symbol: String,
    pub time_in_force: TsTimeInForce,
    pub trade_action: &'static str,
}

impl From<&OrderRequest> for TsOrderRequest {
    fn from(o: &OrderRequest) -> Self {
        TsOrderRequest {
            account_id: o.account_id.clone(),
            limit_price: format!("{:.2}", o.limit_price.as_dollars()),
            order_type: match o.order_type {
                tradelink::OrderType::Limit => "Limit",
            },
            quantity: o.quantity.to_string(),
            symbol: o.symbol.clone(),
            time_in_force: TsTimeInForce {
                duration: match o.time_in_force {
                    tradelink::TimeInForce::Day => "DAY",
                },
            },
            trade_action: match o.action {
                OrderAction::Buy => "BUY",
                OrderAction::Sell => "SELL",
            },
        }
    }
}

/// Body of `POST /orderexecution/ordergroups`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct OrderGroupRequest {
    pub orders: Vec<TsOrderRequest>,
    #[serde(rename = "Type")]
    pub group_type: &'static str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct OrdersResponse {
    pub orders: Vec<TsOrder>,
    pub errors: Vec<TsError>,
    pub next_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TsOrder {
    #[serde(rename = "OrderID")]
    pub order_id: String,
    pub status: String,
    pub status_description: String,
    /// Present on placement responses instead of a status.
    pub message: String,
    pub legs: Vec<TsOrderLeg>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TsOrderLeg {
    pub symbol: String,
    pub buy_or_sell: String,
    pub quantity_ordered: String,
    pub exec_quantity: String,
    pub quantity_remaining: String,
}

impl TsOrderLeg {
    pub fn to_leg(&self) -> Result<OrderLeg, BrokerError> {
        let action = OrderAction::from_broker(&self.buy_or_sell).ok_or_else(|| {
            BrokerError::Decode {
                what: "BuyOrSell".into(),
                detail: format!("unknown side '{}' for {}", self.buy_or_sell, self.symbol),
            }
        })?;
        Ok(OrderLeg {
            symbol: self.symbol.clone(),
            action,
            quantity_ordered: parse_shares("QuantityOrdered", &self.quantity_ordered)?,
            quantity_filled: parse_shares("ExecQuantity", &self.exec_quantity)?,
            quantity_remaining: parse_shares("QuantityRemaining", &self.quantity_remaining)?,
        })
    }
}

impl TsOrder {
    pub fn to_record(&self) -> Result<OrderExecutionRecord, BrokerError> {
        let status = if self.status.is_empty() {
            OrderStatus::Received
        } else {
            OrderStatus::from_code(&self.status)
        };
        let status_description = if self.status_description.is_empty() {
            self.message.clone()
        } else {
            self.status_description.clone()
        };
        Ok(OrderExecutionRecord {
            order_id: self.order_id.clone(),
            status,
            status_description,
            legs: self
                .legs
                .iter()
                .map(TsOrderLeg::to_leg)
                .collect::<Result<Vec<_>, _>>()?,
        })
    }
}
