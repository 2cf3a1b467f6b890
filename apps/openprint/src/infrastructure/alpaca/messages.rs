//! Alpaca WebSocket Message Types
//!
//! Wire format types for the SIP stock stream, trades only. These map
//! directly to Alpaca's JSON message schemas.
//!
//! # Message Types
//!
//! ## Control Messages
//! - `Success`: Connection/authentication acknowledgment
//! - `Error`: Error response with code and message
//! - `Subscription`: Subscription confirmation
//!
//! ## Data Messages
//! - `Trade`: Real-time stock trades
//!
//! # References
//!
//! - [Stock Streaming](https://docs.alpaca.markets/docs/real-time-stock-pricing-data)

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::trade::Trade;

// =============================================================================
// Control Messages
// =============================================================================

/// Success message indicating connection or authentication succeeded.
///
/// # Wire Format (JSON)
/// ```json
/// {"T": "success", "msg": "connected"}
/// {"T": "success", "msg": "authenticated"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessMessage {
    /// Message type (always "success")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Success message: "connected" or "authenticated"
    pub msg: SuccessKind,
}

/// Kind of success message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuccessKind {
    /// Initial connection established
    Connected,
    /// Authentication successful
    Authenticated,
}

/// Error message with code and description.
///
/// # Wire Format (JSON)
/// ```json
/// {"T": "error", "code": 401, "msg": "not authenticated"}
/// ```
///
/// # Error Codes
/// - 400: Invalid syntax
/// - 401: Not authenticated
/// - 402: Auth failed
/// - 403: Already authenticated
/// - 404: Auth timeout
/// - 405: Symbol limit exceeded
/// - 406: Connection limit exceeded
/// - 407: Slow client
/// - 408: Insufficient subscription
/// - 500: Internal error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    /// Message type (always "error")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Error code
    pub code: i32,

    /// Error message
    pub msg: String,
}

impl ErrorMessage {
    /// Check if this is an authentication error.
    #[must_use]
    pub const fn is_auth_error(&self) -> bool {
        matches!(self.code, 401..=404)
    }

    /// Check if this is a subscription-related error.
    #[must_use]
    pub const fn is_subscription_error(&self) -> bool {
        matches!(self.code, 405 | 408)
    }
}

/// Subscription confirmation message.
///
/// Sent after a subscribe/unsubscribe action to report the full set of
/// active trade subscriptions.
///
/// # Wire Format (JSON)
/// ```json
/// {"T": "subscription", "trades": ["AAPL", "MSFT"]}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionMessage {
    /// Message type (always "subscription")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Currently subscribed trade symbols
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trades: Vec<String>,
}

// =============================================================================
// Data Messages
// =============================================================================

/// Real-time stock trade from the SIP feed.
///
/// # Wire Format (JSON)
/// ```json
/// {
///   "T": "t",
///   "i": 96921,
///   "S": "AAPL",
///   "x": "D",
///   "p": 126.55,
///   "s": 1,
///   "t": "2021-02-22T15:51:44.208Z",
///   "c": ["@", "I"],
///   "z": "C"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTradeMessage {
    /// Message type (always "t")
    #[serde(rename = "T")]
    pub msg_type: String,

    /// Ticker symbol (e.g., "AAPL")
    #[serde(rename = "S")]
    pub symbol: String,

    /// Trade ID (unique per exchange per day; absent on some feeds)
    #[serde(rename = "i", default)]
    pub trade_id: Option<i64>,

    /// Exchange code where the trade executed
    #[serde(rename = "x")]
    pub exchange: String,

    /// Trade price
    #[serde(rename = "p")]
    pub price: Decimal,

    /// Trade size (shares)
    #[serde(rename = "s")]
    pub size: u32,

    /// Trade timestamp (RFC-3339 with nanosecond precision)
    #[serde(rename = "t")]
    pub timestamp: DateTime<Utc>,

    /// Trade condition codes ("O" marks the official opening print)
    #[serde(rename = "c", default)]
    pub conditions: Vec<String>,

    /// Tape: "A" (NYSE), "B" (ARCA/regional), "C" (NASDAQ)
    #[serde(rename = "z")]
    pub tape: String,
}

impl From<StockTradeMessage> for Trade {
    fn from(msg: StockTradeMessage) -> Self {
        Self {
            symbol: msg.symbol,
            timestamp: msg.timestamp,
            conditions: msg.conditions,
            price: msg.price,
            size: msg.size,
            exchange: msg.exchange,
            tape: msg.tape,
            trade_id: msg.trade_id,
        }
    }
}

// =============================================================================
// Outbound Messages (Client -> Server)
// =============================================================================

/// Authentication request for the market data stream.
#[derive(Debug, Clone, Serialize)]
pub struct AuthRequest {
    /// Action: "auth"
    pub action: &'static str,

    /// API key
    pub key: String,

    /// API secret
    pub secret: String,
}

impl AuthRequest {
    /// Create a new authentication request.
    #[must_use]
    pub const fn new(key: String, secret: String) -> Self {
        Self {
            action: "auth",
            key,
            secret,
        }
    }
}

/// Subscription change request, trades only.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubscriptionRequest {
    /// Action: "subscribe" or "unsubscribe"
    pub action: String,

    /// Trade symbols
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trades: Vec<String>,
}

impl SubscriptionRequest {
    /// Create a subscribe request.
    #[must_use]
    pub fn subscribe() -> Self {
        Self {
            action: "subscribe".to_string(),
            ..Default::default()
        }
    }

    /// Create an unsubscribe request.
    #[must_use]
    pub fn unsubscribe() -> Self {
        Self {
            action: "unsubscribe".to_string(),
            ..Default::default()
        }
    }

    /// Set the trade symbols for this request.
    #[must_use]
    pub fn with_trades(mut self, symbols: Vec<String>) -> Self {
        self.trades = symbols;
        self
    }
}

// =============================================================================
// Unified Incoming Message Enum
// =============================================================================

/// Any message the SIP trade stream can deliver to this service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// Connection/authentication success
    Success(SuccessMessage),

    /// Error message
    Error(ErrorMessage),

    /// Subscription confirmation
    Subscription(SubscriptionMessage),

    /// Stock trade
    Trade(StockTradeMessage),
}
