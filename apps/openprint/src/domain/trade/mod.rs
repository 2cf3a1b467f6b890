//! Canonical Trade Type
//!
//! The codec-agnostic representation of a single trade event as consumed by
//! the opening-print detector. Wire formats (the Alpaca SIP JSON messages)
//! convert into this type at the infrastructure boundary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single trade event from the feed.
///
/// Immutable once received. Timestamps are monotonically non-decreasing per
/// symbol but not guaranteed globally ordered across symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Ticker symbol (non-empty on a well-behaved feed; an empty symbol is
    /// treated as just another dedup key, never validated here).
    pub symbol: String,

    /// Execution timestamp, nanosecond precision.
    pub timestamp: DateTime<Utc>,

    /// Condition codes describing the circumstances of the trade.
    pub conditions: Vec<String>,

    /// Execution price.
    pub price: Decimal,

    /// Trade size in shares.
    pub size: u32,

    /// Exchange code where the trade executed.
    pub exchange: String,

    /// Reporting tape: "A" (NYSE), "B" (ARCA/regional), "C" (NASDAQ).
    pub tape: String,

    /// Feed-assigned trade identifier, when the feed provides one.
    pub trade_id: Option<i64>,
}
