//! Stream Codec
//!
//! Decodes frames from the SIP stock stream. Alpaca sends JSON arrays
//! where each element is one message object; control messages occasionally
//! arrive as a single object.
//!
//! # Malformed Input Policy
//!
//! A frame that is not valid JSON is an error the session logs and skips.
//! Inside a valid frame, an element with an unknown or unparseable shape is
//! skipped with a warning while the remaining elements are still delivered:
//! one bad event must never take down the stream.

use crate::infrastructure::alpaca::messages::{
    ErrorMessage, FeedMessage, StockTradeMessage, SubscriptionMessage, SuccessMessage,
};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame was neither a JSON array nor an object.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the SIP stock stream.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a text frame into feed messages.
    ///
    /// Elements that cannot be decoded are skipped with a warning; the
    /// frame-level result only fails when the frame itself is not JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON array or object.
    pub fn decode(&self, text: &str) -> Result<Vec<FeedMessage>, CodecError> {
        let trimmed = text.trim();

        if trimmed.starts_with('[') {
            let raw_array: Vec<serde_json::Value> = serde_json::from_str(trimmed)?;
            Ok(raw_array.into_iter().filter_map(decode_element).collect())
        } else if trimmed.starts_with('{') {
            let value: serde_json::Value = serde_json::from_str(trimmed)?;
            Ok(decode_element(value).into_iter().collect())
        } else {
            Err(CodecError::InvalidFormat(format!(
                "expected JSON array or object, got: {}...",
                &trimmed[..trimmed.len().min(50)]
            )))
        }
    }

    /// Encode a value to a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode<T: serde::Serialize>(&self, value: &T) -> Result<String, CodecError> {
        Ok(serde_json::to_string(value)?)
    }
}

/// Decode one frame element, or skip it with a warning.
fn decode_element(value: serde_json::Value) -> Option<FeedMessage> {
    let msg_type = value.get("T").and_then(|v| v.as_str()).map(str::to_owned);

    let decoded = match msg_type.as_deref() {
        Some("success") => {
            serde_json::from_value::<SuccessMessage>(value).map(FeedMessage::Success)
        }
        Some("error") => serde_json::from_value::<ErrorMessage>(value).map(FeedMessage::Error),
        Some("subscription") => {
            serde_json::from_value::<SubscriptionMessage>(value).map(FeedMessage::Subscription)
        }
        Some("t") => serde_json::from_value::<StockTradeMessage>(value).map(FeedMessage::Trade),
        other => {
            tracing::warn!(message_type = other, "skipping unrecognized feed message");
            return None;
        }
    };

    match decoded {
        Ok(message) => Some(message),
        Err(err) => {
            tracing::warn!(
                message_type = msg_type.as_deref(),
                error = %err,
                "skipping unparseable feed message"
            );
            None
        }
    }
}
