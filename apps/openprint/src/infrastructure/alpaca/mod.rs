//! Alpaca WebSocket Adapter
//!
//! Implements the WebSocket session for Alpaca's SIP stock stream, trades
//! only: wire message types, the JSON codec, the authentication handshake,
//! and the connection loop that delivers trades to the event-processing
//! path.

pub mod auth;
pub mod codec;
pub mod messages;
pub mod session;

pub use auth::{AuthError, AuthHandler, AuthState};
pub use codec::{CodecError, JsonCodec};
pub use messages::{
    AuthRequest, ErrorMessage, FeedMessage, StockTradeMessage, SubscriptionMessage,
    SubscriptionRequest, SuccessKind, SuccessMessage,
};
pub use session::{
    SessionCommand, SessionConfig, SessionError, SessionEvent, SessionHandle, TradeStreamSession,
};
