//! SIP Trade Stream Session
//!
//! Connects to Alpaca's SIP (Securities Information Processor) stream and
//! delivers stock trades to the event-processing loop, strictly one at a
//! time.
//!
//! # Stream URL
//!
//! - `wss://stream.data.alpaca.markets/v2/sip` (or `/v2/iex`)
//!
//! # Protocol
//!
//! Messages are JSON-encoded arrays of market data objects. The session
//! authenticates, subscribes to trades for the configured plan, then
//! forwards every trade until cancelled or the connection terminates.
//! Subscription changes requested mid-run (the unsubscribe feedback loop)
//! arrive on a command channel and are written to the socket from the
//! session loop itself, so the socket has exactly one writer.
//!
//! There is no automatic reconnection: a terminal connection failure is
//! returned to the caller, which treats it as fatal.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use super::auth::AuthHandler;
use super::codec::JsonCodec;
use super::messages::{FeedMessage, StockTradeMessage, SubscriptionRequest};
use crate::application::ports::{MarketStream, MarketStreamError};
use crate::domain::subscription::SubscriptionPlan;
use crate::infrastructure::config::Credentials;

/// Capacity of the command channel between handles and the session loop.
const COMMAND_CHANNEL_CAPACITY: usize = 64;

// =============================================================================
// Error Type
// =============================================================================

/// Errors that can occur in the trade stream session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    ConnectionFailed(String),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Authentication failed.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(#[from] super::auth::AuthError),

    /// The initial subscribe request was rejected.
    #[error("initial subscription rejected ({code}): {msg}")]
    SubscriptionRejected {
        /// Error code from the feed.
        code: i32,
        /// Error message from the feed.
        msg: String,
    },

    /// Connection closed.
    #[error("connection closed")]
    ConnectionClosed,
}

// =============================================================================
// Session Events and Commands
// =============================================================================

/// Events delivered to the processing loop, one at a time.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Successfully connected and authenticated.
    Connected,
    /// Subscription confirmation with the active trade-symbol count.
    Subscribed {
        /// Number of symbols currently subscribed for trades.
        trades: usize,
    },
    /// A stock trade.
    Trade(StockTradeMessage),
    /// Non-fatal error reported by the feed after startup.
    Error(String),
}

/// Subscription changes requested while the session is running.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Stop delivering trades for one symbol.
    UnsubscribeTrades(String),
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Configuration for the trade stream session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL.
    pub url: String,
    /// API credentials.
    pub credentials: Credentials,
    /// Interval between liveness pings.
    pub ping_interval: Duration,
    /// Time without any inbound frame before the connection is considered
    /// dead.
    pub stale_timeout: Duration,
}

impl SessionConfig {
    /// Create a new configuration.
    #[must_use]
    pub const fn new(url: String, credentials: Credentials) -> Self {
        Self {
            url,
            credentials,
            ping_interval: Duration::from_secs(20),
            stale_timeout: Duration::from_secs(60),
        }
    }

    /// Create configuration for a named market data feed ("sip" or "iex").
    ///
    /// Market data streams always use production URLs; the same data flows
    /// whether the account trades paper or live.
    #[must_use]
    pub fn for_feed(credentials: Credentials, feed: &str) -> Self {
        Self::new(
            format!("wss://stream.data.alpaca.markets/v2/{feed}"),
            credentials,
        )
    }
}

// =============================================================================
// Session
// =============================================================================

/// SIP WebSocket session for stock trades.
///
/// Manages the connection lifecycle: the authentication handshake, the
/// initial subscription, liveness pings, runtime unsubscribe commands, and
/// serialized event delivery.
pub struct TradeStreamSession {
    config: SessionConfig,
    plan: SubscriptionPlan,
    event_tx: mpsc::Sender<SessionEvent>,
    command_rx: mpsc::Receiver<SessionCommand>,
    cancel: CancellationToken,
}

impl TradeStreamSession {
    /// Create a session and the handle used to issue commands to it.
    #[must_use]
    pub fn new(
        config: SessionConfig,
        plan: SubscriptionPlan,
        event_tx: mpsc::Sender<SessionEvent>,
        cancel: CancellationToken,
    ) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        (
            Self {
                config,
                plan,
                event_tx,
                command_rx,
                cancel,
            },
            SessionHandle { command_tx },
        )
    }

    /// Run the session until cancellation or a terminal failure.
    ///
    /// Returns `Ok(())` only for a cancellation-driven shutdown; any other
    /// termination is an error the caller treats as fatal.
    pub async fn run(self) -> Result<(), SessionError> {
        let Self {
            config,
            plan,
            event_tx,
            mut command_rx,
            cancel,
        } = self;

        tracing::info!(url = %config.url, "connecting to trade stream");
        let (ws_stream, _response) = tokio_tungstenite::connect_async(&config.url).await?;
        let (mut write, mut read) = ws_stream.split();

        let mut conn = StreamState {
            codec: JsonCodec::new(),
            plan,
            event_tx,
            auth: AuthHandler::new(config.credentials.clone()),
            subscribed: false,
        };

        let mut ping_timer = tokio::time::interval(config.ping_interval);
        ping_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_inbound = Instant::now();
        let mut commands_open = true;

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("trade stream session cancelled");
                    let _ = write.send(Message::Close(None)).await;
                    return Ok(());
                }
                _ = ping_timer.tick() => {
                    if last_inbound.elapsed() > config.stale_timeout {
                        tracing::warn!("no traffic from trade stream within stale timeout");
                        return Err(SessionError::ConnectionClosed);
                    }
                    write.send(Message::Ping(Vec::new().into())).await?;
                }
                command = command_rx.recv(), if commands_open => {
                    match command {
                        Some(command) => conn.handle_command(command, &mut write).await?,
                        // Every handle is gone; disable this branch so the
                        // closed channel does not busy-wait the loop.
                        None => commands_open = false,
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            last_inbound = Instant::now();
                            conn.handle_frame(&text, &mut write).await?;
                        }
                        Some(Ok(Message::Pong(_))) => {
                            last_inbound = Instant::now();
                        }
                        Some(Ok(Message::Ping(data))) => {
                            last_inbound = Instant::now();
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            tracing::info!("server sent close frame");
                            return Err(SessionError::ConnectionClosed);
                        }
                        Some(Ok(_)) => {
                            // Ignore other message types
                        }
                        Some(Err(e)) => return Err(e.into()),
                        None => {
                            tracing::info!("trade stream ended");
                            return Err(SessionError::ConnectionClosed);
                        }
                    }
                }
            }
        }
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Per-connection protocol state: the auth handshake and the subscription
/// confirmation flag that decides whether feed errors are still terminal.
struct StreamState {
    codec: JsonCodec,
    plan: SubscriptionPlan,
    event_tx: mpsc::Sender<SessionEvent>,
    auth: AuthHandler,
    subscribed: bool,
}

impl StreamState {
    /// Handle a text frame from the WebSocket.
    async fn handle_frame<W>(&mut self, text: &str, write: &mut W) -> Result<(), SessionError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        let messages = match self.codec.decode(text) {
            Ok(messages) => messages,
            Err(err) => {
                // One bad frame must never take the stream down.
                tracing::warn!(error = %err, "skipping undecodable frame");
                return Ok(());
            }
        };

        for message in messages {
            match message {
                FeedMessage::Success(success) => {
                    if self.auth.on_success(&success) {
                        tracing::info!("trade stream authenticated");
                        let _ = self.event_tx.send(SessionEvent::Connected).await;

                        let request = SubscriptionRequest::subscribe()
                            .with_trades(self.plan.subscribe_symbols());
                        self.send_request(write, &request).await?;
                    } else if self.auth.state().can_authenticate() {
                        let auth_request = self.auth.create_auth_request();
                        let json = self.codec.encode(&auth_request).map_err(|e| {
                            SessionError::ConnectionFailed(format!("failed to serialize auth: {e}"))
                        })?;

                        write.send(Message::Text(json.into())).await.map_err(|e| {
                            SessionError::ConnectionFailed(format!("failed to send auth: {e}"))
                        })?;
                    }
                }
                FeedMessage::Error(error) => {
                    if !self.auth.is_authenticated() {
                        return Err(self.auth.on_error(&error).into());
                    }

                    if !self.subscribed {
                        // The initial subscribe was rejected; nothing will
                        // ever flow on this connection.
                        return Err(SessionError::SubscriptionRejected {
                            code: error.code,
                            msg: error.msg,
                        });
                    }

                    tracing::error!(code = error.code, msg = %error.msg, "trade stream error");
                    let _ = self.event_tx.send(SessionEvent::Error(error.msg)).await;
                }
                FeedMessage::Subscription(sub) => {
                    self.subscribed = true;
                    tracing::debug!(trades = sub.trades.len(), "subscription confirmed");
                    let _ = self
                        .event_tx
                        .send(SessionEvent::Subscribed {
                            trades: sub.trades.len(),
                        })
                        .await;
                }
                FeedMessage::Trade(trade) => {
                    let _ = self.event_tx.send(SessionEvent::Trade(trade)).await;
                }
            }
        }

        Ok(())
    }

    /// Apply a command from a session handle.
    ///
    /// A WebSocket write failure here is a terminal connection error; a
    /// feed-side rejection of the change comes back as an error frame and
    /// is handled as a recoverable stream error instead.
    async fn handle_command<W>(
        &mut self,
        command: SessionCommand,
        write: &mut W,
    ) -> Result<(), SessionError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        match command {
            SessionCommand::UnsubscribeTrades(symbol) => {
                tracing::debug!(symbol = %symbol, "sending unsubscribe request");
                let request = SubscriptionRequest::unsubscribe().with_trades(vec![symbol]);
                self.send_request(write, &request).await
            }
        }
    }

    /// Send a subscription change request.
    async fn send_request<W>(
        &self,
        write: &mut W,
        request: &SubscriptionRequest,
    ) -> Result<(), SessionError>
    where
        W: SinkExt<Message> + Unpin,
        W::Error: std::fmt::Display,
    {
        let json = self.codec.encode(request).map_err(|e| {
            SessionError::ConnectionFailed(format!("failed to serialize subscription request: {e}"))
        })?;

        write.send(Message::Text(json.into())).await.map_err(|e| {
            SessionError::ConnectionFailed(format!("failed to send subscription request: {e}"))
        })?;

        Ok(())
    }
}

// =============================================================================
// Session Handle
// =============================================================================

/// Cloneable handle for issuing commands to a running session.
///
/// This is the concrete [`MarketStream`] implementation: unsubscribes are
/// forwarded to the session loop, which owns the socket writer.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    command_tx: mpsc::Sender<SessionCommand>,
}

#[async_trait]
impl MarketStream for SessionHandle {
    async fn unsubscribe_trades(&self, symbol: &str) -> Result<(), MarketStreamError> {
        self.command_tx
            .send(SessionCommand::UnsubscribeTrades(symbol.to_owned()))
            .await
            .map_err(|_| MarketStreamError::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> Credentials {
        Credentials::new("key".to_string(), "secret".to_string())
    }

    #[test]
    fn config_for_sip_feed() {
        let config = SessionConfig::for_feed(credentials(), "sip");
        assert_eq!(config.url, "wss://stream.data.alpaca.markets/v2/sip");
    }

    #[test]
    fn config_for_iex_feed() {
        let config = SessionConfig::for_feed(credentials(), "iex");
        assert_eq!(config.url, "wss://stream.data.alpaca.markets/v2/iex");
    }

    #[tokio::test]
    async fn handle_forwards_unsubscribe_command() {
        let (event_tx, _event_rx) = mpsc::channel(8);
        let plan = SubscriptionPlan::from_symbols(vec!["AAPL".to_string()]);
        let (mut session, handle) = TradeStreamSession::new(
            SessionConfig::for_feed(credentials(), "sip"),
            plan,
            event_tx,
            CancellationToken::new(),
        );

        handle.unsubscribe_trades("AAPL").await.unwrap();

        let command = session.command_rx.recv().await.unwrap();
        assert!(matches!(
            command,
            SessionCommand::UnsubscribeTrades(symbol) if symbol == "AAPL"
        ));
    }

    #[tokio::test]
    async fn handle_reports_closed_session() {
        let (event_tx, _event_rx) = mpsc::channel(8);
        let plan = SubscriptionPlan::from_symbols(vec!["AAPL".to_string()]);
        let (session, handle) = TradeStreamSession::new(
            SessionConfig::for_feed(credentials(), "sip"),
            plan,
            event_tx,
            CancellationToken::new(),
        );

        drop(session);

        let err = handle.unsubscribe_trades("AAPL").await.unwrap_err();
        assert!(matches!(err, MarketStreamError::SessionClosed));
    }
}
