//! Port Interfaces
//!
//! Interfaces (ports) for external systems following the Hexagonal
//! Architecture pattern. Infrastructure adapters implement these contracts.
//!
//! ## Driven Ports (Outbound)
//!
//! - [`MarketStream`]: subscription changes against the live feed session

use async_trait::async_trait;

/// Errors returned by market-stream operations.
#[derive(Debug, thiserror::Error)]
pub enum MarketStreamError {
    /// The session is no longer accepting commands.
    #[error("stream session closed")]
    SessionClosed,
}

/// Subscription-change surface of the live feed session.
///
/// Unsubscribing is idempotent from the caller's perspective: asking to
/// remove a symbol that is already gone must not fail the session, and
/// callers treat any returned error as recoverable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketStream: Send + Sync {
    /// Stop delivering trade events for `symbol`.
    async fn unsubscribe_trades(&self, symbol: &str) -> Result<(), MarketStreamError>;
}
