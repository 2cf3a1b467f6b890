#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::default_trait_access
    )
)]

//! OpenPrint - Opening Print Watcher
//!
//! Watches a live SIP trade stream and emits exactly one structured record
//! per symbol per trading day: the symbol's first trade carrying the
//! official-open condition code. Once a symbol's opening print has been
//! seen, the watcher unsubscribes that symbol so the feed stops delivering
//! events nobody needs anymore.
//!
//! # Layers (inside -> outside)
//!
//! - **Domain**: The pure state machine, no I/O
//!   - `trade`: canonical trade event type
//!   - `opening`: filter, day window, per-day dedup, detector composition
//!   - `subscription`: symbol list vs. wildcard subscription planning
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: the `MarketStream` interface the watcher drives
//!   - `services`: the unsubscribe handoff queue and worker
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `alpaca`: WebSocket session for the SIP trade stream
//!   - `config`: environment settings and symbol-file loading
//!   - `telemetry`: tracing subscriber setup
//!
//! # Data Flow
//!
//! ```text
//! Alpaca SIP WS ──► TradeStreamSession ──► event loop ──► OpeningPrintDetector
//!                        ▲                                       │ first match
//!                        │ unsubscribe command                   ▼
//!                        └─────────── UnsubscribeWorker ◄── bounded queue
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - The opening-print state machine, no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::opening::{
    DayWindow, OpeningDedup, OpeningPrint, OpeningPrintDetector, is_opening_trade,
};
pub use domain::subscription::{DEFAULT_SIP_SYMBOL_COUNT, SubscriptionPlan, WILDCARD};
pub use domain::trade::Trade;

// Application ports and services
pub use application::ports::{MarketStream, MarketStreamError};
pub use application::services::{UnsubscribeQueue, UnsubscribeWorker};

// Infrastructure config
pub use infrastructure::config::{
    ChannelSettings, ConfigError, Credentials, DataFeed, WatcherConfig, load_symbol_file,
};

// Alpaca session (for integration tests)
pub use infrastructure::alpaca::messages::{
    ErrorMessage, FeedMessage, StockTradeMessage, SubscriptionMessage, SuccessMessage,
};
pub use infrastructure::alpaca::session::{
    SessionCommand, SessionConfig, SessionError, SessionEvent, SessionHandle, TradeStreamSession,
};

// Telemetry
pub use infrastructure::telemetry::init as init_telemetry;
