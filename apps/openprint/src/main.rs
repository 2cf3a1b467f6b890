//! OpenPrint Binary
//!
//! Watches the SIP trade stream and logs each symbol's first opening print
//! of the trading day.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin openprint -- symbols.yaml
//! ```
//!
//! The symbol file is a YAML list of tickers; `*` anywhere in the list
//! subscribes to every tradable symbol (and disables the unsubscribe
//! feedback loop, which needs an explicit list to narrow).
//!
//! # Environment Variables
//!
//! ## Required
//! - `ALPACA_KEY`: Alpaca API key
//! - `ALPACA_SECRET`: Alpaca API secret
//!
//! ## Optional
//! - `ALPACA_FEED`: Market data feed - "sip" | "iex" (default: sip)
//! - `OPENPRINT_EVENT_CAPACITY`: Session event channel capacity (default: 1024)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use chrono::SecondsFormat;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use openprint::infrastructure::telemetry;
use openprint::{
    ConfigError, OpeningPrintDetector, SessionConfig, SessionEvent, SubscriptionPlan, Trade,
    TradeStreamSession, UnsubscribeQueue, UnsubscribeWorker, WatcherConfig, load_symbol_file,
};

#[tokio::main]
#[allow(clippy::expect_used)]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();
    telemetry::init();

    tracing::info!("starting openprint watcher");

    // Startup-phase errors are all fatal: there is nothing to recover from
    // before any state exists.
    let config = WatcherConfig::from_env()?;
    let symbol_file = std::env::args()
        .nth(1)
        .ok_or(ConfigError::MissingSymbolFile)?;
    let symbols = load_symbol_file(&symbol_file)?;
    let plan = SubscriptionPlan::from_symbols(symbols);
    log_config(&config, &plan);

    let shutdown_token = CancellationToken::new();

    let (event_tx, event_rx) = mpsc::channel::<SessionEvent>(config.channels.event_capacity);
    let session_config = SessionConfig::for_feed(config.credentials.clone(), config.feed.as_str());
    let (session, session_handle) = TradeStreamSession::new(
        session_config,
        plan.clone(),
        event_tx,
        shutdown_token.clone(),
    );

    // The unsubscribe feedback loop only runs for explicit symbol lists; a
    // wildcard subscription cannot be narrowed symbol-by-symbol.
    let unsubscribe_queue = if plan.supports_unsubscribe() {
        let (queue, queue_rx) = UnsubscribeQueue::bounded(plan.capacity_hint());
        let worker = UnsubscribeWorker::new(
            Arc::new(session_handle),
            queue_rx,
            shutdown_token.clone(),
        );
        tokio::spawn(worker.run());
        Some(queue)
    } else {
        drop(session_handle);
        None
    };

    let detector = OpeningPrintDetector::new(plan.capacity_hint());
    tokio::spawn(async move {
        handle_stream_events(event_rx, detector, unsubscribe_queue).await;
    });

    let session_task = tokio::spawn(session.run());

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        await_shutdown(signal_token).await;
    });

    match session_task.await {
        Ok(Ok(())) => {
            tracing::info!("trade stream closed gracefully");
            Ok(())
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "trade stream terminated");
            Err(err.into())
        }
        Err(err) => {
            tracing::error!(error = %err, "session task failed");
            Err(err.into())
        }
    }
}

/// Drain session events, driving the opening-print detector.
///
/// This is the single serial delivery path: detector state is owned here
/// and touched nowhere else. The loop ends when the session drops its
/// sending half.
async fn handle_stream_events(
    mut rx: mpsc::Receiver<SessionEvent>,
    mut detector: OpeningPrintDetector,
    unsubscribe_queue: Option<UnsubscribeQueue>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            SessionEvent::Connected => {
                tracing::info!("trade stream connected");
            }
            SessionEvent::Subscribed { trades } => {
                tracing::info!(symbols = trades, "subscriptions active");
            }
            SessionEvent::Error(msg) => {
                tracing::error!(error = %msg, "trade stream reported error");
            }
            SessionEvent::Trade(message) => {
                let trade = Trade::from(message);
                if let Some(print) = detector.process(&trade) {
                    tracing::info!(
                        symbol = %print.symbol,
                        trade_time = %print.timestamp.to_rfc3339_opts(SecondsFormat::Nanos, true),
                        conditions = ?print.conditions,
                        price = %print.price,
                        size = print.size,
                        exchange = %print.exchange,
                        tape = %print.tape,
                        id = print.trade_id,
                        "opening print"
                    );
                    if let Some(queue) = &unsubscribe_queue {
                        queue.notify(&print.symbol);
                    }
                }
            }
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &WatcherConfig, plan: &SubscriptionPlan) {
    tracing::info!(
        feed = config.feed.as_str(),
        symbols = plan.capacity_hint(),
        all_symbols = plan.is_all_symbols(),
        unsubscribe_loop = plan.supports_unsubscribe(),
        "configuration loaded"
    );
}

/// Load .env file from the current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
