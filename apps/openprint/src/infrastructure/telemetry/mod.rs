//! Tracing Initialization
//!
//! Structured logging via `tracing` with an environment-driven filter.
//! Every record the watcher emits (opening prints, day rollovers,
//! unsubscribe failures) flows through this subscriber as a structured
//! event.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Filter directives (the service itself defaults to `info`)

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Initialize the tracing subscriber.
///
/// Call once at startup, before any other work logs.
#[allow(clippy::expect_used)]
pub fn init() {
    let env_filter = EnvFilter::from_default_env()
        .add_directive(
            "openprint=info"
                .parse()
                .expect("static directive 'openprint=info' is valid"),
        )
        .add_directive(
            "tungstenite=warn"
                .parse()
                .expect("static directive 'tungstenite=warn' is valid"),
        );

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
