//! Domain Layer - The opening-print state machine.
//!
//! This layer holds the per-event state transition and the types it
//! consumes and produces. Everything here is pure Rust state with no I/O;
//! the single event-delivery task owns the mutable pieces, so nothing in
//! this layer needs a lock.

/// Canonical trade event type.
pub mod trade;

/// Opening-print detection: filter, day window, dedup, composition.
pub mod opening;

/// Subscription planning: explicit symbol lists vs. the wildcard.
pub mod subscription;
