//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and the port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (the live feed session).
pub mod ports;

/// Application services: the unsubscribe handoff queue and worker.
pub mod services;
