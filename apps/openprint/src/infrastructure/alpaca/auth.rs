//! Alpaca WebSocket Authentication
//!
//! Handles the authentication handshake for Alpaca's market data streams.
//! Alpaca requires authentication within 10 seconds of connection
//! establishment.
//!
//! # Authentication Flow
//!
//! 1. Connect to WebSocket endpoint
//! 2. Receive `{"T":"success","msg":"connected"}` from server
//! 3. Send `{"action":"auth","key":"...","secret":"..."}`
//! 4. Receive `{"T":"success","msg":"authenticated"}` or an error
//!
//! # Error Codes
//!
//! - 401: Not authenticated
//! - 402: Authentication failed (invalid credentials)
//! - 403: Already authenticated
//! - 404: Authentication timeout (>10 seconds)

use thiserror::Error;

use super::messages::{AuthRequest, ErrorMessage, SuccessKind, SuccessMessage};
use crate::infrastructure::config::Credentials;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during authentication.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Not authenticated (must authenticate before subscribing).
    #[error("not authenticated: must authenticate before making requests")]
    NotAuthenticated,

    /// Authentication failed (invalid credentials).
    #[error("authentication failed: invalid API key or secret")]
    InvalidCredentials,

    /// Already authenticated (connection was already authenticated).
    #[error("already authenticated: connection is already authenticated")]
    AlreadyAuthenticated,

    /// Authentication timeout (took longer than 10 seconds).
    #[error("authentication timeout: must authenticate within 10 seconds")]
    Timeout,

    /// Connection limit exceeded.
    #[error("connection limit exceeded: too many concurrent connections")]
    ConnectionLimitExceeded,

    /// Unexpected error from server.
    #[error("server error ({code}): {message}")]
    ServerError {
        /// Error code from server
        code: i32,
        /// Error message from server
        message: String,
    },
}

impl From<&ErrorMessage> for AuthError {
    fn from(err: &ErrorMessage) -> Self {
        match err.code {
            401 => Self::NotAuthenticated,
            402 => Self::InvalidCredentials,
            403 => Self::AlreadyAuthenticated,
            404 => Self::Timeout,
            406 => Self::ConnectionLimitExceeded,
            code => Self::ServerError {
                code,
                message: err.msg.clone(),
            },
        }
    }
}

// =============================================================================
// Authentication State
// =============================================================================

/// Current state of authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    /// Not yet connected or authentication not started.
    #[default]
    Disconnected,

    /// Connected but not authenticated.
    Connected,

    /// Authentication request sent, awaiting response.
    Authenticating,

    /// Successfully authenticated.
    Authenticated,

    /// Authentication failed.
    Failed,
}

impl AuthState {
    /// Check if currently authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }

    /// Check if ready to authenticate (connected but not yet authenticated).
    #[must_use]
    pub const fn can_authenticate(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

// =============================================================================
// Authentication Handler
// =============================================================================

/// Authentication state machine for the market data WebSocket.
///
/// Tracks the handshake state and turns incoming control messages into
/// state transitions.
#[derive(Debug)]
pub struct AuthHandler {
    credentials: Credentials,
    state: AuthState,
}

impl AuthHandler {
    /// Create a new authentication handler.
    #[must_use]
    pub const fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: AuthState::Disconnected,
        }
    }

    /// Get the current authentication state.
    #[must_use]
    pub const fn state(&self) -> AuthState {
        self.state
    }

    /// Check if currently authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Create the authentication request to send over the socket, marking
    /// the handshake as in flight.
    #[must_use]
    pub fn create_auth_request(&mut self) -> AuthRequest {
        self.state = AuthState::Authenticating;
        AuthRequest::new(
            self.credentials.api_key().to_owned(),
            self.credentials.api_secret().to_owned(),
        )
    }

    /// Process a success message from the server.
    ///
    /// # Returns
    ///
    /// - `true` if authentication is now complete
    /// - `false` if this was just the connection acknowledgment (the caller
    ///   should send the auth request next)
    pub const fn on_success(&mut self, msg: &SuccessMessage) -> bool {
        match msg.msg {
            SuccessKind::Connected => {
                self.state = AuthState::Connected;
                false
            }
            SuccessKind::Authenticated => {
                self.state = AuthState::Authenticated;
                true
            }
        }
    }

    /// Process an error message from the server.
    ///
    /// Marks the handshake failed and returns the corresponding error.
    pub fn on_error(&mut self, msg: &ErrorMessage) -> AuthError {
        self.state = AuthState::Failed;
        AuthError::from(msg)
    }
}
