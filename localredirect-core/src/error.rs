//! Error types for localredirect.
//!
//! Discovery errors never reach the request path: every failure degrades to
//! "treat this client as remote". The variants exist so that callers can log
//! and classify what went wrong.

use std::time::Duration;

use thiserror::Error;

/// Result type alias using `RedirectError`.
pub type Result<T> = std::result::Result<T, RedirectError>;

/// Main error type for all localredirect operations.
#[derive(Debug, Error)]
pub enum RedirectError {
    // ═══════════════════════════════════════════════════════════════════════════
    // ROUTER RESPONSE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The response is present but a value does not parse as an IP or CIDR block.
    #[error("Malformed router response: {0}")]
    MalformedResponse(String),

    /// An expected element is absent from an otherwise well-formed response.
    #[error("Missing field in router response: {0}")]
    MissingField(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSPORT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// A router call did not complete within the configured timeout.
    #[error("Router call '{action}' timed out after {timeout:?}")]
    Timeout { action: String, timeout: Duration },

    /// A router call failed at the HTTP level.
    #[error("Router call failed: {0}")]
    Transport(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // DISCOVERY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// None of the discovery calls produced an address.
    #[error("Router returned no usable address")]
    NoUsableData,

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The local redirect target could not be parsed.
    #[error("Invalid local target: {0}")]
    InvalidTarget(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl RedirectError {
    /// Returns true if the next discovery round may succeed where this one failed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RedirectError::Timeout { .. }
                | RedirectError::Transport(_)
                | RedirectError::NoUsableData
        )
    }

    /// Returns true if the router answered but the answer could not be used.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            RedirectError::MalformedResponse(_) | RedirectError::MissingField(_)
        )
    }
}
