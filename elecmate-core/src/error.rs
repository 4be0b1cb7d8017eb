//! Error handling for consultation exchanges.
//!
//! This module provides the centralized error type and result alias shared
//! by the protocol types and the router client. Variants that are shown to
//! end users carry their full, user-facing message; the remaining variants
//! wrap a technical description.
//!
//! # Examples
//!
//! ```rust
//! use elecmate_core::error::{Error, Result};
//!
//! fn require_prompt(prompt: &str) -> Result<()> {
//!     if prompt.trim().is_empty() {
//!         return Err(Error::validation("Prompt cannot be empty"));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Comprehensive error type for consultation operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The hard per-consultation deadline elapsed before the router finished
    #[error("Request timed out after 5 minutes. Please try again.")]
    Timeout,

    /// The router endpoint could not be reached at all
    #[error("Router unavailable. Please wait a moment and try again.")]
    Unavailable,

    /// The router rejected the request with HTTP 429
    #[error("Rate limit exceeded. Please try again in a moment.")]
    RateLimited,

    /// The router rejected the request with HTTP 402
    #[error("AI credits exhausted. Please add credits to continue.")]
    CreditsExhausted,

    /// Any other non-success HTTP status, with the server's own message
    #[error("Router error ({status}): {message}")]
    Status { status: u16, message: String },

    /// Malformed or failed responses at the protocol level
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Failures while reading the response body stream
    #[error("Stream error: {0}")]
    Stream(String),

    /// Request validation errors raised before any network traffic
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for Results with consultation errors.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Creates a new protocol error with the given message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Error::Protocol(msg.into())
    }

    /// Creates a new stream error with the given message.
    pub fn stream(msg: impl Into<String>) -> Self {
        Error::Stream(msg.into())
    }

    /// Creates a new validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
