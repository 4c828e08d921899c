//! Error types for nbsync
//!
//! This module defines all error types used throughout the workspace.

use thiserror::Error;

/// Result type alias for nbsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for nbsync
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing run parameters; the run never starts
    #[error("Configuration error: {0}")]
    Config(String),

    /// A peer's domain does not belong to the configured zone
    #[error("Validation error: domain {domain} does not end with .{zone}")]
    Validation {
        /// The offending peer domain
        domain: String,
        /// The configured zone domain
        zone: String,
    },

    /// A peer's address cannot be published as an A record
    #[error("Validation error: domain {domain} has address {address:?}, not an IPv4 address")]
    InvalidAddress {
        /// The peer domain
        domain: String,
        /// The address the peer source reported
        address: String,
    },

    /// Peer source or record store unreachable, or answered with a non-2xx status
    #[error("Connectivity error ({target}): {message}")]
    Connectivity {
        /// Which remote was being contacted ("netbird", "cloudflare", ...)
        target: String,
        /// Error message
        message: String,
    },

    /// A list/create/update/delete call was rejected by the record store
    #[error("Store operation error ({operation}): {message}")]
    StoreOperation {
        /// Operation that failed
        operation: String,
        /// Error message
        message: String,
    },

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limiting errors
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Zone or record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The run observed a cancellation request at a remote-call boundary
    #[error("Run cancelled")]
    Cancelled,

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An inner error wrapped with the operation that produced it
    #[error("{context}: {source}")]
    Context {
        /// What was being done, e.g. "list records for a.example.com"
        context: String,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error for a peer domain outside the zone
    pub fn validation(domain: impl Into<String>, zone: impl Into<String>) -> Self {
        Self::Validation {
            domain: domain.into(),
            zone: zone.into(),
        }
    }

    /// Create a validation error for a peer address that is not IPv4
    pub fn invalid_address(domain: impl Into<String>, address: impl Into<String>) -> Self {
        Self::InvalidAddress {
            domain: domain.into(),
            address: address.into(),
        }
    }

    /// Create a connectivity error
    pub fn connectivity(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connectivity {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a store operation error
    pub fn store_operation(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StoreOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a rate limit error
    pub fn rate_limited(msg: impl Into<String>) -> Self {
        Self::RateLimited(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Wrap this error with the operation that produced it
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping any context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Error::Cancelled)
    }

    /// Whether this error (or the error it wraps) is a validation failure
    pub fn is_validation(&self) -> bool {
        matches!(
            self.root(),
            Error::Validation { .. } | Error::InvalidAddress { .. }
        )
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
