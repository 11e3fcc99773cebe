//! Error types for the sentsync system
//!
//! One taxonomy covers both protocols: the plaintext Sentinel query and the
//! Kubernetes API call. The reconciler only ever logs these and moves on to
//! the next cycle; none of them is fatal past startup.

use thiserror::Error;

/// Result type alias for sentsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the sentsync system
#[derive(Error, Debug)]
pub enum Error {
    /// Network connect/read/write/timeout failures on either protocol
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed or truncated Sentinel reply
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The authority answered with a known-unusable sentinel value
    /// (a loopback master address means Sentinel is reporting itself)
    #[error("stale data: {0}")]
    StaleData(String),

    /// Reply fields present but not a valid IP/port pair
    #[error("address parse error: {0}")]
    AddressParse(String),

    /// Credential material (token, namespace, CA cert) unreadable
    #[error("credential error: {0}")]
    Credential(String),

    /// Control plane rejected the request
    #[error("control plane returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or status text
        message: String,
    },

    /// Configuration errors (startup-time only)
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a stale-data error
    pub fn stale_data(msg: impl Into<String>) -> Self {
        Self::StaleData(msg.into())
    }

    /// Create an address parse error
    pub fn address_parse(msg: impl Into<String>) -> Self {
        Self::AddressParse(msg.into())
    }

    /// Create a credential error
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Create an HTTP error from a status code and response text
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error is transient and expected to clear on a later cycle
    ///
    /// Transient failures are logged at `warn`; the rest at `error`.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::StaleData(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
