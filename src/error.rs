//! Crate-wide error type.

use thiserror::Error;

/// Errors raised while fetching monitoring data or loading configuration.
///
/// Each variant carries enough context to diagnose the failure without
/// needing to inspect the originating error directly.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The remote server replied with a non-2xx HTTP status code.
    #[error("HTTP error! status: {status} ({url})")]
    Http { status: u16, url: String },

    /// The request never produced a response (DNS, TCP, TLS or timeout).
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// The response body could not be decoded as the expected JSON shape.
    #[error("could not decode response from {url}: {detail}")]
    Decode { url: String, detail: String },

    /// A caller-supplied header name or value is not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The configuration file exists but could not be parsed.
    #[error("invalid configuration in {path}: {detail}")]
    Config { path: String, detail: String },

    /// The HTTP client itself could not be built (TLS backend setup).
    #[error("HTTP client could not be initialised: {0}")]
    Client(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MonitorError>;
