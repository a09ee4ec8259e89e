//! Error types for the eventing client.

use gena_transport::TransportError;
use thiserror::Error;

/// Errors reported by subscription operations and NOTIFY processing.
#[derive(Debug, Clone, Error)]
pub enum GenaError {
    /// The client handle does not refer to a registered client
    #[error("no such client handle")]
    BadHandle,

    /// No subscription with the given SID exists for this client
    #[error("no such subscription")]
    BadSid,

    /// The event URL could not be parsed or is not plain HTTP
    #[error("invalid event URL: {0}")]
    InvalidUrl(String),

    /// The publisher could not be reached
    #[error("connection failed: {0}")]
    SocketConnect(String),

    /// The publisher refused a SUBSCRIBE
    #[error("SUBSCRIBE rejected with HTTP {0}")]
    SubscribeUnaccepted(u16),

    /// The publisher refused an UNSUBSCRIBE
    #[error("UNSUBSCRIBE rejected with HTTP {0}")]
    UnsubscribeUnaccepted(u16),

    /// A 200 subscription response was missing required headers
    #[error("malformed subscription response: {0}")]
    BadResponse(String),

    /// A property-set document could not be parsed
    #[error("property set parse failed: {0}")]
    ParseFailed(String),

    /// A renewal timer could not be queued
    ///
    /// Kept under its classic UPnP name; in this implementation it is
    /// produced only when the scheduler has already shut down.
    #[error("out of resources scheduling renewal")]
    OutOfMemory,

    /// The configuration failed validation
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<TransportError> for GenaError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::InvalidUrl(msg) => GenaError::InvalidUrl(msg),
            TransportError::SocketConnect(msg) => GenaError::SocketConnect(msg),
            TransportError::SubscribeUnaccepted(code) => GenaError::SubscribeUnaccepted(code),
            TransportError::UnsubscribeUnaccepted(code) => GenaError::UnsubscribeUnaccepted(code),
            TransportError::BadResponse(msg) => GenaError::BadResponse(msg),
        }
    }
}

/// Convenience type alias for Results using GenaError.
pub type Result<T> = std::result::Result<T, GenaError>;
