use thiserror::Error;

/// Errors produced while issuing SUBSCRIBE/UNSUBSCRIBE requests.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The event URL could not be parsed or is not plain HTTP
    #[error("invalid event URL: {0}")]
    InvalidUrl(String),

    /// The publisher could not be reached, or no local address could be
    /// selected for the callback
    #[error("connection failed: {0}")]
    SocketConnect(String),

    /// The publisher answered a SUBSCRIBE with a non-200 status
    #[error("SUBSCRIBE rejected with HTTP {0}")]
    SubscribeUnaccepted(u16),

    /// The publisher answered an UNSUBSCRIBE with a non-200 status
    #[error("UNSUBSCRIBE rejected with HTTP {0}")]
    UnsubscribeUnaccepted(u16),

    /// A 200 response was missing or mangled the SID/TIMEOUT headers
    #[error("malformed subscription response: {0}")]
    BadResponse(String),
}

/// Convenience type alias for Results using TransportError.
pub type Result<T> = std::result::Result<T, TransportError>;
