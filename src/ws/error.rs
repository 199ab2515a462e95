#![expect(
    clippy::module_name_repetitions,
    reason = "Error types include the module name to indicate their scope"
)]

use std::error::Error as StdError;
use std::fmt;

/// WebSocket error variants.
#[non_exhaustive]
#[derive(Debug)]
pub enum WsError {
    /// Error connecting to or communicating with the WebSocket server
    Connection(tokio_tungstenite::tungstenite::Error),
    /// The server rejected the authentication handshake
    AuthenticationFailed,
    /// The connection is closed and cannot carry the frame
    ConnectionClosed,
    /// The connection dropped while a request was awaiting its reply
    ConnectionLost,
    /// Another request with the same correlation id is still pending
    DuplicateId(String),
    /// The server did not answer the authentication handshake in time
    Timeout,
}

impl fmt::Display for WsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(e) => write!(f, "WebSocket connection error: {e}"),
            Self::AuthenticationFailed => write!(f, "WebSocket authentication failed"),
            Self::ConnectionClosed => write!(f, "WebSocket connection closed"),
            Self::ConnectionLost => write!(f, "WebSocket connection lost while awaiting reply"),
            Self::DuplicateId(id) => write!(f, "Request {id} is already pending"),
            Self::Timeout => write!(f, "WebSocket authentication timed out"),
        }
    }
}

impl StdError for WsError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Connection(e) => Some(e),
            _ => None,
        }
    }
}

// Integration with main Error type
impl From<WsError> for crate::error::Error {
    fn from(e: WsError) -> Self {
        let kind = match e {
            WsError::AuthenticationFailed => crate::error::Kind::Authorization,
            _ => crate::error::Kind::WebSocket,
        };
        crate::error::Error::with_source(kind, e)
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for crate::error::Error {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        crate::error::Error::with_source(crate::error::Kind::WebSocket, WsError::Connection(e))
    }
}
