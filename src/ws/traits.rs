//! Collaborator traits for the correlated WebSocket client.

use secrecy::{ExposeSecret as _, SecretString};
use serde::Deserialize;
use serde_json::json;

use super::types::response::{InboundMessage, parse_messages};

/// Message parser trait for converting raw frames to inbound messages.
///
/// # Example
///
/// ```ignore
/// pub struct SimpleParser;
///
/// impl MessageParser for SimpleParser {
///     fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<InboundMessage>> {
///         let msg: InboundMessage = serde_json::from_slice(bytes)?;
///         Ok(vec![msg])
///     }
/// }
/// ```
pub trait MessageParser: Send + Sync + 'static {
    /// Parse incoming bytes into messages.
    ///
    /// Handles both single objects and arrays of messages. May return an empty vec for
    /// keepalive frames.
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<InboundMessage>>;
}

/// The default JSON decoder for `{ message_id, result, error_code, details }` frames.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonParser;

impl MessageParser for JsonParser {
    fn parse(&self, bytes: &[u8]) -> crate::Result<Vec<InboundMessage>> {
        parse_messages(bytes)
    }
}

/// Outcome of the authentication handshake.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthVerdict {
    /// The server accepted the credentials
    Accepted,
    /// The server rejected the credentials; the client will not retry
    Rejected,
}

/// Authentication handshake run on every freshly opened socket.
///
/// The payload is pipelined right after the socket opens. Until
/// [`verdict`](Authenticator::verdict) returns `Some`, inbound text frames are offered to
/// the authenticator before they reach the dispatcher.
pub trait Authenticator: Send + Sync + 'static {
    /// Payload sent immediately after the socket opens. `None` means the connection is
    /// usable as soon as it opens.
    fn auth_message(&self) -> Option<String>;

    /// Inspect an inbound frame received while authenticating. Returns `None` when the
    /// frame is not part of the handshake.
    fn verdict(&self, frame: &str) -> Option<AuthVerdict>;
}

/// No handshake: the connection is considered authenticated once open.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn auth_message(&self) -> Option<String> {
        None
    }

    fn verdict(&self, _frame: &str) -> Option<AuthVerdict> {
        None
    }
}

/// Bearer-token handshake: sends `{"type":"auth","access_token":..}` and waits for
/// `auth_ok` or `auth_invalid`.
///
/// # Security
///
/// The token is held as a [`SecretString`] and only exposed while building the payload.
#[derive(Clone, Debug)]
pub struct AccessToken {
    token: SecretString,
}

impl AccessToken {
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            token: SecretString::from(token),
        }
    }
}

#[derive(Deserialize)]
struct HandshakeFrame<'frame> {
    #[serde(rename = "type")]
    kind: &'frame str,
}

impl Authenticator for AccessToken {
    fn auth_message(&self) -> Option<String> {
        let payload = json!({
            "type": "auth",
            "access_token": self.token.expose_secret(),
        });
        Some(payload.to_string())
    }

    fn verdict(&self, frame: &str) -> Option<AuthVerdict> {
        let handshake: HandshakeFrame<'_> = serde_json::from_str(frame).ok()?;
        match handshake.kind {
            "auth_ok" => Some(AuthVerdict::Accepted),
            "auth_invalid" => Some(AuthVerdict::Rejected),
            _ => None,
        }
    }
}
