#![cfg_attr(doc, doc = include_str!("../README.md"))]

pub mod error;
pub mod matter;
pub(crate) mod serde_helpers;
pub mod ws;

use crate::error::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Default port the Matter server listens on for WebSocket clients.
pub const DEFAULT_PORT: u16 = 5580;

/// Environment variable conventionally holding the Matter server URL.
pub const SERVER_URL_VAR: &str = "MATTER_SERVER_URL";

/// Rewrite an `http(s)://` base URL into its `ws(s)://` equivalent and validate it.
///
/// URLs that already use a WebSocket scheme are returned unchanged.
pub fn websocket_url(endpoint: &str) -> Result<url::Url> {
    let rewritten = if let Some(rest) = endpoint.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = endpoint.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        endpoint.to_owned()
    };

    let url = url::Url::parse(&rewritten)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(Error::validation(format!(
            "unsupported WebSocket scheme `{other}` in {endpoint}"
        ))),
    }
}
