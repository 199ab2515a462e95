use std::time::Duration;

const DEFAULT_AUTH_TIMEOUT_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_RESUBSCRIBE_DELAY_DURATION: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT_DURATION: Duration = Duration::from_secs(30);
const DEFAULT_BYTES_TIMEOUT_DURATION: Duration = Duration::from_secs(30);
/// "Going away" per RFC 6455 section 7.4.1.
const DEFAULT_CLOSE_CODE: u16 = 1001;
const DEFAULT_CLOSE_REASON: &str = "Session removed by client";

/// Configuration for WebSocket client behavior.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum time [`connect`](super::ConnectionManager::connect) waits for the
    /// authentication outcome after the socket opens
    pub auth_timeout: Duration,
    /// Grace delay between a disconnect and the single reconnect attempt made on
    /// behalf of surviving subscriptions
    pub resubscribe_delay: Duration,
    /// Timeout used by [`Client::send`](super::Client::send) when none is given
    pub request_timeout: Duration,
    /// Upper bound on connecting and writing a binary frame
    pub bytes_timeout: Duration,
    /// Close code sent on [`shutdown`](super::Client::shutdown)
    pub close_code: u16,
    /// Close reason sent on [`shutdown`](super::Client::shutdown)
    pub close_reason: String,
    /// `User-Agent` header presented during the WebSocket upgrade
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            auth_timeout: DEFAULT_AUTH_TIMEOUT_DURATION,
            resubscribe_delay: DEFAULT_RESUBSCRIBE_DELAY_DURATION,
            request_timeout: DEFAULT_REQUEST_TIMEOUT_DURATION,
            bytes_timeout: DEFAULT_BYTES_TIMEOUT_DURATION,
            close_code: DEFAULT_CLOSE_CODE,
            close_reason: DEFAULT_CLOSE_REASON.to_owned(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl Config {
    /// Headers attached to every upgrade request.
    #[must_use]
    pub fn headers(&self) -> Vec<(String, String)> {
        vec![("User-Agent".to_owned(), self.user_agent.clone())]
    }
}
