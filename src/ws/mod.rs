//! Correlated request/response messaging over a single WebSocket.
//!
//! Each request is tagged with a `message_id`; the server echoes it on the reply and the
//! reply is routed back to the caller awaiting it. One connection is opened lazily and
//! shared by all callers. Subscriptions stay registered after their first reply and are
//! resent once if the connection drops.
//!
//! # Architecture
//!
//! - [`Transport`]: opens sockets and reports their lifecycle as epoch-tagged events
//! - [`ConnectionManager`]: owns the socket and its authentication handshake
//! - [`PendingRequestRegistry`]: in-flight requests keyed by correlation id
//! - [`RequestSender`]: assigns ids, registers, writes and awaits replies
//! - [`Dispatcher`]: routes inbound frames to the registry
//! - [`ReconnectCoordinator`]: fails commands and resubscribes after a disconnect
//! - [`Client`]: wires the above together around one event loop task
//!
//! # Example
//!
//! ```ignore
//! let client = Client::with_authenticator(endpoint, Config::default(), AccessToken::new(token))?;
//! let reply = client.send(&Request::new("get_nodes", json!({}))?).await?;
//! ```

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod reconnect;
pub mod registry;
pub mod sender;
#[cfg(test)]
pub(crate) mod testing;
pub mod traits;
pub mod transport;
pub mod types;

pub use client::{Client, Subscription};
pub use config::Config;
pub use connection::{ConnectionManager, ConnectionState};
pub use dispatch::{DispatchReport, Dispatcher};
pub use reconnect::{ReconnectCoordinator, ReconnectPhase};
pub use registry::PendingRequestRegistry;
pub use sender::{CorrelationIdSource, RequestSender};
#[expect(
    clippy::module_name_repetitions,
    reason = "WsError includes module name for clarity when used outside this module"
)]
pub use error::WsError;
pub use traits::*;
pub use transport::{Transport, TungsteniteTransport};
