use serde_json::{Value, json};
use url::Url;

use super::types::{Command, CommissionResponse};
use crate::Result;
use crate::error::Error;
use crate::ws::config::Config;
use crate::ws::connection::ConnectionState;
use crate::ws::types::request::Request;
use crate::ws::types::response::InboundMessage;
use crate::ws::{self, Authenticator};

/// Client for a Matter server's commissioning commands.
///
/// Every command returns `Ok(None)` when the server could not be reached or did not answer
/// within [`COMMAND_TIMEOUT`](super::types::COMMAND_TIMEOUT), and an error if the connection
/// dropped while the command was in flight.
#[derive(Clone)]
pub struct Client {
    ws: ws::Client,
}

impl Client {
    /// Create a client for `endpoint` without an authentication handshake.
    pub fn new(endpoint: &str, config: Config) -> Result<Self> {
        Ok(Self::from_ws(ws::Client::new(endpoint, config)?))
    }

    /// Create a client that authenticates every new socket with `authenticator`.
    pub fn with_authenticator<A: Authenticator>(
        endpoint: &str,
        config: Config,
        authenticator: A,
    ) -> Result<Self> {
        Ok(Self::from_ws(ws::Client::with_authenticator(
            endpoint,
            config,
            authenticator,
        )?))
    }

    /// Wrap an existing WebSocket client.
    #[must_use]
    pub fn from_ws(ws: ws::Client) -> Self {
        Self { ws }
    }

    /// The underlying WebSocket client, for commands not covered here.
    #[must_use]
    pub fn ws(&self) -> &ws::Client {
        &self.ws
    }

    /// Commission a device from its QR or manual pairing code.
    pub async fn commission_with_code(&self, code: &str) -> Result<Option<CommissionResponse>> {
        if code.trim().is_empty() {
            return Err(Error::validation("pairing code cannot be empty"));
        }

        let reply = self
            .execute(Command::CommissionWithCode, json!({ "code": code }))
            .await?;
        Ok(reply.as_ref().map(CommissionResponse::from_commission))
    }

    /// Commission a device that is already on the network from its setup PIN code.
    pub async fn commission_on_network(&self, setup_pin_code: u32) -> Result<Option<CommissionResponse>> {
        let reply = self
            .execute(
                Command::CommissionOnNetwork,
                json!({ "setup_pin_code": setup_pin_code }),
            )
            .await?;
        Ok(reply.as_ref().map(CommissionResponse::from_commission))
    }

    /// Remove a node from the fabric.
    pub async fn remove_node(&self, node_id: u64) -> Result<Option<CommissionResponse>> {
        let reply = self
            .execute(Command::RemoveNode, json!({ "node_id": node_id }))
            .await?;
        Ok(reply.as_ref().map(CommissionResponse::from_removal))
    }

    async fn execute(&self, command: Command, args: Value) -> Result<Option<InboundMessage>> {
        let request = Request::new(command.to_string(), args)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(%command, "Sending Matter command");

        self.ws
            .send_request(&request, command.timeout(), command.override_id())
            .await
    }

    /// Get the current connection state.
    #[must_use]
    pub fn connection_state(&self) -> ConnectionState {
        self.ws.state()
    }

    /// The WebSocket endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        self.ws.endpoint()
    }

    /// Close the connection. Does not block.
    pub fn shutdown(&self) {
        self.ws.shutdown();
    }
}
