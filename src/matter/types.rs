use std::time::Duration;

use bon::Builder;
use serde::Deserialize;

use crate::ws::types::response::InboundMessage;

/// How long a Matter command waits for its reply.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Matter server commands.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    /// Commission a device from its QR or manual pairing code
    CommissionWithCode,
    /// Commission a device already on the network from its setup PIN
    CommissionOnNetwork,
    /// Remove a node from the fabric
    RemoveNode,
}

impl Command {
    /// Fixed correlation id the command is sent under, if it does not use a generated one.
    #[must_use]
    pub const fn override_id(self) -> Option<&'static str> {
        match self {
            Self::RemoveNode => Some("remove_node"),
            Self::CommissionWithCode | Self::CommissionOnNetwork => None,
        }
    }

    #[must_use]
    pub const fn timeout(self) -> Duration {
        COMMAND_TIMEOUT
    }
}

/// Outcome of a commissioning or removal command.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
pub struct CommissionResponse {
    /// Whether the server reported success
    pub success: bool,
    /// Id of the commissioned node
    pub node_id: Option<u64>,
    /// Error code reported by the server
    pub error_code: Option<i64>,
    /// Error detail reported by the server
    #[builder(into)]
    pub details: Option<String>,
}

#[derive(Deserialize)]
struct CommissionedNode {
    node_id: serde_json::Number,
}

impl CommissionedNode {
    /// Integral node ids pass through; a float id such as `42.0` is truncated toward zero.
    #[expect(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "Negative and non-finite ids are filtered out before the cast"
    )]
    fn node_id(&self) -> Option<u64> {
        self.node_id.as_u64().or_else(|| {
            self.node_id
                .as_f64()
                .filter(|id| id.is_finite() && *id >= 0.0)
                .map(|id| id as u64)
        })
    }
}

impl CommissionResponse {
    /// Map the reply to a commissioning command: success means a result is present, even
    /// a `null` one.
    #[must_use]
    pub fn from_commission(reply: &InboundMessage) -> Self {
        Self {
            success: reply.result.is_some(),
            node_id: reply
                .result_as::<CommissionedNode>()
                .and_then(|node| node.node_id()),
            error_code: reply.error_code,
            details: reply.details.clone(),
        }
    }

    /// Map the reply to `remove_node`: success means no error code.
    #[must_use]
    pub fn from_removal(reply: &InboundMessage) -> Self {
        Self {
            success: reply.error_code.is_none(),
            node_id: None,
            error_code: reply.error_code,
            details: reply.details.clone(),
        }
    }
}
