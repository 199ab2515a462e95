use bon::Builder;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_with::serde_as;

use crate::serde_helpers::{StringFromAny, deserialize_present, deserialize_with_warnings};

/// A reply or push received from the server.
///
/// Every field is optional on the wire; a message without `message_id` cannot be
/// correlated to a request.
#[serde_as]
#[non_exhaustive]
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Builder)]
pub struct InboundMessage {
    /// Correlation id echoed from the request
    #[serde_as(as = "Option<StringFromAny>")]
    #[builder(into)]
    pub message_id: Option<String>,
    /// Command result on success. A `null` result is `Some(Value::Null)`: commands
    /// without a return value answer with `"result": null`.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub result: Option<Value>,
    /// Numeric error code on failure
    pub error_code: Option<i64>,
    /// Free-text detail accompanying an error
    #[builder(into)]
    pub details: Option<String>,
}

impl InboundMessage {
    /// Whether the message settles a command, i.e. carries a result (possibly `null`) or an
    /// error code.
    #[must_use]
    pub fn carries_outcome(&self) -> bool {
        self.result.is_some() || self.error_code.is_some()
    }

    /// Decode `result` into `T`.
    ///
    /// Returns `None` when there is no result or it does not have the shape of `T`.
    #[must_use]
    pub fn result_as<T: DeserializeOwned>(&self) -> Option<T> {
        let value = self.result.clone()?;
        deserialize_with_warnings(value).ok()
    }
}

/// Decode a frame holding either a single message object or an array of them.
pub fn parse_messages(bytes: &[u8]) -> crate::Result<Vec<InboundMessage>> {
    // Handle empty or whitespace-only input (server keepalive messages)
    let trimmed = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map_or(&[][..], |start| &bytes[start..]);

    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.first() == Some(&b'[') {
        Ok(serde_json::from_slice(trimmed)?)
    } else {
        let msg: InboundMessage = serde_json::from_slice(trimmed)?;
        Ok(vec![msg])
    }
}
