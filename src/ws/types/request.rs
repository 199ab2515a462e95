use bon::Builder;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::Result;
use crate::error::Error;

/// A command issued to the server.
///
/// The correlation id is not part of the request: it is assigned when the
/// request is sent and merged into the wire envelope, so the same `Request`
/// can be resent under a fresh id.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Serialize, Builder)]
pub struct Request {
    /// Command name, e.g. `commission_with_code`
    #[builder(into)]
    pub command: String,
    /// Command arguments; always a JSON object on the wire
    #[builder(default = Value::Object(Map::new()))]
    pub args: Value,
}

impl Request {
    /// Create a request from a command name and an `args` object.
    pub fn new<C: Into<String>>(command: C, args: Value) -> Result<Self> {
        let command = command.into();
        if command.is_empty() {
            return Err(Error::validation("command name cannot be empty"));
        }
        if !args.is_object() {
            return Err(Error::validation(format!(
                "args for `{command}` must be a JSON object, got {args}"
            )));
        }

        Ok(Self { command, args })
    }

    /// Serialize the wire envelope `{ command, args, message_id }`.
    pub fn to_frame(&self, message_id: &str) -> Result<String> {
        let envelope = Envelope {
            command: &self.command,
            args: &self.args,
            message_id,
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

#[derive(Serialize)]
struct Envelope<'req> {
    command: &'req str,
    args: &'req Value,
    message_id: &'req str,
}
