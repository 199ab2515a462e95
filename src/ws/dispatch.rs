use std::sync::Arc;

use super::registry::{PendingRequest, PendingRequestRegistry, Routed};
use super::traits::MessageParser;
use super::types::response::InboundMessage;

/// What happened to the messages of one inbound frame.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Messages that completed a pending request
    pub completed: usize,
    /// Messages forwarded to a subscription
    pub pushed: usize,
    /// Messages that matched nothing or did not settle their entry
    pub dropped: usize,
    /// The frame could not be decoded at all
    pub undecodable: bool,
}

/// Routes inbound frames to the pending requests they answer.
///
/// Never fails: frames that cannot be decoded and messages that cannot be correlated are
/// logged and dropped.
pub struct Dispatcher {
    registry: Arc<PendingRequestRegistry>,
    parser: Arc<dyn MessageParser>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(registry: Arc<PendingRequestRegistry>, parser: Arc<dyn MessageParser>) -> Self {
        Self { registry, parser }
    }

    /// Decode a frame and route each message by its `message_id`.
    ///
    /// Messages are grouped by id in order of first appearance; within a group they are
    /// routed in frame order. A message settles its entry if it carries a result or an
    /// error code, or if the entry was registered under an override id.
    pub fn on_inbound_frame(&self, raw: &[u8]) -> DispatchReport {
        let mut report = DispatchReport::default();

        let messages = match self.parser.parse(raw) {
            Ok(messages) => messages,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    frame = %String::from_utf8_lossy(raw),
                    error = %e,
                    "Failed to parse WebSocket message"
                );
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                report.undecodable = true;
                return report;
            }
        };

        for (id, group) in group_by_id(messages) {
            for message in group {
                self.route(id.as_deref(), message, &mut report);
            }
        }

        report
    }

    fn route(&self, id: Option<&str>, message: InboundMessage, report: &mut DispatchReport) {
        let Some(id) = id else {
            #[cfg(feature = "tracing")]
            tracing::debug!(?message, "Dropping message without message_id");
            report.dropped += 1;
            return;
        };

        match self.registry.route(id, message, settles) {
            Routed::Completed => report.completed += 1,
            Routed::Pushed => report.pushed += 1,
            outcome @ (Routed::Unmatched | Routed::Rejected | Routed::Dropped) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(id, ?outcome, "Message not delivered");
                #[cfg(not(feature = "tracing"))]
                let _ = &outcome;
                report.dropped += 1;
            }
        }
    }
}

/// Recognized terminal command: a result, an error code, or an override-id entry.
fn settles(entry: &PendingRequest, message: &InboundMessage) -> bool {
    message.carries_outcome() || entry.pinned
}

/// Group messages by `message_id`, keeping groups in order of first appearance.
fn group_by_id(messages: Vec<InboundMessage>) -> Vec<(Option<String>, Vec<InboundMessage>)> {
    let mut groups: Vec<(Option<String>, Vec<InboundMessage>)> = Vec::new();
    for message in messages {
        match groups
            .iter_mut()
            .find(|(id, _)| *id == message.message_id)
        {
            Some((_, group)) => group.push(message),
            None => groups.push((message.message_id.clone(), vec![message])),
        }
    }
    groups
}
