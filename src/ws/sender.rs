use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::time::timeout;

use super::connection::ConnectionManager;
use super::registry::{NewRequest, PendingRequestRegistry, SubscriptionSink};
use super::transport::Frame;
use super::types::request::Request;
use super::types::response::InboundMessage;
use crate::Result;

/// Source of generated correlation ids: `"1"`, `"2"`, ...
///
/// Ids are strictly increasing in the order they are drawn.
#[derive(Debug)]
pub struct CorrelationIdSource {
    next: AtomicU64,
}

impl Default for CorrelationIdSource {
    fn default() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }
}

impl CorrelationIdSource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw the next id.
    pub fn next_id(&self) -> String {
        self.next.fetch_add(1, Ordering::Relaxed).to_string()
    }
}

/// Sends requests over the managed connection and awaits their correlated replies.
pub struct RequestSender {
    connection: Arc<ConnectionManager>,
    registry: Arc<PendingRequestRegistry>,
    ids: CorrelationIdSource,
}

impl RequestSender {
    #[must_use]
    pub fn new(connection: Arc<ConnectionManager>, registry: Arc<PendingRequestRegistry>) -> Self {
        Self {
            connection,
            registry,
            ids: CorrelationIdSource::new(),
        }
    }

    /// Send a command and wait up to `timeout` for its reply.
    ///
    /// The request goes out under `override_id` if given, otherwise under the next
    /// generated id. Returns `Ok(None)` when no authenticated connection could be
    /// established, the id is already pending, the write failed, or no reply arrived in
    /// time. Returns an error if the request could not be serialized or the connection was
    /// lost while waiting.
    pub async fn send_request(
        &self,
        request: &Request,
        timeout: Duration,
        override_id: Option<&str>,
    ) -> Result<Option<InboundMessage>> {
        self.dispatch(request.clone(), timeout, override_id, None)
            .await
    }

    /// Send a subscription. Its first reply is returned; later replies go to `sink`.
    pub async fn send_subscription(
        &self,
        request: Request,
        timeout: Duration,
        sink: SubscriptionSink,
    ) -> Result<Option<InboundMessage>> {
        self.dispatch(request, timeout, None, Some(sink)).await
    }

    async fn dispatch(
        &self,
        request: Request,
        wait: Duration,
        override_id: Option<&str>,
        sink: Option<SubscriptionSink>,
    ) -> Result<Option<InboundMessage>> {
        if !self.connection.connect().await {
            #[cfg(feature = "tracing")]
            tracing::warn!(command = %request.command, "Not connected, dropping request");
            return Ok(None);
        }

        let id = override_id.map_or_else(|| self.ids.next_id(), str::to_owned);
        let frame = request.to_frame(&id)?;

        let mut new = NewRequest::new(id.clone(), request, wait).pinned(override_id.is_some());
        if let Some(sink) = sink {
            new = new.subscription(sink);
        }
        let registration = match self.registry.register(new) {
            Ok(registration) => registration,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Unable to register request: {e:?}");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                return Ok(None);
            }
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(%frame, "Sending message");

        if let Err(e) = self.connection.transmit(Frame::Text(frame)).await {
            #[cfg(feature = "tracing")]
            tracing::warn!(id, "Unable to send request: {e:?}");
            #[cfg(not(feature = "tracing"))]
            let _ = &e;
            self.registry.remove(&id, registration.ticket);
            return Ok(None);
        }

        match timeout(wait, registration.completion).await {
            Ok(Ok(Ok(reply))) => Ok(Some(reply)),
            Ok(Ok(Err(e))) => Err(e),
            // The entry was removed without an answer
            Ok(Err(_dropped)) => Ok(None),
            Err(_elapsed) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(id, timeout = ?wait, "Request timed out");
                self.registry.remove(&id, registration.ticket);
                Ok(None)
            }
        }
    }

    /// Connect if needed and write a raw binary frame.
    ///
    /// The write is bounded by `limit`. Returns whether the frame was handed to the
    /// socket.
    pub async fn send_bytes(&self, data: Vec<u8>, limit: Duration) -> bool {
        if !self.connection.connect().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Not connected, dropping binary frame");
            return false;
        }

        match timeout(limit, self.connection.transmit(Frame::Binary(data))).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Unable to send binary frame: {e:?}");
                #[cfg(not(feature = "tracing"))]
                let _ = &e;
                false
            }
            Err(_elapsed) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(timeout = ?limit, "Timed out sending binary frame");
                false
            }
        }
    }
}
