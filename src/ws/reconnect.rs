//! Recovery of subscriptions after the connection drops.
//!
//! A disconnect fails every pending command at once. Subscriptions survive it: after a
//! grace delay a single reconnect is attempted and each surviving subscription is resent
//! under a fresh correlation id, keeping its push channel.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::connection::ConnectionManager;
use super::error::WsError;
use super::registry::{PendingRequestRegistry, Survivor};
use super::sender::RequestSender;

/// Lifecycle of the socket as seen by the reconnect logic.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ReconnectPhase {
    /// The socket is open
    Open,
    /// The peer started closing the socket
    Closing,
    /// The socket is gone
    Closed,
    /// A reconnect on behalf of surviving subscriptions is in progress
    Reconnecting,
}

/// Reacts to socket lifecycle events and resubscribes after a disconnect.
pub struct ReconnectCoordinator {
    connection: Arc<ConnectionManager>,
    registry: Arc<PendingRequestRegistry>,
    sender: Arc<RequestSender>,
    grace_delay: Duration,
    phase_tx: watch::Sender<ReconnectPhase>,
    shutdown: CancellationToken,
}

impl ReconnectCoordinator {
    /// Cancelling `shutdown` stops any pending or future resubscription.
    #[must_use]
    pub fn new(
        connection: Arc<ConnectionManager>,
        registry: Arc<PendingRequestRegistry>,
        sender: Arc<RequestSender>,
        grace_delay: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        let (phase_tx, _) = watch::channel(ReconnectPhase::Closed);
        Self {
            connection,
            registry,
            sender,
            grace_delay,
            phase_tx,
            shutdown,
        }
    }

    #[must_use]
    pub fn phase(&self) -> ReconnectPhase {
        *self.phase_tx.borrow()
    }

    #[must_use]
    pub fn phase_receiver(&self) -> watch::Receiver<ReconnectPhase> {
        self.phase_tx.subscribe()
    }

    /// The socket opened at `epoch` is open.
    pub fn on_open(&self, epoch: u64) {
        if self.connection.is_current(epoch) {
            self.phase_tx.send_replace(ReconnectPhase::Open);
        }
    }

    /// The peer started closing the socket opened at `epoch`. Treated as a disconnect.
    pub fn on_closing(self: &Arc<Self>, epoch: u64) -> Option<JoinHandle<()>> {
        if self.connection.is_current(epoch) {
            self.phase_tx.send_replace(ReconnectPhase::Closing);
        }
        self.on_disconnect(epoch)
    }

    /// The socket opened at `epoch` closed or failed.
    ///
    /// Does nothing for a socket that is no longer current, so each connection is torn
    /// down at most once however many close and failure events it produces. Otherwise,
    /// in one critical section on the registry, the connection is torn down, every pending
    /// command fails with [`WsError::ConnectionLost`] and the surviving subscriptions are
    /// snapshotted. If any survive, a resubscription task is spawned and returned.
    pub fn on_disconnect(self: &Arc<Self>, epoch: u64) -> Option<JoinHandle<()>> {
        let survivors = {
            let mut entries = self.registry.lock();
            if !self.connection.teardown(epoch) {
                return None;
            }
            let failed = entries.fail_commands(|| WsError::ConnectionLost);
            #[cfg(feature = "tracing")]
            tracing::debug!(epoch, failed, "Connection lost");
            #[cfg(not(feature = "tracing"))]
            let _ = failed;
            entries.subscriptions()
        };
        self.phase_tx.send_replace(ReconnectPhase::Closed);

        if survivors.is_empty() || self.shutdown.is_cancelled() {
            return None;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            subscriptions = survivors.len(),
            delay = ?self.grace_delay,
            "Scheduling resubscription"
        );

        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.resubscribe(survivors).await }))
    }

    async fn resubscribe(&self, survivors: Vec<Survivor>) {
        tokio::select! {
            () = self.shutdown.cancelled() => return,
            () = sleep(self.grace_delay) => {}
        }

        self.phase_tx.send_replace(ReconnectPhase::Reconnecting);

        if !self.connection.connect().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Unable to reconnect, dropping subscriptions");
            let mut entries = self.registry.lock();
            for survivor in &survivors {
                entries.cancel(survivor.key);
            }
            drop(entries);
            self.phase_tx.send_replace(ReconnectPhase::Closed);
            return;
        }

        for survivor in survivors {
            if self.shutdown.is_cancelled() {
                return;
            }
            self.resend(survivor).await;
        }
    }

    /// Resend one subscription under a fresh id, retiring its old entry.
    async fn resend(&self, survivor: Survivor) {
        // Cancelled during the grace delay
        let Some((request, timeout, sink)) = ({
            let entries = self.registry.lock();
            entries
                .get(&survivor.id, survivor.ticket)
                .and_then(|entry| Some((entry.request.clone(), entry.timeout, entry.sink()?.clone())))
        }) else {
            return;
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(old_id = %survivor.id, command = %request.command, "Resubscribing");

        let attempt = self.registry.allocate_key();
        let response = self
            .sender
            .send_subscription(request, timeout, sink.for_attempt(attempt))
            .await;

        match response {
            Ok(Some(reply)) if reply.result.is_some() => {
                self.registry.retire(&survivor.id, survivor.ticket, reply);
            }
            other => {
                #[cfg(feature = "tracing")]
                tracing::warn!(old_id = %survivor.id, ?other, "Issue re-registering subscription");
                #[cfg(not(feature = "tracing"))]
                let _ = &other;
                // A later disconnect may have resent the subscription again; that resend
                // keeps the stream alive
                self.registry.abandon_resend(&survivor, attempt);
            }
        }
    }
}
