//! Store of in-flight requests keyed by correlation id.
//!
//! Every mutation happens under one exclusive lock. The lock is also exposed through
//! [`PendingRequestRegistry::lock`] so that connection teardown can fail all commands and
//! snapshot the surviving subscriptions in a single critical section.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};

use super::error::WsError;
use super::types::request::Request;
use super::types::response::InboundMessage;
use crate::Result;

/// Value delivered through a completion handle.
pub type Completion = Result<InboundMessage>;

/// Where a subscription's pushes go after its first reply.
///
/// The key stays the same when the subscription is resent under a new correlation id.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct SubscriptionSink {
    /// Stable identity of the subscription
    pub key: u64,
    /// Push channel
    pub tx: mpsc::UnboundedSender<InboundMessage>,
    /// Resend attempt that registered this sink, if it was registered by one
    pub attempt: Option<u64>,
}

impl SubscriptionSink {
    #[must_use]
    pub fn new(key: u64, tx: mpsc::UnboundedSender<InboundMessage>) -> Self {
        Self {
            key,
            tx,
            attempt: None,
        }
    }

    /// The same subscription, marked as registered by resend `attempt`.
    #[must_use]
    pub fn for_attempt(&self, attempt: u64) -> Self {
        Self {
            key: self.key,
            tx: self.tx.clone(),
            attempt: Some(attempt),
        }
    }
}

/// A request awaiting its reply.
pub struct PendingRequest {
    /// Correlation id the request was sent under
    pub id: String,
    /// The original command, kept so it can be resent
    pub request: Request,
    /// How long the sender waits for the first reply
    pub timeout: Duration,
    /// Whether `id` is a fixed, well-known id rather than a generated one
    pub pinned: bool,
    /// When the entry was registered
    pub created_at: Instant,
    ticket: u64,
    completion: Option<oneshot::Sender<Completion>>,
    sink: Option<SubscriptionSink>,
}

impl PendingRequest {
    /// Subscriptions stay registered after their first reply.
    #[must_use]
    pub fn is_subscription(&self) -> bool {
        self.sink.is_some()
    }

    /// Push channel of a subscription.
    #[must_use]
    pub fn sink(&self) -> Option<&SubscriptionSink> {
        self.sink.as_ref()
    }

    /// Whether the completion handle has already fired.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.completion.is_none()
    }

    /// Fire the completion handle. Only the first call has any effect.
    fn complete(&mut self, outcome: Completion) -> bool {
        match self.completion.take() {
            // The receiver may have given up (timeout); the entry still counts as resolved
            Some(tx) => {
                _ = tx.send(outcome);
                true
            }
            None => false,
        }
    }
}

/// Everything needed to register a request.
#[non_exhaustive]
pub struct NewRequest {
    /// Correlation id
    pub id: String,
    /// The command
    pub request: Request,
    /// Reply timeout
    pub timeout: Duration,
    /// Registered under an override id
    pub pinned: bool,
    /// Push channel; `Some` makes the entry a subscription
    pub sink: Option<SubscriptionSink>,
}

impl NewRequest {
    #[must_use]
    pub fn new(id: String, request: Request, timeout: Duration) -> Self {
        Self {
            id,
            request,
            timeout,
            pinned: false,
            sink: None,
        }
    }

    #[must_use]
    pub fn pinned(mut self, pinned: bool) -> Self {
        self.pinned = pinned;
        self
    }

    #[must_use]
    pub fn subscription(mut self, sink: SubscriptionSink) -> Self {
        self.sink = Some(sink);
        self
    }
}

/// Handle returned by [`PendingRequestRegistry::register`].
#[non_exhaustive]
#[derive(Debug)]
pub struct Registration {
    /// Identifies this particular entry, even if its id is later reused
    pub ticket: u64,
    /// Resolves once with the reply or a failure
    pub completion: oneshot::Receiver<Completion>,
}

/// Result of offering an inbound message to the registry.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// No entry is registered under the message's id
    Unmatched,
    /// An entry matched but the message does not settle it
    Rejected,
    /// The entry's completion handle fired
    Completed,
    /// The message was forwarded to a subscription's push channel
    Pushed,
    /// The matching subscription has no listener left and was removed
    Dropped,
}

/// Thread-safe store of in-flight requests.
#[derive(Default)]
pub struct PendingRequestRegistry {
    entries: Mutex<HashMap<String, PendingRequest>>,
    tickets: AtomicU64,
}

impl PendingRequestRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a key identifying a new subscription.
    pub fn allocate_key(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::Relaxed)
    }

    /// Take the registry's exclusive lock.
    ///
    /// The map holds no intermediate state across a panic, so a poisoned lock is recovered.
    pub fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            entries: self.entries.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }

    /// Register a request before it is transmitted.
    ///
    /// Fails with [`WsError::DuplicateId`] if the id is already pending.
    pub fn register(&self, new: NewRequest) -> Result<Registration> {
        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();

        let mut guard = self.lock();
        match guard.entries.entry(new.id) {
            Entry::Occupied(entry) => Err(WsError::DuplicateId(entry.key().clone()).into()),
            Entry::Vacant(entry) => {
                let id = entry.key().clone();
                entry.insert(PendingRequest {
                    id,
                    request: new.request,
                    timeout: new.timeout,
                    pinned: new.pinned,
                    created_at: Instant::now(),
                    ticket,
                    completion: Some(tx),
                    sink: new.sink,
                });
                Ok(Registration {
                    ticket,
                    completion: rx,
                })
            }
        }
    }

    /// Offer a message to the entry registered under `id`.
    ///
    /// `accepts` decides whether the message settles the matched entry. Commands are
    /// removed once completed; subscriptions stay registered and later messages go to
    /// their push channel.
    pub fn route<F>(&self, id: &str, message: InboundMessage, accepts: F) -> Routed
    where
        F: FnOnce(&PendingRequest, &InboundMessage) -> bool,
    {
        let mut guard = self.lock();
        let Some(entry) = guard.entries.get_mut(id) else {
            return Routed::Unmatched;
        };
        if !accepts(entry, &message) {
            return Routed::Rejected;
        }

        if !entry.is_resolved() {
            entry.complete(Ok(message));
            if !entry.is_subscription() {
                guard.entries.remove(id);
            }
            return Routed::Completed;
        }

        let delivered = entry
            .sink
            .as_ref()
            .is_some_and(|sink| sink.tx.send(message).is_ok());
        if delivered {
            Routed::Pushed
        } else {
            guard.entries.remove(id);
            Routed::Dropped
        }
    }

    /// Remove the entry registered under `id` if it is still the one identified by
    /// `ticket`. Dropping the entry closes its completion handle.
    pub fn remove(&self, id: &str, ticket: u64) -> Option<PendingRequest> {
        let mut guard = self.lock();
        guard.remove(id, ticket)
    }

    /// Retire an entry superseded by a resend that was answered with `reply`.
    ///
    /// If the old entry never got its first reply, `reply` completes it so its caller is
    /// answered.
    pub fn retire(&self, id: &str, ticket: u64, reply: InboundMessage) -> bool {
        match self.lock().remove(id, ticket) {
            Some(mut entry) => {
                entry.complete(Ok(reply));
                true
            }
            None => false,
        }
    }

    /// Undo a failed resend of `survivor`: remove the entry it resent and whatever resend
    /// `attempt` registered. Entries of the same subscription registered by a later
    /// attempt are kept. Returns how many entries were removed.
    pub fn abandon_resend(&self, survivor: &Survivor, attempt: u64) -> usize {
        let mut guard = self.lock();
        let mut removed = usize::from(guard.remove(&survivor.id, survivor.ticket).is_some());
        let before = guard.entries.len();
        guard.entries.retain(|_, entry| {
            entry
                .sink
                .as_ref()
                .is_none_or(|sink| sink.key != survivor.key || sink.attempt != Some(attempt))
        });
        removed += before - guard.entries.len();
        removed
    }

    /// Remove every entry of the subscription identified by `key`, across resends.
    pub fn cancel_subscription(&self, key: u64) -> usize {
        self.lock().cancel(key)
    }

    /// Whether an entry is registered under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.lock().entries.contains_key(id)
    }

    /// Whether the entry under `id` is a subscription.
    #[must_use]
    pub fn is_subscription(&self, id: &str) -> bool {
        self.lock()
            .entries
            .get(id)
            .is_some_and(PendingRequest::is_subscription)
    }

    /// Get the current number of pending requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}

/// A subscription that outlived its connection.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Survivor {
    /// Id the subscription is registered under
    pub id: String,
    /// Ticket of the registered entry
    pub ticket: u64,
    /// Stable identity of the subscription
    pub key: u64,
}

/// Exclusive access to the registry.
pub struct RegistryGuard<'registry> {
    entries: MutexGuard<'registry, HashMap<String, PendingRequest>>,
}

impl RegistryGuard<'_> {
    /// Fail and remove every non-subscription entry. Returns how many were failed.
    pub fn fail_commands<F>(&mut self, error: F) -> usize
    where
        F: Fn() -> WsError,
    {
        let mut failed = 0;
        self.entries.retain(|_, entry| {
            if entry.is_subscription() {
                return true;
            }
            entry.complete(Err(error().into()));
            failed += 1;
            false
        });
        failed
    }

    /// Snapshot the registered subscriptions, newest entry per subscription key.
    ///
    /// An old entry still awaiting its resend shares its key with the resend; only the
    /// resend is reported.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<Survivor> {
        let mut newest: HashMap<u64, Survivor> = HashMap::new();
        for entry in self.entries.values() {
            let Some(sink) = &entry.sink else {
                continue;
            };
            let survivor = Survivor {
                id: entry.id.clone(),
                ticket: entry.ticket,
                key: sink.key,
            };
            match newest.entry(sink.key) {
                Entry::Occupied(mut slot) if slot.get().ticket < entry.ticket => {
                    slot.insert(survivor);
                }
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    slot.insert(survivor);
                }
            }
        }

        let mut survivors: Vec<Survivor> = newest.into_values().collect();
        survivors.sort_by_key(|survivor| survivor.ticket);
        survivors
    }

    /// Remove every entry of the subscription identified by `key`. Returns how many
    /// entries were removed; dropping them ends the subscription's stream.
    pub fn cancel(&mut self, key: u64) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| entry.sink.as_ref().is_none_or(|sink| sink.key != key));
        before - self.entries.len()
    }

    /// Look up an entry by id and ticket.
    #[must_use]
    pub fn get(&self, id: &str, ticket: u64) -> Option<&PendingRequest> {
        self.entries.get(id).filter(|entry| entry.ticket == ticket)
    }

    /// Remove an entry by id and ticket.
    pub fn remove(&mut self, id: &str, ticket: u64) -> Option<PendingRequest> {
        if self.get(id, ticket).is_some() {
            self.entries.remove(id)
        } else {
            None
        }
    }
}
