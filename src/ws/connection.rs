#![expect(
    clippy::module_name_repetitions,
    reason = "Connection types expose their domain in the name for clarity"
)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use url::Url;

use super::config::Config;
use super::error::WsError;
use super::traits::{AuthVerdict, Authenticator};
use super::transport::{EventSink, Frame, Socket, TaggedEvent, Transport};
use crate::Result;

/// Close code sent when the server rejects the credentials.
const POLICY_VIOLATION_CODE: u16 = 1008;

/// Connection state tracking.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ConnectionState {
    /// No socket has been opened yet
    Disconnected,
    /// The socket is open and the handshake is in flight
    Authenticating,
    /// The handshake succeeded; requests may be sent
    Active,
    /// The server rejected the credentials. Terminal: no further connection attempts
    ClosedAuth,
    /// The socket closed or failed for any other reason
    ClosedOther,
}

impl ConnectionState {
    /// Check if the connection is currently usable.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Check if the client has given up connecting for good.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::ClosedAuth)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthOutcome {
    Accepted,
    Rejected,
    /// The socket went away before the server answered
    Interrupted,
}

/// Single-assignment outcome of one socket's handshake.
#[derive(Clone)]
struct AuthGate {
    tx: Arc<watch::Sender<Option<AuthOutcome>>>,
}

impl AuthGate {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Resolve the gate. Returns `false` if it was already resolved.
    fn resolve(&self, outcome: AuthOutcome) -> bool {
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(outcome);
            true
        })
    }

    fn outcome(&self) -> Option<AuthOutcome> {
        *self.tx.borrow()
    }

    async fn wait(&self) -> AuthOutcome {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(outcome) => (*outcome).unwrap_or(AuthOutcome::Interrupted),
            Err(_closed) => AuthOutcome::Interrupted,
        }
    }
}

/// The current socket, the epoch of the attempt that opened it and its handshake gate.
///
/// An epoch of `0` means there is no current connection.
struct Link {
    epoch: u64,
    socket: Option<Arc<dyn Socket>>,
    gate: AuthGate,
}

/// Owns the single logical connection and its authentication handshake.
///
/// At most one socket is current at a time. Each connection attempt is numbered with an
/// epoch; events from a socket that is no longer current are recognised by their epoch and
/// have no effect on the connection state.
///
/// Connection attempts are serialized: a caller that arrives while another attempt is
/// authenticating waits for that attempt and reuses its socket.
///
/// Writes go through [`transmit`](Self::transmit), which holds an exclusive send lock so
/// frames from concurrent callers never interleave.
///
/// # Example
///
/// ```ignore
/// let connection = ConnectionManager::new(url, config, transport, authenticator, events_tx);
/// if connection.connect().await {
///     connection.transmit(Frame::Text(payload)).await?;
/// }
/// ```
pub struct ConnectionManager {
    url: Url,
    config: Config,
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
    events_tx: mpsc::UnboundedSender<TaggedEvent>,
    connect_lock: tokio::sync::Mutex<()>,
    send_lock: tokio::sync::Mutex<()>,
    link: Mutex<Link>,
    epochs: AtomicU64,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    /// Create a manager for `url`. Nothing is opened until [`connect`](Self::connect).
    ///
    /// Socket events are forwarded, tagged with their epoch, to `events_tx`.
    #[must_use]
    pub fn new(
        url: Url,
        config: Config,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
        events_tx: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);

        Self {
            url,
            config,
            transport,
            authenticator,
            events_tx,
            connect_lock: tokio::sync::Mutex::new(()),
            send_lock: tokio::sync::Mutex::new(()),
            link: Mutex::new(Link {
                epoch: 0,
                socket: None,
                gate: AuthGate::new(),
            }),
            epochs: AtomicU64::new(0),
            state_tx,
        }
    }

    /// Ensure an authenticated connection exists, opening one if needed.
    ///
    /// Returns `true` once the handshake has succeeded, `false` if the socket could not be
    /// opened, the handshake failed or did not finish within
    /// [`Config::auth_timeout`], or the server rejected the credentials earlier. Never
    /// returns an error; use [`try_connect`](Self::try_connect) for the reason.
    pub async fn connect(&self) -> bool {
        self.try_connect().await.is_ok()
    }

    /// Ensure an authenticated connection exists, reporting why one could not be had.
    ///
    /// Fails with [`WsError::AuthenticationFailed`] (kind
    /// [`Authorization`](crate::error::Kind::Authorization)) when the server rejected the
    /// credentials, now or on an earlier attempt, and with [`WsError::Timeout`] when the
    /// handshake went unanswered. A timed-out socket is closed so the next attempt opens
    /// a new one.
    pub async fn try_connect(&self) -> Result<()> {
        let _attempt = self.connect_lock.lock().await;

        if self.state().is_terminal() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Credentials were rejected, not connecting");
            return Err(WsError::AuthenticationFailed.into());
        }

        let (epoch, gate) = match self.reusable_gate() {
            Some(current) => current,
            None => self.open().await?,
        };

        match timeout(self.config.auth_timeout, gate.wait()).await {
            Ok(AuthOutcome::Accepted) => Ok(()),
            Ok(AuthOutcome::Rejected) => Err(WsError::AuthenticationFailed.into()),
            Ok(AuthOutcome::Interrupted) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(epoch, "Connection closed before authentication");
                Err(WsError::ConnectionClosed.into())
            }
            Err(_elapsed) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    timeout = ?self.config.auth_timeout,
                    "Timed out waiting for authentication"
                );
                self.expire(epoch);
                Err(WsError::Timeout.into())
            }
        }
    }

    /// The current socket's epoch and gate, unless there is no socket or its handshake was
    /// cut short.
    fn reusable_gate(&self) -> Option<(u64, AuthGate)> {
        let link = self.link();
        link.socket.as_ref()?;
        match link.gate.outcome() {
            Some(AuthOutcome::Interrupted) => None,
            _ => Some((link.epoch, link.gate.clone())),
        }
    }

    /// Give up on the socket opened at `epoch` after its handshake went unanswered.
    ///
    /// Does nothing if the socket is no longer current or the handshake was answered in
    /// the meantime.
    fn expire(&self, epoch: u64) {
        let socket = {
            let mut link = self.link();
            if link.epoch != epoch || !link.gate.resolve(AuthOutcome::Interrupted) {
                return;
            }
            link.epoch = 0;
            link.gate = AuthGate::new();
            link.socket.take()
        };

        self.state_tx.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = ConnectionState::ClosedOther;
            true
        });
        if let Some(socket) = socket {
            socket.close(self.config.close_code, &self.config.close_reason);
        }
    }

    /// Open a fresh socket and pipeline the handshake. Returns the new socket's epoch and
    /// gate.
    async fn open(&self) -> Result<(u64, AuthGate)> {
        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed) + 1;
        let gate = AuthGate::new();

        // Install the epoch before opening so that events from the new socket, including
        // an early auth reply, are recognised as current.
        let superseded = {
            let mut link = self.link();
            let superseded = link.socket.take();
            link.epoch = epoch;
            link.gate = gate.clone();
            superseded
        };
        if let Some(socket) = superseded {
            socket.close(self.config.close_code, &self.config.close_reason);
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(url = %self.url, epoch, "Opening WebSocket");

        let sink = EventSink::new(epoch, self.events_tx.clone());
        let socket = match self
            .transport
            .open(&self.url, &self.config.headers(), sink)
            .await
        {
            Ok(socket) => socket,
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Unable to connect: {e:?}");
                self.abandon(epoch);
                return Err(e);
            }
        };

        {
            let mut link = self.link();
            if link.epoch != epoch {
                drop(link);
                #[cfg(feature = "tracing")]
                tracing::debug!(epoch, "Socket closed while opening");
                socket.close(self.config.close_code, &self.config.close_reason);
                return Err(WsError::ConnectionClosed.into());
            }
            link.socket = Some(Arc::clone(&socket));
            if gate.outcome().is_none() {
                self.state_tx.send_replace(ConnectionState::Authenticating);
            }
        }

        match self.authenticator.auth_message() {
            Some(payload) => {
                let sent = {
                    let _send = self.send_lock.lock().await;
                    socket.send(Frame::Text(payload)).await
                };
                if let Err(e) = sent {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("Unable to send authentication: {e:?}");
                    #[cfg(not(feature = "tracing"))]
                    let _ = &e;
                    gate.resolve(AuthOutcome::Interrupted);
                }
            }
            None => self.complete_auth(epoch, AuthVerdict::Accepted),
        }

        Ok((epoch, gate))
    }

    /// Forget a failed attempt if it is still the current one.
    fn abandon(&self, epoch: u64) {
        let mut link = self.link();
        if link.epoch == epoch {
            link.gate.resolve(AuthOutcome::Interrupted);
            link.epoch = 0;
            link.gate = AuthGate::new();
        }
    }

    /// Record the server's answer to the handshake of the socket opened at `epoch`.
    ///
    /// Acceptance makes the connection [`Active`](ConnectionState::Active). Rejection is
    /// terminal: the state becomes [`ClosedAuth`](ConnectionState::ClosedAuth) and the
    /// socket is closed.
    pub fn complete_auth(&self, epoch: u64, verdict: AuthVerdict) {
        let link = self.link();
        if link.epoch != epoch {
            return;
        }

        match verdict {
            AuthVerdict::Accepted => {
                if link.gate.resolve(AuthOutcome::Accepted) {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(epoch, "Authenticated");
                    self.state_tx.send_replace(ConnectionState::Active);
                }
            }
            AuthVerdict::Rejected => {
                if link.gate.resolve(AuthOutcome::Rejected) {
                    #[cfg(feature = "tracing")]
                    tracing::error!(epoch, "Authentication rejected, closing connection");
                    self.state_tx.send_replace(ConnectionState::ClosedAuth);
                    if let Some(socket) = &link.socket {
                        socket.close(POLICY_VIOLATION_CODE, "authentication rejected");
                    }
                }
            }
        }
    }

    /// Offer an inbound text frame to the handshake.
    ///
    /// Returns `true` if the frame was the server's answer to the handshake of the
    /// current socket and must not be dispatched.
    pub fn intercept_auth(&self, epoch: u64, frame: &str) -> bool {
        if !self.awaiting_auth(epoch) {
            return false;
        }
        match self.authenticator.verdict(frame) {
            Some(verdict) => {
                self.complete_auth(epoch, verdict);
                true
            }
            None => false,
        }
    }

    /// Whether the socket opened at `epoch` is current and its handshake is unresolved.
    #[must_use]
    pub fn awaiting_auth(&self, epoch: u64) -> bool {
        let link = self.link();
        link.epoch == epoch && link.gate.outcome().is_none()
    }

    /// Whether `epoch` identifies the current socket.
    #[must_use]
    pub fn is_current(&self, epoch: u64) -> bool {
        epoch != 0 && self.link().epoch == epoch
    }

    /// Drop the socket opened at `epoch` after it closed or failed.
    ///
    /// Returns `false`, changing nothing, if `epoch` is not the current socket. Otherwise
    /// an in-flight handshake is released, the handshake gate is reset for the next
    /// attempt, and the state becomes [`ClosedOther`](ConnectionState::ClosedOther)
    /// unless the credentials were rejected.
    pub fn teardown(&self, epoch: u64) -> bool {
        let mut link = self.link();
        if epoch == 0 || link.epoch != epoch {
            return false;
        }

        link.gate.resolve(AuthOutcome::Interrupted);
        link.socket = None;
        link.epoch = 0;
        link.gate = AuthGate::new();

        self.state_tx.send_if_modified(|state| {
            if state.is_terminal() {
                return false;
            }
            *state = ConnectionState::ClosedOther;
            true
        });
        true
    }

    /// Write one frame on the current socket. Frames from concurrent callers are written
    /// one at a time.
    pub async fn transmit(&self, frame: Frame) -> Result<()> {
        let _send = self.send_lock.lock().await;
        let socket = self
            .link()
            .socket
            .clone()
            .ok_or(WsError::ConnectionClosed)?;
        socket.send(frame).await
    }

    /// Start closing the current socket with the configured code and reason. Does not
    /// wait for the close to complete.
    pub fn shutdown(&self) {
        let socket = self.link().socket.clone();
        if let Some(socket) = socket {
            #[cfg(feature = "tracing")]
            tracing::debug!(code = self.config.close_code, "Closing WebSocket");
            socket.close(self.config.close_code, &self.config.close_reason);
        }
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The endpoint this manager connects to.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    fn link(&self) -> MutexGuard<'_, Link> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
