use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::config::Config;
use super::connection::{ConnectionManager, ConnectionState};
use super::dispatch::Dispatcher;
use super::reconnect::{ReconnectCoordinator, ReconnectPhase};
use super::registry::{PendingRequestRegistry, SubscriptionSink};
use super::sender::RequestSender;
use super::traits::{Authenticator, JsonParser, MessageParser, NoAuth};
use super::transport::{Frame, TaggedEvent, Transport, TransportEvent, TungsteniteTransport};
use super::types::request::Request;
use super::types::response::InboundMessage;
use crate::{Result, websocket_url};

/// Correlated request/response client over a single WebSocket.
///
/// Requests carry a `message_id`; replies are matched back to the caller by that id. The
/// connection is opened lazily on the first send and reopened on demand after it drops.
/// Subscriptions outlive a dropped connection and are resent once after
/// [`Config::resubscribe_delay`].
///
/// Cloning is cheap; clones share the connection.
///
/// # Examples
///
/// ```rust, no_run
/// use matter_ws_client::ws::{Client, Config};
/// use matter_ws_client::ws::types::request::Request;
/// use serde_json::json;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = Client::new("ws://homeassistant.local:5580/ws", Config::default())?;
///
///     let request = Request::new("get_nodes", json!({}))?;
///     if let Some(reply) = client.send(&request).await? {
///         println!("{:?}", reply.result);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: Config,
    connection: Arc<ConnectionManager>,
    registry: Arc<PendingRequestRegistry>,
    sender: Arc<RequestSender>,
    coordinator: Arc<ReconnectCoordinator>,
    /// Stops resubscription; cancelled by [`Client::shutdown`]
    shutdown: CancellationToken,
    /// Stops the event loop; cancelled when the last clone is dropped
    lifetime: CancellationToken,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        self.lifetime.cancel();
    }
}

impl Client {
    /// Create a client for `endpoint` without an authentication handshake.
    ///
    /// `http` and `https` endpoints are rewritten to `ws` and `wss`. Must be called from
    /// within a Tokio runtime.
    pub fn new(endpoint: &str, config: Config) -> Result<Self> {
        Self::with_authenticator(endpoint, config, NoAuth)
    }

    /// Create a client that runs `authenticator`'s handshake on every new socket.
    pub fn with_authenticator<A: Authenticator>(
        endpoint: &str,
        config: Config,
        authenticator: A,
    ) -> Result<Self> {
        Self::with_parts(
            endpoint,
            config,
            Arc::new(TungsteniteTransport),
            Arc::new(authenticator),
            Arc::new(JsonParser),
        )
    }

    /// Create a client from explicit collaborators.
    pub fn with_parts(
        endpoint: &str,
        config: Config,
        transport: Arc<dyn Transport>,
        authenticator: Arc<dyn Authenticator>,
        parser: Arc<dyn MessageParser>,
    ) -> Result<Self> {
        let url = websocket_url(endpoint)?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let connection = Arc::new(ConnectionManager::new(
            url,
            config.clone(),
            transport,
            authenticator,
            events_tx,
        ));
        let registry = Arc::new(PendingRequestRegistry::new());
        let sender = Arc::new(RequestSender::new(
            Arc::clone(&connection),
            Arc::clone(&registry),
        ));
        let lifetime = CancellationToken::new();
        let shutdown = lifetime.child_token();
        let coordinator = Arc::new(ReconnectCoordinator::new(
            Arc::clone(&connection),
            Arc::clone(&registry),
            Arc::clone(&sender),
            config.resubscribe_delay,
            shutdown.clone(),
        ));
        let dispatcher = Dispatcher::new(Arc::clone(&registry), parser);

        tokio::spawn(run_events(
            events_rx,
            Arc::clone(&connection),
            dispatcher,
            Arc::clone(&coordinator),
            lifetime.clone(),
        ));

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                connection,
                registry,
                sender,
                coordinator,
                shutdown,
                lifetime,
            }),
        })
    }

    /// Ensure an authenticated connection exists. See [`ConnectionManager::connect`].
    pub async fn connect(&self) -> bool {
        self.inner.connection.connect().await
    }

    /// Like [`connect`](Self::connect), but reports why no connection could be had. See
    /// [`ConnectionManager::try_connect`].
    pub async fn try_connect(&self) -> Result<()> {
        self.inner.connection.try_connect().await
    }

    /// Send a command with the configured [`Config::request_timeout`] and a generated id.
    pub async fn send(&self, request: &Request) -> Result<Option<InboundMessage>> {
        self.send_request(request, self.inner.config.request_timeout, None)
            .await
    }

    /// Send a command and wait up to `timeout` for its reply.
    ///
    /// Returns `Ok(None)` when no connection could be established, the write failed, the
    /// id is already in flight, or no reply arrived in time. Returns
    /// [`WsError::ConnectionLost`](super::WsError::ConnectionLost) if the connection
    /// dropped while waiting.
    pub async fn send_request(
        &self,
        request: &Request,
        timeout: Duration,
        override_id: Option<&str>,
    ) -> Result<Option<InboundMessage>> {
        self.inner
            .sender
            .send_request(request, timeout, override_id)
            .await
    }

    /// Send a subscription and wait up to `timeout` for its first reply.
    ///
    /// Later replies under the same id are delivered on the returned [`Subscription`], which
    /// survives reconnects. Dropping it unregisters the subscription. Returns `Ok(None)` when
    /// the first reply did not arrive.
    pub async fn subscribe(&self, request: &Request, timeout: Duration) -> Result<Option<Subscription>> {
        let registry = &self.inner.registry;
        let key = registry.allocate_key();
        let (tx, rx) = mpsc::unbounded_channel();

        let first = self
            .inner
            .sender
            .send_subscription(request.clone(), timeout, SubscriptionSink::new(key, tx))
            .await;

        match first {
            Ok(Some(response)) => Ok(Some(Subscription {
                key,
                response,
                pushes: rx,
                registry: Arc::clone(registry),
            })),
            Ok(None) => {
                registry.cancel_subscription(key);
                Ok(None)
            }
            Err(e) => {
                registry.cancel_subscription(key);
                Err(e)
            }
        }
    }

    /// Write a raw binary frame, connecting first if needed. Bounded by
    /// [`Config::bytes_timeout`].
    pub async fn send_bytes(&self, data: Vec<u8>) -> bool {
        self.inner
            .sender
            .send_bytes(data, self.inner.config.bytes_timeout)
            .await
    }

    /// Stop resubscribing and start closing the socket. Does not block.
    ///
    /// Pending commands fail once the close completes. A later send opens a new socket.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.connection.shutdown();
    }

    /// Get the current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.connection.state()
    }

    /// Subscribe to connection state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<ConnectionState> {
        self.inner.connection.state_receiver()
    }

    /// Get the socket lifecycle phase.
    #[must_use]
    pub fn reconnect_phase(&self) -> ReconnectPhase {
        self.inner.coordinator.phase()
    }

    /// The WebSocket endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        self.inner.connection.url()
    }

    /// Number of requests and subscriptions awaiting replies.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.registry.len()
    }
}

/// Consume socket events in order until the client is dropped.
async fn run_events(
    mut events: mpsc::UnboundedReceiver<TaggedEvent>,
    connection: Arc<ConnectionManager>,
    dispatcher: Dispatcher,
    coordinator: Arc<ReconnectCoordinator>,
    lifetime: CancellationToken,
) {
    loop {
        let TaggedEvent { epoch, event } = tokio::select! {
            () = lifetime.cancelled() => break,
            tagged = events.recv() => match tagged {
                Some(tagged) => tagged,
                None => break,
            },
        };

        match event {
            TransportEvent::Opened => coordinator.on_open(epoch),
            TransportEvent::Message(Frame::Text(text)) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(%text, "Received WebSocket text message");
                if !connection.intercept_auth(epoch, &text) {
                    dispatcher.on_inbound_frame(text.as_bytes());
                }
            }
            TransportEvent::Message(Frame::Binary(bytes)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(len = bytes.len(), "Ignoring binary frame");
                #[cfg(not(feature = "tracing"))]
                let _ = &bytes;
            }
            TransportEvent::Closing { code, reason } => {
                #[cfg(feature = "tracing")]
                tracing::debug!(epoch, code, %reason, "WebSocket closing");
                #[cfg(not(feature = "tracing"))]
                let _ = (code, &reason);
                coordinator.on_closing(epoch);
            }
            TransportEvent::Closed { code, reason } => {
                #[cfg(feature = "tracing")]
                tracing::debug!(epoch, code, %reason, "WebSocket closed");
                #[cfg(not(feature = "tracing"))]
                let _ = (code, &reason);
                coordinator.on_disconnect(epoch);
            }
            TransportEvent::Failure(error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(epoch, %error, "WebSocket failure");
                #[cfg(not(feature = "tracing"))]
                let _ = &error;
                coordinator.on_disconnect(epoch);
            }
        }
    }
}

/// A live subscription: its first reply plus a stream of later ones.
///
/// The stream ends if the subscription is dropped by the client, for example because it
/// could not be resent after a reconnect.
pub struct Subscription {
    key: u64,
    response: InboundMessage,
    pushes: mpsc::UnboundedReceiver<InboundMessage>,
    registry: Arc<PendingRequestRegistry>,
}

impl Subscription {
    /// The first reply.
    #[must_use]
    pub fn response(&self) -> &InboundMessage {
        &self.response
    }

    /// Unregister the subscription.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Stream for Subscription {
    type Item = InboundMessage;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.pushes.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry.cancel_subscription(self.key);
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt as _;
    use serde_json::{Value, json};

    use super::*;
    use crate::error::Kind;
    use crate::ws::WsError;
    use crate::ws::testing::FakeTransport;
    use crate::ws::traits::AccessToken;

    fn config() -> Config {
        let mut config = Config::default();
        config.auth_timeout = Duration::from_millis(500);
        config.resubscribe_delay = Duration::from_millis(50);
        config
    }

    fn client(transport: &Arc<FakeTransport>) -> Client {
        Client::with_parts(
            "ws://matter.local:5580/ws",
            config(),
            Arc::clone(transport) as Arc<dyn Transport>,
            Arc::new(NoAuth),
            Arc::new(JsonParser),
        )
        .unwrap()
    }

    fn message_id(frame: &str) -> String {
        let value: Value = serde_json::from_str(frame).unwrap();
        value["message_id"].as_str().unwrap().to_owned()
    }

    /// Answer every command with `{"message_id": <id>, "result": {}}`.
    fn echo_results(transport: &FakeTransport) {
        transport.respond(|frame| Some(json!({ "message_id": message_id(frame), "result": {} }).to_string()));
    }

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    fn request(command: &str) -> Request {
        Request::new(command, json!({})).unwrap()
    }

    #[tokio::test]
    async fn generated_ids_increase_and_connect_once() {
        let transport = FakeTransport::new();
        echo_results(&transport);
        let client = client(&transport);

        for _ in 0..3 {
            let reply = client.send(&request("get_nodes")).await.unwrap();
            assert!(reply.is_some());
        }

        let ids: Vec<u64> = transport
            .sent_texts()
            .iter()
            .map(|frame| message_id(frame).parse().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(transport.opens(), 1);
        assert_eq!(client.state(), ConnectionState::Active);
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_sends_never_overlap() {
        let transport = FakeTransport::new();
        transport.send_delay(Duration::from_millis(5));
        echo_results(&transport);
        let client = client(&transport);

        let sends = (0..8).map(|_| {
            let client = client.clone();
            async move { client.send(&request("ping")).await }
        });
        let replies = futures::future::join_all(sends).await;

        assert!(replies.iter().all(|reply| matches!(reply, Ok(Some(_)))));
        assert_eq!(transport.max_concurrent_sends(), 1);
        assert_eq!(transport.opens(), 1);
        let mut ids: Vec<u64> = transport
            .sent_texts()
            .iter()
            .map(|frame| message_id(frame).parse().unwrap())
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn timeout_returns_none_and_unregisters() {
        let transport = FakeTransport::new();
        let client = client(&transport);

        let reply = client
            .send_request(&request("slow"), Duration::from_millis(30), None)
            .await
            .unwrap();

        assert!(reply.is_none());
        assert_eq!(client.pending_count(), 0);

        // A late reply is ignored
        transport.push(r#"{"message_id":"1","result":{}}"#);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn unreachable_server_returns_none() {
        let transport = FakeTransport::new();
        transport.fail_opens(true);
        let client = client(&transport);

        assert!(client.send(&request("get_nodes")).await.unwrap().is_none());
        assert!(!client.send_bytes(vec![1, 2, 3]).await);
        assert!(transport.sent_texts().is_empty());
    }

    #[tokio::test]
    async fn override_id_is_used_verbatim() {
        let transport = FakeTransport::new();
        transport.respond(|frame| {
            (message_id(frame) == "remove_node").then(|| {
                r#"{"message_id":"remove_node","error_code":7,"details":"not found"}"#.to_owned()
            })
        });
        let client = client(&transport);

        let reply = client
            .send_request(&request("remove_node"), Duration::from_secs(1), Some("remove_node"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.error_code, Some(7));
        assert_eq!(reply.details.as_deref(), Some("not found"));
    }

    #[tokio::test]
    async fn duplicate_override_id_returns_none() {
        let transport = FakeTransport::new();
        let client = client(&transport);

        let first = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .send_request(&request("remove_node"), Duration::from_millis(300), Some("remove_node"))
                    .await
            }
        });
        wait_until(|| client.pending_count() == 1).await;

        let second = client
            .send_request(&request("remove_node"), Duration::from_secs(1), Some("remove_node"))
            .await
            .unwrap();

        assert!(second.is_none());
        assert_eq!(transport.sent_texts().len(), 1);
        transport.push(r#"{"message_id":"remove_node"}"#);
        assert!(first.await.unwrap().unwrap().is_some());
    }

    #[tokio::test]
    async fn disconnect_fails_commands() {
        let transport = FakeTransport::new();
        let client = client(&transport);

        let pending = tokio::spawn({
            let client = client.clone();
            async move { client.send(&request("commission_with_code")).await }
        });
        wait_until(|| client.pending_count() == 1).await;

        transport.drop_connection();

        let err = pending.await.unwrap().unwrap_err();
        assert_eq!(err.kind(), Kind::WebSocket);
        assert!(matches!(err.downcast_ref::<WsError>(), Some(WsError::ConnectionLost)));
        assert_eq!(client.state(), ConnectionState::ClosedOther);
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn subscription_is_resent_once_after_disconnect() {
        let transport = FakeTransport::new();
        echo_results(&transport);
        let client = client(&transport);

        let mut subscription = client
            .subscribe(&request("start_listening"), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert!(subscription.response().result.is_some());

        transport.push(r#"{"message_id":"1","result":{"event":"node_added"}}"#);
        let push = subscription.next().await.unwrap();
        assert_eq!(push.result, Some(json!({ "event": "node_added" })));

        transport.drop_connection();
        wait_until(|| transport.opens() == 2 && transport.sent_texts().len() == 2).await;
        wait_until(|| client.pending_count() == 1).await;

        let resent = transport.sent_texts();
        let resent_id = message_id(&resent[1]);
        assert_ne!(resent_id, "1");
        assert!(resent[1].contains("start_listening"));

        // Pushes under the new id reach the original stream
        transport.push(&json!({ "message_id": resent_id, "result": { "event": "node_removed" } }).to_string());
        let push = subscription.next().await.unwrap();
        assert_eq!(push.result, Some(json!({ "event": "node_removed" })));

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(transport.sent_texts().len(), 2);
        assert_eq!(client.reconnect_phase(), ReconnectPhase::Open);
    }

    #[tokio::test]
    async fn disconnect_fails_command_and_resends_pending_subscription() {
        let transport = FakeTransport::new();
        let client = client(&transport);

        let subscribing = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .subscribe(&request("start_listening"), Duration::from_secs(2))
                    .await
            }
        });
        let commanding = tokio::spawn({
            let client = client.clone();
            async move { client.send(&request("get_node")).await }
        });
        wait_until(|| client.pending_count() == 2).await;

        echo_results(&transport);
        transport.drop_connection();

        let err = commanding.await.unwrap().unwrap_err();
        assert!(matches!(err.downcast_ref::<WsError>(), Some(WsError::ConnectionLost)));
        assert_eq!(client.pending_count(), 1);

        let subscription = subscribing.await.unwrap().unwrap().unwrap();
        assert!(subscription.response().result.is_some());

        let sent = transport.sent_texts();
        assert_eq!(sent.len(), 3);
        assert!(sent[2].contains("start_listening"));
        assert_eq!(transport.opens(), 2);
        assert_eq!(client.pending_count(), 1);
    }

    #[tokio::test]
    async fn failed_reconnect_ends_subscription() {
        let transport = FakeTransport::new();
        echo_results(&transport);
        let client = client(&transport);
        let mut subscription = client
            .subscribe(&request("start_listening"), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        transport.fail_opens(true);
        transport.drop_connection();

        let end = tokio::time::timeout(Duration::from_secs(2), subscription.next())
            .await
            .unwrap();
        assert!(end.is_none());
        assert_eq!(client.pending_count(), 0);
        assert_eq!(transport.opens(), 2);
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters_it() {
        let transport = FakeTransport::new();
        echo_results(&transport);
        let client = client(&transport);

        let subscription = client
            .subscribe(&request("start_listening"), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(client.pending_count(), 1);

        subscription.cancel();
        assert_eq!(client.pending_count(), 0);

        transport.drop_connection();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(transport.opens(), 1);
    }

    #[tokio::test]
    async fn shutdown_closes_and_skips_resubscription() {
        let transport = FakeTransport::new();
        echo_results(&transport);
        let client = client(&transport);
        let _subscription = client
            .subscribe(&request("start_listening"), Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();

        client.shutdown();

        wait_until(|| client.state() == ConnectionState::ClosedOther).await;
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(transport.closes(), vec![1001]);
        assert_eq!(transport.opens(), 1);
        assert_eq!(client.reconnect_phase(), ReconnectPhase::Closed);
    }

    #[tokio::test]
    async fn rejected_credentials_stop_all_sends() {
        let transport = FakeTransport::new();
        transport.respond(|frame| {
            frame
                .contains(r#""type":"auth""#)
                .then(|| r#"{"type":"auth_invalid","message":"bad token"}"#.to_owned())
        });
        let client = Client::with_parts(
            "ws://matter.local:5580/ws",
            config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::new(AccessToken::new("expired".to_owned())),
            Arc::new(JsonParser),
        )
        .unwrap();

        assert!(client.send(&request("get_nodes")).await.unwrap().is_none());
        assert_eq!(client.state(), ConnectionState::ClosedAuth);

        assert!(client.send(&request("get_nodes")).await.unwrap().is_none());
        let err = client.try_connect().await.unwrap_err();
        assert_eq!(err.kind(), Kind::Authorization);
        assert_eq!(transport.opens(), 1);
        assert_eq!(transport.sent_texts().len(), 1);
    }

    #[tokio::test]
    async fn unanswered_handshake_reopens_on_next_connect() {
        let transport = FakeTransport::new();
        let mut config = config();
        config.auth_timeout = Duration::from_millis(50);
        let client = Client::with_parts(
            "ws://matter.local:5580/ws",
            config,
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::new(AccessToken::new("token".to_owned())),
            Arc::new(JsonParser),
        )
        .unwrap();

        assert!(!client.connect().await);
        assert_eq!(client.state(), ConnectionState::ClosedOther);
        assert!(!client.connect().await);

        assert_eq!(transport.opens(), 2);
        assert_eq!(transport.sent_texts().len(), 2);
    }

    #[tokio::test]
    async fn null_result_is_a_reply() {
        let transport = FakeTransport::new();
        transport.respond(|frame| {
            Some(json!({ "message_id": message_id(frame), "result": null }).to_string())
        });
        let client = client(&transport);

        let reply = client
            .send(&request("set_wifi_credentials"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(reply.result, Some(Value::Null));
        assert_eq!(client.pending_count(), 0);
    }

    #[tokio::test]
    async fn auth_reply_is_not_dispatched() {
        let transport = FakeTransport::new();
        transport.respond(|frame| {
            if frame.contains(r#""type":"auth""#) {
                Some(r#"{"type":"auth_ok"}"#.to_owned())
            } else {
                Some(json!({ "message_id": message_id(frame), "result": { "ok": true } }).to_string())
            }
        });
        let client = Client::with_parts(
            "ws://matter.local:5580/ws",
            config(),
            Arc::clone(&transport) as Arc<dyn Transport>,
            Arc::new(AccessToken::new("token".to_owned())),
            Arc::new(JsonParser),
        )
        .unwrap();

        let reply = client.send(&request("get_nodes")).await.unwrap().unwrap();

        assert_eq!(reply.result, Some(json!({ "ok": true })));
        assert_eq!(client.state(), ConnectionState::Active);
        assert_eq!(transport.sent_texts().len(), 2);
    }

    #[tokio::test]
    async fn send_bytes_writes_binary_frame() {
        let transport = FakeTransport::new();
        let client = client(&transport);

        assert!(client.send_bytes(vec![0xde, 0xad]).await);

        assert_eq!(transport.sent_binaries(), vec![vec![0xde, 0xad]]);
    }

    #[test]
    fn http_endpoint_is_rewritten() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let _guard = runtime.enter();
        let client = Client::new("http://matter.local:5580/ws", Config::default()).unwrap();

        assert_eq!(client.endpoint().as_str(), "ws://matter.local:5580/ws");
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }
}
