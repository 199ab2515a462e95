#![allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    dead_code,
    reason = "Shared test fixtures; not every test file uses every helper"
)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt as _, StreamExt as _};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// Computes the server's answer to a text frame, if any.
pub type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Mock Matter server.
pub struct MockMatterServer {
    addr: SocketAddr,
    /// Broadcast messages to ALL connected clients
    message_tx: broadcast::Sender<String>,
    /// Drops every open connection without a close frame
    kill_tx: broadcast::Sender<()>,
    /// Receives text frames sent by clients
    request_rx: mpsc::UnboundedReceiver<String>,
    /// Receives close codes sent by clients
    close_rx: mpsc::UnboundedReceiver<u16>,
    connections: Arc<AtomicUsize>,
    user_agents: Arc<Mutex<Vec<String>>>,
}

impl MockMatterServer {
    /// Start a server that never answers on its own.
    pub async fn start() -> Self {
        Self::with_responder(Arc::new(|_: &str| -> Option<String> { None })).await
    }

    /// Start a mock server on a random port that answers frames with `responder`.
    pub async fn with_responder(responder: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (message_tx, _) = broadcast::channel::<String>(100);
        let (kill_tx, _) = broadcast::channel::<()>(4);
        let (request_tx, request_rx) = mpsc::unbounded_channel::<String>();
        let (close_tx, close_rx) = mpsc::unbounded_channel::<u16>();
        let connections = Arc::new(AtomicUsize::new(0));
        let user_agents = Arc::new(Mutex::new(Vec::new()));

        let broadcast_tx = message_tx.clone();
        let kill = kill_tx.clone();
        let accepted = Arc::clone(&connections);
        let agents = Arc::clone(&user_agents);

        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    break;
                };

                let agents = Arc::clone(&agents);
                let record_user_agent =
                    move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    if let Some(agent) = request
                        .headers()
                        .get("user-agent")
                        .and_then(|value| value.to_str().ok())
                    {
                        agents.lock().unwrap().push(agent.to_owned());
                    }
                    Ok(response)
                };
                let Ok(ws_stream) =
                    tokio_tungstenite::accept_hdr_async(stream, record_user_agent).await
                else {
                    continue;
                };
                accepted.fetch_add(1, Ordering::SeqCst);

                let (mut write, mut read) = ws_stream.split();
                let request_tx = request_tx.clone();
                let close_tx = close_tx.clone();
                let responder = Arc::clone(&responder);
                let mut msg_rx = broadcast_tx.subscribe();
                let mut kill_rx = kill.subscribe();

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    loop {
                        tokio::select! {
                            // Handle incoming messages from client
                            msg = read.next() => {
                                match msg {
                                    Some(Ok(Message::Text(text))) => {
                                        let text = text.as_str().to_owned();
                                        let reply = responder(&text);
                                        drop(request_tx.send(text));
                                        if let Some(reply) = reply
                                            && write.send(Message::Text(reply.into())).await.is_err()
                                        {
                                            break;
                                        }
                                    }
                                    Some(Ok(Message::Close(frame))) => {
                                        let code = frame.map_or(1005, |f| u16::from(f.code));
                                        drop(close_tx.send(code));
                                        break;
                                    }
                                    Some(Ok(_)) => {}
                                    _ => break,
                                }
                            }
                            // Handle outgoing messages to client
                            msg = msg_rx.recv() => {
                                match msg {
                                    Ok(text) => {
                                        if write.send(Message::Text(text.into())).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(_) => break,
                                }
                            }
                            _ = kill_rx.recv() => break,
                        }
                    }
                });
            }
        });

        Self {
            addr,
            message_tx,
            kill_tx,
            request_rx,
            close_rx,
            connections,
            user_agents,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Send a message to all connected clients.
    pub fn send(&self, message: &str) {
        drop(self.message_tx.send(message.to_owned()));
    }

    /// Drop every open connection the way a crashed server would.
    pub fn drop_connections(&self) {
        drop(self.kill_tx.send(()));
    }

    /// Receive the next text frame sent by a client.
    pub async fn recv_request(&mut self) -> Option<Value> {
        let text = timeout(Duration::from_secs(2), self.request_rx.recv())
            .await
            .ok()
            .flatten()?;
        serde_json::from_str(&text).ok()
    }

    /// Receive the next close code sent by a client.
    pub async fn recv_close(&mut self) -> Option<u16> {
        timeout(Duration::from_secs(2), self.close_rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Number of WebSocket connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn user_agents(&self) -> Vec<String> {
        self.user_agents.lock().unwrap().clone()
    }
}

/// `message_id` of a command frame.
pub fn message_id(frame: &str) -> Option<String> {
    let value: Value = serde_json::from_str(frame).ok()?;
    value["message_id"].as_str().map(str::to_owned)
}

/// Answer every command with `result`, and `auth` frames with `auth_ok`.
pub fn reply_with(result: Value) -> Responder {
    Arc::new(move |frame: &str| {
        if frame.contains(r#""type":"auth""#) {
            return Some(json!({ "type": "auth_ok" }).to_string());
        }
        let id = message_id(frame)?;
        Some(json!({ "message_id": id, "result": result }).to_string())
    })
}

/// Reject every `auth` frame.
pub fn reject_auth() -> Responder {
    Arc::new(|frame: &str| {
        frame
            .contains(r#""type":"auth""#)
            .then(|| json!({ "type": "auth_invalid", "message": "Invalid access token" }).to_string())
    })
}
