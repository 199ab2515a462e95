//! Transport seam between the client and the underlying WebSocket.
//!
//! A [`Transport`] opens sockets; each socket reports its lifecycle as
//! [`TransportEvent`]s on an [`EventSink`]. Events are tagged with the epoch of the
//! connection attempt that produced them so that late events from a superseded socket
//! can be told apart from events of the current one.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt as _, StreamExt as _};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest as _;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use url::Url;

use super::error::WsError;
use crate::Result;
use crate::error::{Error, Kind};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code reported when the peer closes without a status.
const NO_STATUS_CODE: u16 = 1005;
/// Close code reported when the stream ends without a close frame.
const ABNORMAL_CLOSE_CODE: u16 = 1006;

/// A single WebSocket data frame.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// Text frame
    Text(String),
    /// Binary frame
    Binary(Vec<u8>),
}

/// Lifecycle and data events reported by a socket.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket is open
    Opened,
    /// A frame arrived
    Message(Frame),
    /// The peer started the closing handshake
    Closing {
        /// Close status code
        code: u16,
        /// Close reason
        reason: String,
    },
    /// The socket is fully closed
    Closed {
        /// Close status code
        code: u16,
        /// Close reason
        reason: String,
    },
    /// The socket failed
    Failure(String),
}

/// A [`TransportEvent`] stamped with the epoch of the connection that emitted it.
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct TaggedEvent {
    /// Connection epoch
    pub epoch: u64,
    /// The event itself
    pub event: TransportEvent,
}

/// Where a socket reports its events.
#[derive(Clone, Debug)]
pub struct EventSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    pub(crate) fn new(epoch: u64, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { epoch, tx }
    }

    /// Epoch of the connection attempt this sink belongs to.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Report an event. Returns `false` once the client has been dropped.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }
}

/// Opens sockets against a WebSocket endpoint.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open a socket. Events for the socket, including [`TransportEvent::Opened`], go to
    /// `sink`.
    async fn open(
        &self,
        url: &Url,
        headers: &[(String, String)],
        sink: EventSink,
    ) -> Result<Arc<dyn Socket>>;
}

/// Write side of an open socket.
#[async_trait]
pub trait Socket: Send + Sync + 'static {
    /// Write one complete frame.
    async fn send(&self, frame: Frame) -> Result<()>;

    /// Start the closing handshake. Does not wait for it to finish.
    fn close(&self, code: u16, reason: &str);
}

/// [`Transport`] backed by `tokio-tungstenite`.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default)]
pub struct TungsteniteTransport;

enum Outgoing {
    Frame(Frame),
    Close { code: u16, reason: String },
}

struct TungsteniteSocket {
    outgoing: mpsc::UnboundedSender<Outgoing>,
}

#[async_trait]
impl Transport for TungsteniteTransport {
    async fn open(
        &self,
        url: &Url,
        headers: &[(String, String)],
        sink: EventSink,
    ) -> Result<Arc<dyn Socket>> {
        let mut request = url.as_str().into_client_request()?;
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::with_source(Kind::Validation, e))?;
            let value =
                HeaderValue::from_str(value).map_err(|e| Error::with_source(Kind::Validation, e))?;
            request.headers_mut().insert(name, value);
        }

        let (ws_stream, _) = connect_async(request).await?;
        let (write, read) = ws_stream.split();
        let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();

        sink.emit(TransportEvent::Opened);

        tokio::spawn(write_loop(write, outgoing_rx, sink.clone()));
        tokio::spawn(read_loop(read, sink));

        Ok(Arc::new(TungsteniteSocket {
            outgoing: outgoing_tx,
        }))
    }
}

#[async_trait]
impl Socket for TungsteniteSocket {
    async fn send(&self, frame: Frame) -> Result<()> {
        self.outgoing
            .send(Outgoing::Frame(frame))
            .map_err(|_e| WsError::ConnectionClosed)?;
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) {
        _ = self.outgoing.send(Outgoing::Close {
            code,
            reason: reason.to_owned(),
        });
    }
}

/// Forward frames queued by [`TungsteniteSocket`] to the sink half, in order.
async fn write_loop(
    mut write: SplitSink<WsStream, Message>,
    mut outgoing_rx: mpsc::UnboundedReceiver<Outgoing>,
    sink: EventSink,
) {
    while let Some(outgoing) = outgoing_rx.recv().await {
        let (message, closing) = match outgoing {
            Outgoing::Frame(Frame::Text(text)) => (Message::Text(text.into()), false),
            Outgoing::Frame(Frame::Binary(bytes)) => (Message::Binary(bytes.into()), false),
            Outgoing::Close { code, reason } => (
                Message::Close(Some(CloseFrame {
                    code: CloseCode::from(code),
                    reason: reason.into(),
                })),
                true,
            ),
        };

        if let Err(e) = write.send(message).await {
            sink.emit(TransportEvent::Failure(e.to_string()));
            break;
        }
        if closing {
            break;
        }
    }
}

/// Turn the stream half into [`TransportEvent`]s until the socket ends.
async fn read_loop(mut read: SplitStream<WsStream>, sink: EventSink) {
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                sink.emit(TransportEvent::Message(Frame::Text(text.as_str().to_owned())));
            }
            Ok(Message::Binary(bytes)) => {
                sink.emit(TransportEvent::Message(Frame::Binary(bytes.to_vec())));
            }
            Ok(Message::Close(frame)) => {
                let (code, reason) = frame.map_or_else(
                    || (NO_STATUS_CODE, String::new()),
                    |f| (u16::from(f.code), f.reason.as_str().to_owned()),
                );
                sink.emit(TransportEvent::Closing {
                    code,
                    reason: reason.clone(),
                });
                sink.emit(TransportEvent::Closed { code, reason });
                return;
            }
            Err(e) => {
                sink.emit(TransportEvent::Failure(e.to_string()));
                return;
            }
            _ => {
                // Ping/pong are answered by tungstenite itself.
            }
        }
    }

    sink.emit(TransportEvent::Closed {
        code: ABNORMAL_CLOSE_CODE,
        reason: "stream ended".to_owned(),
    });
}
