//! In-memory transport for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::error::WsError;
use super::transport::{EventSink, Frame, Socket, Transport, TransportEvent};
use crate::Result;

type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

#[derive(Default)]
struct FakeState {
    opens: usize,
    fail_opens: bool,
    sinks: Vec<EventSink>,
    sent: Vec<Frame>,
    closes: Vec<u16>,
    responder: Option<Responder>,
    send_delay: Option<Duration>,
}

/// Records everything written and lets tests play the server.
#[derive(Default)]
pub(crate) struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Answer every text frame written with the frame returned by `responder`, if any.
    pub(crate) fn respond<F>(&self, responder: F)
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.state().responder = Some(Arc::new(responder));
    }

    pub(crate) fn fail_opens(&self, fail: bool) {
        self.state().fail_opens = fail;
    }

    pub(crate) fn send_delay(&self, delay: Duration) {
        self.state().send_delay = Some(delay);
    }

    pub(crate) fn opens(&self) -> usize {
        self.state().opens
    }

    pub(crate) fn sent_texts(&self) -> Vec<String> {
        self.state()
            .sent
            .iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => Some(text.clone()),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    pub(crate) fn sent_binaries(&self) -> Vec<Vec<u8>> {
        self.state()
            .sent
            .iter()
            .filter_map(|frame| match frame {
                Frame::Binary(bytes) => Some(bytes.clone()),
                Frame::Text(_) => None,
            })
            .collect()
    }

    pub(crate) fn closes(&self) -> Vec<u16> {
        self.state().closes.clone()
    }

    /// Most writes that were ever in progress at the same time.
    pub(crate) fn max_concurrent_sends(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Deliver a text frame on the most recently opened socket.
    pub(crate) fn push(&self, frame: &str) {
        let sink = self.state().sinks.last().cloned().unwrap();
        sink.emit(TransportEvent::Message(Frame::Text(frame.to_owned())));
    }

    /// Drop the most recently opened socket the way a dead peer would.
    pub(crate) fn drop_connection(&self) {
        let sink = self.state().sinks.last().cloned().unwrap();
        sink.emit(TransportEvent::Closing {
            code: 1006,
            reason: "connection reset".to_owned(),
        });
        sink.emit(TransportEvent::Closed {
            code: 1006,
            reason: "connection reset".to_owned(),
        });
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn open(
        &self,
        _url: &Url,
        _headers: &[(String, String)],
        sink: EventSink,
    ) -> Result<Arc<dyn Socket>> {
        let mut state = self.state();
        state.opens += 1;
        if state.fail_opens {
            return Err(WsError::ConnectionClosed.into());
        }
        state.sinks.push(sink.clone());
        drop(state);

        sink.emit(TransportEvent::Opened);
        Ok(Arc::new(FakeSocket {
            sink,
            state: Arc::clone(&self.state),
            in_flight: Arc::clone(&self.in_flight),
            max_in_flight: Arc::clone(&self.max_in_flight),
        }))
    }
}

struct FakeSocket {
    sink: EventSink,
    state: Arc<Mutex<FakeState>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

#[async_trait]
impl Socket for FakeSocket {
    async fn send(&self, frame: Frame) -> Result<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = self.state.lock().unwrap().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let reply = {
            let mut state = self.state.lock().unwrap();
            state.sent.push(frame.clone());
            match (&frame, &state.responder) {
                (Frame::Text(text), Some(responder)) => responder(text),
                _ => None,
            }
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(reply) = reply {
            self.sink
                .emit(TransportEvent::Message(Frame::Text(reply)));
        }
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) {
        self.state.lock().unwrap().closes.push(code);
        self.sink.emit(TransportEvent::Closing {
            code,
            reason: reason.to_owned(),
        });
        self.sink.emit(TransportEvent::Closed {
            code,
            reason: reason.to_owned(),
        });
    }
}
