//! Gemini Live transport over a WebSocket.
//!
//! `connect()` spawns one connection task per session on the runtime the
//! transport was created in and returns a [`GeminiSession`] handle at once.
//! The task performs the handshake, sends the `setup` frame, then
//! multiplexes queued outbound frames and inbound server frames until
//! either side closes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dambru_core::{
    EncodedFrame, LiveConnectConfig, LivePortError, LiveSessionHandle, LiveTransport, SendFailure,
    TransportEvent, TransportEventSink,
};
use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle;
use tokio::sync::{Notify, mpsc};
use tokio::sync::mpsc::error::TrySendError;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::config::LiveClientConfig;
use crate::error::{LiveError, LiveResult};
use crate::protocol::{self, ServerFrame};

/// Capture frames that may wait for the socket writer. A frame sent while
/// the queue is full is dropped with a [`SendFailure`].
pub const OUTBOUND_QUEUE_FRAMES: usize = 1;

/// Production [`LiveTransport`] for the Gemini Live API.
pub struct GeminiLiveTransport {
    config: LiveClientConfig,
    runtime: Handle,
}

impl GeminiLiveTransport {
    /// Create a transport bound to the current tokio runtime.
    pub fn new(config: LiveClientConfig) -> LiveResult<Self> {
        let runtime = Handle::try_current().map_err(|e| LiveError::NoRuntime(e.to_string()))?;
        Ok(Self { config, runtime })
    }

    /// Create a transport that spawns its tasks on `runtime`.
    pub const fn with_runtime(config: LiveClientConfig, runtime: Handle) -> Self {
        Self { config, runtime }
    }

    pub const fn config(&self) -> &LiveClientConfig {
        &self.config
    }
}

impl LiveTransport for GeminiLiveTransport {
    fn connect(
        &self,
        config: LiveConnectConfig,
        on_event: TransportEventSink,
    ) -> Result<Arc<dyn LiveSessionHandle>, LivePortError> {
        let url = self.config.live_url()?;
        let setup = protocol::setup_message(&config)?;

        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_FRAMES);
        let closed = Arc::new(AtomicBool::new(false));
        let close_requested = Arc::new(Notify::new());
        let events = EventGate {
            sink: on_event,
            closed: Arc::clone(&closed),
        };

        tracing::debug!(model = %config.model, voice = %config.voice_id, "Opening live connection");
        self.runtime.spawn(run_connection(
            url,
            setup,
            self.config.connect_timeout,
            outbound_rx,
            Arc::clone(&close_requested),
            events,
        ));

        Ok(Arc::new(GeminiSession {
            outbound: outbound_tx,
            closed,
            close_requested,
        }))
    }
}

/// Handle to one live connection.
pub struct GeminiSession {
    outbound: mpsc::Sender<String>,
    closed: Arc<AtomicBool>,
    close_requested: Arc<Notify>,
}

impl LiveSessionHandle for GeminiSession {
    fn send_audio(&self, frame: EncodedFrame) -> Result<(), SendFailure> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SendFailure("session closed".to_string()));
        }
        let text =
            protocol::realtime_input_message(&frame).map_err(|e| SendFailure(e.to_string()))?;
        self.outbound.try_send(text).map_err(|err| match err {
            TrySendError::Full(_) => SendFailure("outbound queue is full".to_string()),
            TrySendError::Closed(_) => SendFailure("connection is gone".to_string()),
        })
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.close_requested.notify_one();
        }
    }
}

/// Forwards events unless the handle has been closed locally.
struct EventGate {
    sink: TransportEventSink,
    closed: Arc<AtomicBool>,
}

impl EventGate {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn emit(&self, event: TransportEvent) {
        if !self.is_closed() {
            (self.sink)(event);
        }
    }
}

async fn run_connection(
    url: Url,
    setup: String,
    connect_timeout: Duration,
    mut outbound: mpsc::Receiver<String>,
    close_requested: Arc<Notify>,
    events: EventGate,
) {
    let stream = match tokio::time::timeout(connect_timeout, connect_async(url.as_str())).await {
        Ok(Ok((stream, _response))) => stream,
        Ok(Err(err)) => {
            tracing::error!(%err, "Live handshake failed");
            events.emit(TransportEvent::Error(format!("handshake failed: {err}")));
            return;
        }
        Err(_) => {
            tracing::error!(timeout_secs = connect_timeout.as_secs(), "Live handshake timed out");
            events.emit(TransportEvent::Error(format!(
                "connection timed out after {}s",
                connect_timeout.as_secs()
            )));
            return;
        }
    };

    let (mut write, mut read) = stream.split();
    if events.is_closed() {
        let _ = write.send(Message::Close(None)).await;
        return;
    }
    if let Err(err) = write.send(Message::Text(setup)).await {
        events.emit(TransportEvent::Error(format!("failed to send setup: {err}")));
        return;
    }

    let mut opened = false;
    loop {
        tokio::select! {
            () = close_requested.notified() => {
                let _ = write.send(Message::Close(None)).await;
                tracing::debug!("Live connection closed locally");
                break;
            }
            outgoing = outbound.recv() => match outgoing {
                Some(text) => {
                    if let Err(err) = write.send(Message::Text(text)).await {
                        tracing::error!(%err, "Live write failed");
                        events.emit(TransportEvent::Error(format!("write failed: {err}")));
                        break;
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    tracing::debug!("Live session handle dropped");
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => on_payload(text.as_bytes(), &mut opened, &events),
                Some(Ok(Message::Binary(data))) => on_payload(&data, &mut opened, &events),
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    events.emit(closed_event(opened, reason));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::error!(%err, "Live read failed");
                    events.emit(TransportEvent::Error(format!("read failed: {err}")));
                    break;
                }
                None => {
                    events.emit(closed_event(opened, None));
                    break;
                }
            },
        }
    }
}

fn closed_event(opened: bool, reason: Option<String>) -> TransportEvent {
    if opened {
        TransportEvent::Closed { reason }
    } else {
        let detail = reason.map(|r| format!(": {r}")).unwrap_or_default();
        TransportEvent::Error(format!("connection closed before setup completed{detail}"))
    }
}

fn on_payload(payload: &[u8], opened: &mut bool, events: &EventGate) {
    match protocol::parse_server_frame(payload) {
        Ok(ServerFrame::SetupComplete) => {
            if !*opened {
                *opened = true;
                tracing::info!("Live session setup complete");
                events.emit(TransportEvent::Opened);
            }
        }
        Ok(ServerFrame::Content(message)) => events.emit(TransportEvent::Message(message)),
        Ok(ServerFrame::GoAway { time_left }) => {
            tracing::warn!(
                time_left = time_left.as_deref().unwrap_or("unknown"),
                "Server will close the live session soon"
            );
        }
        Ok(ServerFrame::Ignored) => {}
        Err(err) => tracing::warn!(%err, "Ignoring unparseable live frame"),
    }
}
