//! WebSocket transport and event loop.
//!
//! Each opened [`WebSocketTransport`] spawns a tokio task that owns the
//! socket. The task handles:
//!
//! - Opening the client connection
//! - Incoming text frames, forwarded to the [`TransportHandler`]
//! - Outgoing frames queued by [`Transport::send`]
//! - Close requests and remote closes
//!
//! `send` never blocks: frames go through an unbounded channel to the task.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::{ReadyState, Transport, TransportFactory, TransportHandler};

// ============================================================================
// Constants
// ============================================================================

/// Close code for a normal, locally requested close.
const CLOSE_NORMAL: u16 = 1000;

/// Close code reported when the connection dropped without a close frame.
const CLOSE_ABNORMAL: u16 = 1006;

// ============================================================================
// TransportCommand
// ============================================================================

/// Internal commands for the event loop.
enum TransportCommand {
    /// Send a text frame.
    Send(String),
    /// Close the connection.
    Close,
}

// ============================================================================
// WebSocketTransport
// ============================================================================

/// WebSocket client transport.
///
/// Single use: once closed, a new instance must be created.
pub struct WebSocketTransport {
    /// Server address.
    address: Url,
    /// Receiver of inbound activity (shared with event loop).
    handler: Arc<dyn TransportHandler>,
    /// Raw [`ReadyState`] (shared with event loop).
    state: Arc<AtomicU8>,
    /// Channel to the event loop, set by `open`.
    command_tx: Mutex<Option<mpsc::UnboundedSender<TransportCommand>>>,
}

impl WebSocketTransport {
    /// Creates an unopened transport.
    #[must_use]
    pub fn new(address: Url, handler: Arc<dyn TransportHandler>) -> Self {
        Self {
            address,
            handler,
            state: Arc::new(AtomicU8::new(ReadyState::NotYetConnected as u8)),
            command_tx: Mutex::new(None),
        }
    }

    /// Returns the server address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &Url {
        &self.address
    }

    fn set_state(state: &AtomicU8, value: ReadyState) {
        state.store(value as u8, Ordering::Release);
    }

    /// Event loop that owns the WebSocket.
    async fn run_event_loop(
        address: Url,
        mut command_rx: mpsc::UnboundedReceiver<TransportCommand>,
        handler: Arc<dyn TransportHandler>,
        state: Arc<AtomicU8>,
    ) {
        let ws_stream = match connect_async(address.as_str()).await {
            Ok((stream, _)) => stream,
            Err(e) => {
                error!(%address, error = %e, "WebSocket connect failed");
                Self::set_state(&state, ReadyState::Closed);
                let message = Error::from(e).to_string();
                handler.on_error(&message);
                handler.on_close(CLOSE_ABNORMAL, &message, false);
                return;
            }
        };

        debug!(%address, "WebSocket connection opened");
        Self::set_state(&state, ReadyState::Open);
        handler.on_open();

        let (mut ws_write, mut ws_read) = ws_stream.split();

        let (code, reason, remote) = loop {
            tokio::select! {
                // Incoming frames from server
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            handler.on_message(text.as_str());
                        }

                        Some(Ok(Message::Close(frame))) => {
                            debug!(?frame, "WebSocket closed by remote");
                            // Flushes the queued close reply
                            if let Err(e) = ws_write.close().await {
                                trace!(error = %e, "Close reply not sent");
                            }
                            break match frame {
                                Some(frame) => (
                                    u16::from(frame.code),
                                    frame.reason.as_str().to_string(),
                                    true,
                                ),
                                None => (CLOSE_NORMAL, String::new(), true),
                            };
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            let message = Error::from(e).to_string();
                            handler.on_error(&message);
                            break (CLOSE_ABNORMAL, message, true);
                        }

                        None => {
                            debug!("WebSocket stream ended");
                            break (CLOSE_ABNORMAL, String::new(), true);
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                // Commands from the session
                command = command_rx.recv() => {
                    match command {
                        Some(TransportCommand::Send(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(error = %e, "Failed to send frame");
                                let message = Error::from(e).to_string();
                                handler.on_error(&message);
                                break (CLOSE_ABNORMAL, message, false);
                            }
                            trace!("Frame sent");
                        }

                        Some(TransportCommand::Close) => {
                            debug!("Close command received");
                            let _ = ws_write.close().await;
                            break (CLOSE_NORMAL, String::new(), false);
                        }

                        None => {
                            debug!("Command channel closed");
                            let _ = ws_write.close().await;
                            break (CLOSE_NORMAL, String::new(), false);
                        }
                    }
                }
            }
        };

        Self::set_state(&state, ReadyState::Closed);
        handler.on_close(code, &reason, remote);

        debug!(code, remote, "Event loop terminated");
    }
}

impl Transport for WebSocketTransport {
    fn open(&self) -> Result<()> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::connection(format!("No Tokio runtime: {e}")))?;

        self.state
            .compare_exchange(
                ReadyState::NotYetConnected as u8,
                ReadyState::Connecting as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| Error::connection("Transport was already opened"))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        *self.command_tx.lock() = Some(command_tx);

        runtime.spawn(Self::run_event_loop(
            self.address.clone(),
            command_rx,
            Arc::clone(&self.handler),
            Arc::clone(&self.state),
        ));

        Ok(())
    }

    fn send(&self, text: String) -> Result<()> {
        if self.ready_state() != ReadyState::Open {
            return Err(Error::NotConnected);
        }

        let guard = self.command_tx.lock();
        let command_tx = guard.as_ref().ok_or(Error::NotConnected)?;
        command_tx
            .send(TransportCommand::Send(text))
            .map_err(|_| Error::NotConnected)
    }

    fn close(&self) {
        let _ = self.state.compare_exchange(
            ReadyState::Open as u8,
            ReadyState::Closing as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );

        if let Some(command_tx) = self.command_tx.lock().as_ref() {
            let _ = command_tx.send(TransportCommand::Close);
        }
    }

    #[inline]
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::Acquire))
    }
}

// ============================================================================
// WebSocketFactory
// ============================================================================

/// Creates [`WebSocketTransport`] instances.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketFactory;

impl TransportFactory for WebSocketFactory {
    fn create(
        &self,
        address: &Url,
        handler: Arc<dyn TransportHandler>,
    ) -> Result<Arc<dyn Transport>> {
        Ok(Arc::new(WebSocketTransport::new(address.clone(), handler)))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use tokio::time::timeout;

    /// Events observed by [`RecordingHandler`].
    #[derive(Debug, PartialEq)]
    enum Observed {
        Open,
        Message(String),
        Error(String),
        Close(u16, bool),
    }

    struct RecordingHandler {
        tx: mpsc::UnboundedSender<Observed>,
    }

    impl TransportHandler for RecordingHandler {
        fn on_open(&self) {
            let _ = self.tx.send(Observed::Open);
        }

        fn on_message(&self, text: &str) {
            let _ = self.tx.send(Observed::Message(text.to_string()));
        }

        fn on_error(&self, text: &str) {
            let _ = self.tx.send(Observed::Error(text.to_string()));
        }

        fn on_close(&self, code: u16, _reason: &str, remote: bool) {
            let _ = self.tx.send(Observed::Close(code, remote));
        }
    }

    fn transport(address: &str) -> (WebSocketTransport, mpsc::UnboundedReceiver<Observed>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let url = Url::parse(address).expect("valid url");
        (WebSocketTransport::new(url, Arc::new(RecordingHandler { tx })), rx)
    }

    #[test]
    fn test_send_before_open_fails() {
        let (transport, _rx) = transport("ws://127.0.0.1:1/websocket");
        assert_eq!(transport.ready_state(), ReadyState::NotYetConnected);
        assert!(matches!(
            transport.send("{}".to_string()),
            Err(Error::NotConnected)
        ));
    }

    #[test]
    fn test_open_without_runtime_fails() {
        let (transport, _rx) = transport("ws://127.0.0.1:1/websocket");
        let err = transport.open().unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(transport.ready_state(), ReadyState::NotYetConnected);
    }

    #[tokio::test]
    async fn test_refused_connection_reports_error_then_close() {
        let (transport, mut rx) = transport("ws://127.0.0.1:1/websocket");
        transport.open().expect("open starts");
        assert!(transport.open().is_err());

        let first = timeout(Duration::from_secs(5), rx.recv()).await.expect("event");
        let second = timeout(Duration::from_secs(5), rx.recv()).await.expect("event");

        assert!(matches!(
            first,
            Some(Observed::Error(ref text)) if text.starts_with("WebSocket error:")
        ));
        assert_eq!(second, Some(Observed::Close(CLOSE_ABNORMAL, false)));
        assert_eq!(transport.ready_state(), ReadyState::Closed);
        assert!(transport.send("{}".to_string()).is_err());
    }

    #[test]
    fn test_factory_creates_unopened_transport() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let url = Url::parse("ws://localhost:3000/websocket").expect("valid url");
        let transport = WebSocketFactory
            .create(&url, Arc::new(RecordingHandler { tx }))
            .expect("create");
        assert_eq!(transport.ready_state(), ReadyState::NotYetConnected);
    }
}
