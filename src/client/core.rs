//! DDP session and command builders.
//!
//! [`DdpClient`] owns the session state, the correlation table, the event
//! bus and the current transport. All command operations are
//! fire-and-forget: they return the correlation id immediately and the
//! outcome arrives later through the registered [`Listener`](super::Listener)
//! or the [`EventBus`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::{Codec, Envelope, message};
use crate::transport::{ReadyState, Transport, TransportFactory, TransportHandler};

use super::builder::ClientBuilder;
use super::bus::EventBus;
use super::correlation::CorrelationTable;
use super::listener::SharedListener;
use super::state::ConnectionState;

// ============================================================================
// TransportSlot
// ============================================================================

/// Current transport and whether `open` was already called on it.
#[derive(Default)]
struct TransportSlot {
    transport: Option<Arc<dyn Transport>>,
    connection_started: bool,
}

// ============================================================================
// Inner
// ============================================================================

/// Session state shared between the client handle and the transport handler.
pub(super) struct Inner {
    pub(super) address: Url,
    pub(super) codec: Arc<dyn Codec>,
    factory: Arc<dyn TransportFactory>,
    pub(super) state: RwLock<ConnectionState>,
    pub(super) session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
    pub(super) listeners: CorrelationTable,
    pub(super) bus: EventBus,
    slot: Mutex<TransportSlot>,
}

impl Inner {
    /// Returns a fresh correlation id.
    fn next_id(&self) -> CommandId {
        CommandId::new(self.next_id.fetch_add(1, Ordering::AcqRel).wrapping_add(1))
    }

    fn transport(&self) -> Option<Arc<dyn Transport>> {
        self.slot.lock().transport.clone()
    }

    pub(super) fn set_state(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.state.write(), state);
        if previous != state {
            debug!(?previous, current = ?state, "Session state changed");
        }
    }

    /// Registers the listener, attaches the id and sends.
    fn issue(&self, mut envelope: Envelope, listener: Option<SharedListener>) -> CommandId {
        let id = self.next_id();

        if let Some(listener) = listener {
            self.listeners.insert(id.to_string(), listener);
        }

        envelope.set_id(id);
        self.send(&envelope);
        id
    }

    /// Encodes and hands an envelope to the transport.
    ///
    /// A send against a missing or non-open transport closes the session
    /// and dispatches a synthetic `error` envelope.
    pub(super) fn send(&self, envelope: &Envelope) {
        let text = match self.codec.encode(envelope) {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Failed to encode DDP message");
                return;
            }
        };

        debug!(message = %text, "Sending DDP message");

        let result = match self.transport() {
            Some(transport) => transport.send(text),
            None => Err(Error::NotConnected),
        };

        if let Err(e) = result {
            warn!(error = %e, "Send failed, closing session");
            self.set_state(ConnectionState::Closed);
            self.dispatch(message::transport_error(&e.to_string()));
        }
    }

    /// Decodes inbound text and dispatches it.
    ///
    /// Text that fails to decode is logged and dropped.
    pub(super) fn receive(&self, text: &str) {
        debug!(message = %text, "Received DDP message");

        match self.codec.decode(text) {
            Ok(envelope) => self.dispatch(envelope),
            Err(e) => warn!(error = %e, "Dropping undecodable message"),
        }
    }
}

// ============================================================================
// SessionHandler
// ============================================================================

/// Transport callbacks routed into the session.
///
/// Holds a weak reference so a running transport task does not keep the
/// session alive.
struct SessionHandler {
    inner: Weak<Inner>,
}

impl TransportHandler for SessionHandler {
    fn on_open(&self) {
        if let Some(inner) = self.inner.upgrade() {
            trace!(version = message::PROTOCOL_VERSION, "Transport open, sending connect");
            inner.send(&message::connect());
        }
    }

    fn on_message(&self, text: &str) {
        if let Some(inner) = self.inner.upgrade() {
            inner.receive(text);
        }
    }

    fn on_error(&self, text: &str) {
        if let Some(inner) = self.inner.upgrade() {
            debug!(error = %text, "Transport error");
            inner.dispatch(message::transport_error(text));
        }
    }

    fn on_close(&self, code: u16, reason: &str, remote: bool) {
        if let Some(inner) = self.inner.upgrade() {
            debug!(code, reason, remote, "Transport closed");
            inner.dispatch(message::closed(code, reason, remote));
        }
    }
}

// ============================================================================
// DdpClient
// ============================================================================

/// DDP client session.
///
/// Cheap to clone; clones share the same session.
///
/// # Example
///
/// ```no_run
/// use ddp_client::{CallbackListener, DdpClient, Result};
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let client = DdpClient::new("localhost", Some(3000), false)?;
///     client.events().subscribe(|envelope| println!("{envelope:?}"));
///     client.connect()?;
///
///     let listener = CallbackListener::new()
///         .with_ready(|id| println!("subscription {id} ready"))
///         .into_shared();
///     client.subscribe("todos", vec![], Some(listener));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DdpClient {
    inner: Arc<Inner>,
}

// ============================================================================
// DdpClient - Constructors
// ============================================================================

impl DdpClient {
    /// Creates a client for `ws[s]://{host}:{port}/websocket`.
    ///
    /// `port` defaults to 3000.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the address is invalid.
    pub fn new(host: impl Into<String>, port: Option<u16>, ssl: bool) -> Result<Self> {
        let mut builder = ClientBuilder::new().host(host).ssl(ssl);
        if let Some(port) = port {
            builder = builder.port(port);
        }
        builder.build()
    }

    /// Creates a builder for custom configuration.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(super) fn from_parts(
        address: Url,
        codec: Arc<dyn Codec>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                address,
                codec,
                factory,
                state: RwLock::new(ConnectionState::Disconnected),
                session_id: Mutex::new(None),
                next_id: AtomicU64::new(0),
                listeners: CorrelationTable::new(),
                bus: EventBus::new(),
                slot: Mutex::new(TransportSlot::default()),
            }),
        }
    }
}

impl fmt::Debug for DdpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DdpClient")
            .field("address", &self.inner.address.as_str())
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .field("pending", &self.pending_count())
            .finish()
    }
}

// ============================================================================
// DdpClient - Connection
// ============================================================================

impl DdpClient {
    /// Starts connecting to the server.
    ///
    /// No-op if a connect was already started on the current transport. If
    /// the current transport is closed, a new one is created first. The
    /// handshake completes when a `connected` envelope is dispatched.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be created or opened.
    pub fn connect(&self) -> Result<()> {
        info!(address = %self.inner.address, "Connect requested");

        let transport = {
            let mut slot = self.inner.slot.lock();

            let stale = slot
                .transport
                .as_ref()
                .is_none_or(|transport| transport.ready_state() == ReadyState::Closed);

            if stale {
                let handler: Arc<dyn TransportHandler> = Arc::new(SessionHandler {
                    inner: Arc::downgrade(&self.inner),
                });
                slot.transport = Some(self.inner.factory.create(&self.inner.address, handler)?);
                slot.connection_started = false;
                debug!("Created new transport");
            }

            if slot.connection_started {
                debug!("Connect already started on this transport");
                return Ok(());
            }

            slot.connection_started = true;
            slot.transport.clone()
        };

        let Some(transport) = transport else {
            return Err(Error::connection("No transport available"));
        };

        if let Err(e) = transport.open() {
            self.inner.slot.lock().connection_started = false;
            return Err(e);
        }

        Ok(())
    }

    /// Requests a close if the transport is open.
    ///
    /// Completion is observed as a dispatched `closed` envelope.
    pub fn disconnect(&self) {
        if let Some(transport) = self.inner.transport()
            && transport.ready_state() == ReadyState::Open
        {
            info!(address = %self.inner.address, "Disconnect requested");
            transport.close();
        }
    }

    /// Current session state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.inner.state.read()
    }

    /// Session id from the last `connected` envelope.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.lock().clone()
    }

    /// Server address.
    #[inline]
    #[must_use]
    pub fn address(&self) -> &Url {
        &self.inner.address
    }

    /// Subscribers receiving every decoded inbound envelope.
    #[inline]
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.inner.bus
    }

    /// Number of commands still waiting on a terminal reply.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Returns `true` if a listener is still registered for the id.
    #[inline]
    #[must_use]
    pub fn is_pending(&self, id: CommandId) -> bool {
        self.inner.listeners.contains(&id.to_string())
    }
}

// ============================================================================
// DdpClient - Commands
// ============================================================================

impl DdpClient {
    /// Calls a server method.
    pub fn call(
        &self,
        method: &str,
        params: Vec<Value>,
        listener: Option<SharedListener>,
    ) -> CommandId {
        self.inner.issue(message::method(method, params), listener)
    }

    /// Subscribes to a server publication.
    pub fn subscribe(
        &self,
        name: &str,
        params: Vec<Value>,
        listener: Option<SharedListener>,
    ) -> CommandId {
        self.inner.issue(message::sub(name, params), listener)
    }

    /// Unsubscribes from a server publication.
    pub fn unsubscribe(&self, name: &str, listener: Option<SharedListener>) -> CommandId {
        self.inner.issue(message::unsub(name), listener)
    }

    /// Inserts one document via `/{collection}/insert`.
    pub fn collection_insert(
        &self,
        collection: &str,
        fields: Map<String, Value>,
        listener: Option<SharedListener>,
    ) -> CommandId {
        self.call(
            &message::collection_method(collection, "insert"),
            vec![Value::Object(fields)],
            listener,
        )
    }

    /// Updates one document by `_id` via `/{collection}/update`.
    ///
    /// `update` holds the update operators, e.g. `{"$set": {...}}`.
    pub fn collection_update(
        &self,
        collection: &str,
        doc_id: &str,
        update: Map<String, Value>,
        listener: Option<SharedListener>,
    ) -> CommandId {
        self.call(
            &message::collection_method(collection, "update"),
            vec![message::id_selector(doc_id), Value::Object(update)],
            listener,
        )
    }

    /// Removes one document by `_id` via `/{collection}/remove`.
    pub fn collection_delete(
        &self,
        collection: &str,
        doc_id: &str,
        listener: Option<SharedListener>,
    ) -> CommandId {
        self.call(
            &message::collection_method(collection, "remove"),
            vec![message::id_selector(doc_id)],
            listener,
        )
    }

    /// Encodes and sends a raw envelope.
    pub fn send(&self, envelope: &Envelope) {
        self.inner.send(envelope);
    }

    /// Feeds inbound text through the dispatcher, as if the transport had
    /// delivered it.
    pub fn receive(&self, text: &str) {
        self.inner.receive(text);
    }
}

// ============================================================================
// Tests
// ============================================================================
