//! Inbound message dispatcher.
//!
//! Single entry point for everything the session receives: server messages
//! and the `closed`/`error` envelopes synthesized from transport events.
//!
//! | `msg` | Effect |
//! |-------|--------|
//! | `updated` | `on_updated` for each listed method id, entry kept |
//! | `ready` | `on_ready` for each listed subscription id, entry kept |
//! | `nosub` | `on_no_sub`, entry removed |
//! | `result` | `on_result`, entry removed |
//! | `connected` | state → Connected, session id stored |
//! | `closed` | state → Closed |
//! | `ping` | reply `pong`, echoing the id |
//! | `pong` | nothing |
//!
//! The envelope is then republished to every bus subscriber, after all
//! state changes above.

// ============================================================================
// Imports
// ============================================================================

use tracing::{debug, trace, warn};

use crate::protocol::{Envelope, field, message, msg_type};

use super::core::Inner;
use super::state::ConnectionState;

// ============================================================================
// Dispatch
// ============================================================================

impl Inner {
    /// Dispatches one decoded envelope.
    ///
    /// Envelopes without a `msg` field (e.g. the `server_id` hello) are
    /// dropped without republication.
    pub(super) fn dispatch(&self, envelope: Envelope) {
        let Some(msg) = envelope.msg() else {
            match envelope.get_str(field::SERVER_ID) {
                Some(server_id) => trace!(server_id, "Server hello"),
                None => trace!("Ignoring envelope without msg"),
            }
            return;
        };

        match msg {
            msg_type::UPDATED => {
                for id in envelope.string_list(field::METHODS) {
                    if let Some(listener) = self.listeners.get(id) {
                        trace!(id, "Dispatching updated");
                        listener.on_updated(id);
                    }
                }
            }

            msg_type::READY => {
                for id in envelope.string_list(field::SUBS) {
                    if let Some(listener) = self.listeners.get(id) {
                        trace!(id, "Dispatching ready");
                        listener.on_ready(id);
                    }
                }
            }

            msg_type::NOSUB => {
                if let Some(id) = envelope.id()
                    && let Some(listener) = self.listeners.remove(id)
                {
                    trace!(id, "Dispatching nosub");
                    listener.on_no_sub(id, envelope.get(field::ERROR));
                }
            }

            msg_type::RESULT => match envelope.id() {
                Some(id) => match self.listeners.remove(id) {
                    Some(listener) => {
                        trace!(id, "Dispatching result");
                        listener.on_result(&envelope);
                    }
                    None => trace!(id, "Result without listener"),
                },
                None => warn!("Result without id"),
            },

            msg_type::CONNECTED => {
                *self.session_id.lock() = envelope.get_str(field::SESSION).map(str::to_string);
                self.set_state(ConnectionState::Connected);
            }

            msg_type::FAILED => {
                warn!(
                    version = envelope.get_str(field::VERSION),
                    "Server rejected protocol version"
                );
            }

            msg_type::CLOSED => {
                *self.session_id.lock() = None;
                self.set_state(ConnectionState::Closed);
            }

            msg_type::PING => {
                self.send(&message::pong(envelope.get(field::ID)));
            }

            // Liveness monitoring is not handled at this layer.
            msg_type::PONG => {}

            msg_type::ERROR => {
                debug!(
                    source = envelope.get_str(field::SOURCE),
                    error = envelope.get_str(field::ERRORMSG),
                    "Error envelope"
                );
            }

            _ => {}
        }

        self.bus.publish(&envelope);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use url::Url;

    use crate::client::{CallbackListener, ConnectionState, DdpClient};
    use crate::protocol::JsonCodec;
    use crate::transport::WebSocketFactory;

    fn client() -> DdpClient {
        DdpClient::from_parts(
            Url::parse("ws://127.0.0.1:1/websocket").expect("valid url"),
            Arc::new(JsonCodec),
            Arc::new(WebSocketFactory),
        )
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        (Arc::clone(&count), count)
    }

    #[test]
    fn test_missing_msg_is_not_republished() {
        let client = client();
        let (_, mut rx) = client.events().channel();

        client.receive(r#"{"server_id":"GqrKrbcSeDfTYDkzQ"}"#);
        assert!(rx.try_recv().is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.receive(r#"{"id":"1"}"#);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_undecodable_text_is_dropped() {
        let client = client();
        let (_, mut rx) = client.events().channel();

        client.receive("{not json");
        assert!(rx.try_recv().is_err());
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_connected_sets_state_and_session() {
        let client = client();
        client.receive(r#"{"msg":"connected","session":"abc"}"#);

        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client.session_id().as_deref(), Some("abc"));

        client.receive(r#"{"msg":"closed","code":1000,"reason":"","remote":true}"#);
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(client.session_id(), None);
    }

    #[test]
    fn test_updated_keeps_entry() {
        let client = client();
        let (updated, seen) = counter();
        let listener = CallbackListener::new()
            .with_updated(move |_| {
                updated.fetch_add(1, Ordering::SeqCst);
            })
            .into_shared();

        let id = client.call("m", vec![], Some(listener));
        let text = format!(r#"{{"msg":"updated","methods":["{id}","999"]}}"#);
        client.receive(&text);
        client.receive(&text);

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert!(client.is_pending(id));
    }

    #[test]
    fn test_nosub_without_listener_is_republished() {
        let client = client();
        let (_, mut rx) = client.events().channel();

        client.receive(r#"{"msg":"nosub","id":"77"}"#);
        assert_eq!(rx.try_recv().expect("envelope").msg(), Some("nosub"));
    }

    #[test]
    fn test_unknown_type_is_republished() {
        let client = client();
        let (_, mut rx) = client.events().channel();

        client.receive(r#"{"msg":"added","collection":"todos","id":"x","fields":{}}"#);
        assert_eq!(rx.try_recv().expect("envelope").msg(), Some("added"));
    }
}
