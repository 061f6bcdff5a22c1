//! Builder pattern for client configuration.
//!
//! Provides a fluent API for configuring and creating [`DdpClient`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use ddp_client::DdpClient;
//!
//! # fn example() -> ddp_client::Result<()> {
//! let client = DdpClient::builder()
//!     .host("example.com")
//!     .port(443)
//!     .ssl(true)
//!     .build()?;
//! assert_eq!(client.address().as_str(), "wss://example.com/websocket");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{Codec, JsonCodec};
use crate::transport::{TransportFactory, WebSocketFactory};

use super::core::DdpClient;

// ============================================================================
// Constants
// ============================================================================

/// Default DDP server port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default WebSocket endpoint path.
pub const DEFAULT_PATH: &str = "/websocket";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`DdpClient`].
///
/// Use [`DdpClient::builder()`] to create a new builder.
#[derive(Default, Clone)]
pub struct ClientBuilder {
    /// Server host name or IP.
    host: Option<String>,
    /// Server port.
    port: Option<u16>,
    /// Use `wss://`.
    ssl: bool,
    /// Endpoint path.
    path: Option<String>,
    /// Full address, overriding host/port/ssl/path.
    address: Option<String>,
    /// Envelope codec.
    codec: Option<Arc<dyn Codec>>,
    /// Transport factory.
    factory: Option<Arc<dyn TransportFactory>>,
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the server host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the server port (default 3000).
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Selects `wss://` instead of `ws://`.
    #[inline]
    #[must_use]
    pub fn ssl(mut self, ssl: bool) -> Self {
        self.ssl = ssl;
        self
    }

    /// Sets the endpoint path (default `/websocket`).
    #[inline]
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the full server address, e.g. `ws://localhost:3000/websocket`.
    #[inline]
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Replaces the JSON codec.
    #[inline]
    #[must_use]
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Replaces the WebSocket transport.
    #[inline]
    #[must_use]
    pub fn transport_factory(mut self, factory: Arc<dyn TransportFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Builds the client with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if neither host nor address is set
    /// - [`Error::Config`] if the address does not parse or is not `ws`/`wss`
    pub fn build(self) -> Result<DdpClient> {
        let address = self.resolve_address()?;
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonCodec));
        let factory = self.factory.unwrap_or_else(|| Arc::new(WebSocketFactory));

        Ok(DdpClient::from_parts(address, codec, factory))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Resolves and validates the server address.
    fn resolve_address(&self) -> Result<Url> {
        let raw = match (&self.address, &self.host) {
            (Some(address), _) => address.clone(),
            (None, Some(host)) => {
                let scheme = if self.ssl { "wss" } else { "ws" };
                let port = self.port.unwrap_or(DEFAULT_PORT);
                let path = self.path.as_deref().unwrap_or(DEFAULT_PATH);
                let separator = if path.starts_with('/') { "" } else { "/" };
                format!("{scheme}://{host}:{port}{separator}{path}")
            }
            (None, None) => {
                return Err(Error::config(
                    "Server host is required. Use .host() or .address() to set it.\n\
                     Example: DdpClient::builder().host(\"localhost\")",
                ));
            }
        };

        let url = Url::parse(&raw)
            .map_err(|e| Error::config(format!("Invalid server address {raw}: {e}")))?;

        match url.scheme() {
            "ws" | "wss" => Ok(url),
            other => Err(Error::config(format!(
                "Unsupported scheme {other}, expected ws or wss"
            ))),
        }
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("ssl", &self.ssl)
            .field("path", &self.path)
            .field("address", &self.address)
            .field("custom_codec", &self.codec.is_some())
            .field("custom_transport", &self.factory.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
