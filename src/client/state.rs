//! Session connection state.

// ============================================================================
// ConnectionState
// ============================================================================

/// DDP session lifecycle.
///
/// ```text
/// Disconnected ──connected──► Connected ──closed──► Closed
///       │                                             ▲
///       └────────────── closed / send failure ────────┘
/// ```
///
/// `Closed` is terminal for the current transport. Calling
/// [`DdpClient::connect`](super::DdpClient::connect) again creates a fresh
/// transport and redoes the handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No handshake completed yet.
    #[default]
    Disconnected,
    /// Server acknowledged the handshake.
    Connected,
    /// Transport closed or failed.
    Closed,
}

impl ConnectionState {
    /// Returns `true` if the handshake has completed and the session is live.
    #[inline]
    #[must_use]
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert!(!ConnectionState::Disconnected.is_connected());
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Closed.is_connected());
    }
}
