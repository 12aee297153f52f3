//! Current-connection handle
//!
//! The broker connection is a process-wide singleton owned by the bridge
//! supervisor. Consumers (router, publisher) read a snapshot through
//! [`ConnectionProvider`] and must tolerate absence: an absent connection
//! turns their operations into no-ops. The supervisor replaces the
//! connection wholesale on reconnect, never mutates it in place.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::BridgeError;

/// Atomically swappable handle to the current broker connection.
///
/// Generic over the connection type so consumers can be exercised without a
/// live broker; in production `C` is [`lapin::Connection`].
pub struct ConnectionProvider<C = lapin::Connection> {
    current: Arc<RwLock<Option<Arc<C>>>>,
}

impl<C> Clone for ConnectionProvider<C> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
        }
    }
}

impl<C> Default for ConnectionProvider<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> ConnectionProvider<C> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Install a newly established connection
    pub fn set(&self, conn: Arc<C>) {
        *self.current.write() = Some(conn);
    }

    /// Discard the current connection (on loss or shutdown)
    pub fn clear(&self) {
        *self.current.write() = None;
    }

    /// Snapshot of the current connection, or `None` while disconnected
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<C>> {
        self.current.read().clone()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.current.read().is_some()
    }
}

/// How one connected session of the supervisor loop ended
#[derive(Debug)]
pub enum RunExit {
    /// Could not establish the connection or complete the subscriptions
    ConnectFailed(BridgeError),
    /// The connection was established and later lost
    Disconnected,
    /// Shutdown was requested; expected, not an error
    Cancelled,
}
