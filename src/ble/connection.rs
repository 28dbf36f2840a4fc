//! Connection state tracking.
//!
//! The session owns the single link to the kettle; this module holds the
//! state it reports and the events it broadcasts when that state changes.

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

/// Connection state for the kettle link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Resolving the address or opening the link.
    Connecting,
    /// Connected.
    Connected,
    /// Closing the link.
    Disconnecting,
}

impl ConnectionState {
    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
            Self::Disconnecting => write!(f, "Disconnecting"),
        }
    }
}

/// Event for connection state changes.
#[derive(Debug, Clone)]
pub struct ConnectionEvent {
    /// The kettle address, when known.
    pub address: Option<String>,
    /// The new connection state.
    pub state: ConnectionState,
}

/// Current state plus a broadcast channel of transitions.
pub(crate) struct ConnectionTracker {
    state: RwLock<ConnectionState>,
    event_tx: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionTracker {
    pub(crate) fn new() -> Self {
        let (event_tx, _) = broadcast::channel(16);
        Self {
            state: RwLock::new(ConnectionState::Disconnected),
            event_tx,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.event_tx.subscribe()
    }

    /// Update the connection state and emit an event.
    pub(crate) fn set(&self, new_state: ConnectionState, address: Option<&str>) {
        let old_state = {
            let mut state = self.state.write();
            let old = *state;
            *state = new_state;
            old
        };

        if old_state != new_state {
            debug!("Connection state changed: {} -> {}", old_state, new_state);

            let _ = self.event_tx.send(ConnectionEvent {
                address: address.map(str::to_string),
                state: new_state,
            });
        }
    }
}
