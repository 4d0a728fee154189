//! Connection registry.
//!
//! Binds each authenticated identity to at most one live connection. The
//! registry holds a single slot per identity and never queues: sending to an
//! identity without a live connection drops the frame.

use std::{collections::HashMap, fmt};

use ghostchat_proto::{Code, ServerFrame};

use crate::action::RouterAction;

/// Server-assigned handle for one live transport channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw connection id.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Identity → live connection map.
#[derive(Debug, Default, Clone)]
pub struct ConnectionRegistry {
    slots: HashMap<Code, ConnectionId>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate `conn_id` with `code`, overwriting any prior association.
    ///
    /// Returns the displaced connection, if there was one and it differs
    /// from `conn_id`. The registry itself never notifies the displaced
    /// channel; that is a policy decision for the router.
    pub fn register(&mut self, code: Code, conn_id: ConnectionId) -> Option<ConnectionId> {
        self.slots.insert(code, conn_id).filter(|previous| *previous != conn_id)
    }

    /// Clear the association for `code`, but only while it still points at
    /// `conn_id`.
    ///
    /// A channel that was replaced by a newer handshake must not clear the
    /// newer connection when it finally closes. Returns `true` if the slot
    /// was cleared.
    pub fn unregister(&mut self, code: &Code, conn_id: ConnectionId) -> bool {
        if self.slots.get(code) == Some(&conn_id) {
            self.slots.remove(code);
            true
        } else {
            false
        }
    }

    /// Live connection for `code`.
    pub fn connection(&self, code: &Code) -> Option<ConnectionId> {
        self.slots.get(code).copied()
    }

    /// Whether `code` has a live connection.
    pub fn is_connected(&self, code: &Code) -> bool {
        self.slots.contains_key(code)
    }

    /// Number of identities with a live connection.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no identity is connected.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Best-effort send: a `Send` action for `code`'s live connection, or
    /// `None` if the identity is offline. Nothing is buffered.
    pub fn send(&self, code: &Code, frame: ServerFrame) -> Option<RouterAction> {
        match self.connection(code) {
            Some(conn_id) => Some(RouterAction::Send { conn_id, frame }),
            None => {
                tracing::debug!(code = %code, kind = frame.kind(), "recipient offline, dropped");
                None
            },
        }
    }
}
