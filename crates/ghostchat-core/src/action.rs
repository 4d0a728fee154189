//! Actions and notices produced by the state machines.
//!
//! Pairing and group handlers know nothing about connections: they return
//! [`Notice`]s addressed to identities. The router turns notices into
//! [`RouterAction`]s by looking up each recipient's live connection, and the
//! driver executes the actions.

use ghostchat_proto::{Code, ServerFrame};

use crate::registry::ConnectionId;

/// Who a notice is for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Whatever connection is currently registered for this identity.
    Identity(Code),
    /// The connection the triggering frame arrived on (echo).
    Origin,
}

/// A frame addressed to a recipient, before connection lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Addressee
    pub recipient: Recipient,
    /// Frame to deliver
    pub frame: ServerFrame,
}

impl Notice {
    /// Address `frame` to the identity `code`.
    pub fn to(code: Code, frame: ServerFrame) -> Self {
        Self { recipient: Recipient::Identity(code), frame }
    }

    /// Address `frame` back to the originating connection.
    pub fn origin(frame: ServerFrame) -> Self {
        Self { recipient: Recipient::Origin, frame }
    }
}

/// Actions returned by the router for the driver to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouterAction {
    /// Deliver this frame on this connection (best-effort).
    Send {
        /// Target connection
        conn_id: ConnectionId,
        /// Frame to deliver
        frame: ServerFrame,
    },

    /// Close this connection.
    Close {
        /// Target connection
        conn_id: ConnectionId,
        /// Reason for closing, for logging
        reason: String,
    },
}

impl RouterAction {
    /// Connection the action targets.
    pub fn conn_id(&self) -> ConnectionId {
        match self {
            Self::Send { conn_id, .. } | Self::Close { conn_id, .. } => *conn_id,
        }
    }
}
