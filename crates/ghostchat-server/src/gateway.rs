//! Action executor.
//!
//! `Gateway` owns the [`MessageRouter`] and one bounded outbound queue per
//! live WebSocket. Every entry point runs the router and executes the
//! resulting actions before returning, so a caller holding the gateway lock
//! sees each frame's fan-out complete before the next frame is routed.
//!
//! Delivery is best-effort: a full or closed queue drops the frame for that
//! recipient only.

use std::collections::HashMap;

use ghostchat_core::{
    ConnectionId, Credentials, Environment, IdentityError, MessageRouter, RouterAction,
    RouterConfig, RouterError, SessionToken, StoreError,
};
use ghostchat_proto::Code;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::system_env::SystemEnv;

/// Item on a connection's outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Encoded JSON frame
    Text(String),
    /// Close the socket with this reason
    Close(String),
}

/// Router plus the live outbound queues it delivers into.
pub struct Gateway<E = SystemEnv>
where
    E: Environment,
{
    router: MessageRouter<E>,
    env: E,
    outbound: HashMap<ConnectionId, mpsc::Sender<Outbound>>,
}

impl<E> Gateway<E>
where
    E: Environment,
{
    /// Create a gateway over a fresh in-memory router.
    pub fn new(env: E, config: RouterConfig) -> Self {
        Self { router: MessageRouter::new(env.clone(), config), env, outbound: HashMap::new() }
    }

    /// Mint a new identity.
    pub fn register(&mut self) -> Result<Credentials, IdentityError> {
        self.router.register()
    }

    /// Exchange `code` + `pin` for a fresh session token.
    pub fn login(&mut self, code: &Code, pin: &str) -> Result<SessionToken, IdentityError> {
        self.router.login(code, pin)
    }

    /// Authenticate a new socket and attach its outbound queue.
    ///
    /// On success `hello` is already queued on `sender` when this returns.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::Unauthorized` if the token does not resolve; the
    /// queue is not attached and nothing was sent.
    pub fn connect(
        &mut self,
        token: Option<&str>,
        sender: mpsc::Sender<Outbound>,
    ) -> Result<(ConnectionId, Code), RouterError> {
        let conn_id = self.fresh_conn_id();
        let (code, actions) = self.router.connect(conn_id, token)?;

        self.outbound.insert(conn_id, sender);
        self.execute(actions);

        Ok((conn_id, code))
    }

    /// Route one inbound text frame.
    pub fn handle_text(&mut self, conn_id: ConnectionId, sender: &Code, text: &str) {
        let actions = self.router.handle_text(conn_id, sender, text);
        self.execute(actions);
    }

    /// Detach a closed socket.
    pub fn disconnect(&mut self, conn_id: ConnectionId, code: &Code) {
        self.outbound.remove(&conn_id);
        self.router.disconnect(conn_id, code);
    }

    /// Number of identities with a live connection.
    pub fn connection_count(&self) -> usize {
        self.router.connection_count()
    }

    /// Number of registered identities.
    pub fn identity_count(&self) -> Result<usize, StoreError> {
        self.router.identities().len()
    }

    fn fresh_conn_id(&self) -> ConnectionId {
        loop {
            let candidate = ConnectionId::new(self.env.random_u64());
            if !self.outbound.contains_key(&candidate) {
                return candidate;
            }
        }
    }

    fn execute(&mut self, actions: Vec<RouterAction>) {
        for action in actions {
            match action {
                RouterAction::Send { conn_id, frame } => {
                    let text = match frame.encode() {
                        Ok(text) => text,
                        Err(e) => {
                            tracing::error!(conn_id = %conn_id, "frame encode failed: {}", e);
                            continue;
                        },
                    };
                    self.enqueue(conn_id, Outbound::Text(text));
                },

                RouterAction::Close { conn_id, reason } => {
                    tracing::info!(conn_id = %conn_id, "closing connection: {}", reason);
                    if !self.enqueue(conn_id, Outbound::Close(reason)) {
                        // Dropping the sender ends the writer once it drains.
                        tracing::info!(conn_id = %conn_id, "close not queued, evicting");
                        self.outbound.remove(&conn_id);
                    }
                },
            }
        }
    }

    /// Queue `item` for `conn_id`. Returns `false` if it was dropped.
    fn enqueue(&mut self, conn_id: ConnectionId, item: Outbound) -> bool {
        let Some(sender) = self.outbound.get(&conn_id) else {
            tracing::debug!(conn_id = %conn_id, "no outbound queue, frame dropped");
            return false;
        };

        match sender.try_send(item) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %conn_id, "outbound queue full, frame dropped");
                false
            },
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(conn_id = %conn_id, "outbound queue closed, frame dropped");
                self.outbound.remove(&conn_id);
                false
            },
        }
    }
}
