//! Message router.
//!
//! The router is the single entry point for everything the transport layer
//! hands to the core: registration, login, channel handshakes, inbound text
//! frames, and channel closure. It owns the identity issuer, the connection
//! registry, the pairing graph, and the group manager, and it turns their
//! notices into [`RouterAction`]s addressed to live connections.
//!
//! # Architecture
//!
//! ```text
//! driver ──connect/handle_text/disconnect──> MessageRouter
//!                                                 │
//!                  ┌──────────────┬───────────────┼──────────────┐
//!                  ▼              ▼               ▼              ▼
//!           IdentityIssuer  PairingGraph    GroupManager   ConnectionRegistry
//!                                 │               │              ▲
//!                                 └──── Notice ───┴── dispatch ──┘
//!                                                 │
//! driver <────────── Vec<RouterAction> ───────────┘
//! ```
//!
//! # Invariants
//!
//! - Frames from one connection are handled in arrival order, and each
//!   handler runs to completion before the next frame is seen
//! - The sender of every frame is the identity bound at handshake; nothing
//!   in a frame body can override it
//! - Rejected frames produce no actions and no error frame

use ghostchat_proto::{ClientFrame, Code, FrameError, ServerFrame};

use crate::{
    action::{Notice, Recipient, RouterAction},
    env::Environment,
    error::{IdentityError, RouterError, StoreError},
    group_manager::GroupManager,
    identity::{Credentials, IdentityIssuer, SessionToken},
    pairing::{DirectPayload, PairingGraph},
    registry::{ConnectionId, ConnectionRegistry},
    store::{
        GroupStore, IdentityStore, MemoryGroupStore, MemoryIdentityStore, MemoryPairingStore,
        PairingStore,
    },
};

/// What happens to a channel displaced by a newer handshake for the same
/// identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReplacePolicy {
    /// The old channel stays open but stops receiving routed frames.
    #[default]
    Silent,
    /// The old channel is closed.
    CloseSuperseded,
}

/// Router configuration.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Handling of superseded channels
    pub replace_policy: ReplacePolicy,
}

/// Routes inbound frames between identities.
pub struct MessageRouter<
    E,
    I = MemoryIdentityStore,
    P = MemoryPairingStore,
    G = MemoryGroupStore,
> where
    E: Environment,
    I: IdentityStore,
    P: PairingStore,
    G: GroupStore,
{
    env: E,
    config: RouterConfig,
    identities: IdentityIssuer<I>,
    registry: ConnectionRegistry,
    pairing: PairingGraph<P>,
    groups: GroupManager<G>,
}

impl<E> MessageRouter<E>
where
    E: Environment,
{
    /// Create a router over empty in-memory stores.
    pub fn new(env: E, config: RouterConfig) -> Self {
        Self {
            env,
            config,
            identities: IdentityIssuer::new(),
            registry: ConnectionRegistry::new(),
            pairing: PairingGraph::new(MemoryPairingStore::new()),
            groups: GroupManager::new(MemoryGroupStore::new()),
        }
    }
}

impl<E, I, P, G> MessageRouter<E, I, P, G>
where
    E: Environment,
    I: IdentityStore,
    P: PairingStore,
    G: GroupStore,
{
    /// Create a router over caller-supplied stores.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the identity store cannot report its size.
    pub fn with_stores(
        env: E,
        config: RouterConfig,
        identities: I,
        pairings: P,
        groups: G,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            env,
            config,
            identities: IdentityIssuer::with_store(identities)?,
            registry: ConnectionRegistry::new(),
            pairing: PairingGraph::new(pairings),
            groups: GroupManager::new(groups),
        })
    }

    /// Mint a new identity.
    pub fn register(&mut self) -> Result<Credentials, IdentityError> {
        self.identities.register(&self.env)
    }

    /// Exchange `code` + `pin` for a fresh session token.
    ///
    /// # Errors
    ///
    /// Returns `IdentityError::InvalidCredentials` for an unknown code or a
    /// wrong PIN.
    pub fn login(&mut self, code: &Code, pin: &str) -> Result<SessionToken, IdentityError> {
        self.identities.login(&self.env, code, pin)
    }

    /// Authenticate a new channel and bind it to its identity.
    ///
    /// On success the first action is always `hello` on `conn_id`. If the
    /// identity already had a live channel it is superseded; under
    /// [`ReplacePolicy::CloseSuperseded`] a `Close` for it follows.
    ///
    /// # Errors
    ///
    /// Returns `RouterError::Unauthorized` if `token` is absent or resolves
    /// to no identity. The caller must close the channel without sending
    /// anything.
    pub fn connect(
        &mut self,
        conn_id: ConnectionId,
        token: Option<&str>,
    ) -> Result<(Code, Vec<RouterAction>), RouterError> {
        let token = token.unwrap_or_default();
        let Some(code) = self.identities.resolve_token(token)? else {
            tracing::debug!(conn_id = %conn_id, "handshake rejected");
            return Err(RouterError::Unauthorized);
        };

        let mut actions =
            vec![RouterAction::Send { conn_id, frame: ServerFrame::Hello { code: code.clone() } }];

        if let Some(displaced) = self.registry.register(code.clone(), conn_id) {
            tracing::info!(code = %code, old = %displaced, new = %conn_id, "connection superseded");
            if self.config.replace_policy == ReplacePolicy::CloseSuperseded {
                actions.push(RouterAction::Close {
                    conn_id: displaced,
                    reason: "superseded by a newer connection".to_string(),
                });
            }
        } else {
            tracing::info!(code = %code, conn_id = %conn_id, "connection established");
        }

        Ok((code, actions))
    }

    /// Release `code`'s association with `conn_id` when the channel closes.
    ///
    /// Returns `false` if the slot had already moved to a newer channel.
    pub fn disconnect(&mut self, conn_id: ConnectionId, code: &Code) -> bool {
        let cleared = self.registry.unregister(code, conn_id);
        tracing::debug!(code = %code, conn_id = %conn_id, cleared, "connection closed");
        cleared
    }

    /// Decode and route one inbound text frame from `sender` on `conn_id`.
    ///
    /// Malformed frames are dropped silently and the channel stays open.
    pub fn handle_text(
        &mut self,
        conn_id: ConnectionId,
        sender: &Code,
        text: &str,
    ) -> Vec<RouterAction> {
        match ClientFrame::decode(text) {
            Ok(frame) => self.handle_frame(conn_id, sender, frame),
            Err(FrameError::Malformed(err)) => {
                tracing::debug!(code = %sender, error = %err, "malformed frame dropped");
                Vec::new()
            },
            Err(err) => {
                tracing::debug!(code = %sender, error = %err, "undecodable frame dropped");
                Vec::new()
            },
        }
    }

    /// Route one decoded frame from `sender` on `conn_id`.
    pub fn handle_frame(
        &mut self,
        conn_id: ConnectionId,
        sender: &Code,
        frame: ClientFrame,
    ) -> Vec<RouterAction> {
        let kind = frame.kind();
        match self.notices_for(sender, frame) {
            Ok(notices) => self.dispatch(conn_id, notices),
            Err(err) => {
                tracing::warn!(code = %sender, kind, error = %err, "store failure, frame dropped");
                Vec::new()
            },
        }
    }

    fn notices_for(
        &mut self,
        sender: &Code,
        frame: ClientFrame,
    ) -> Result<Vec<Notice>, StoreError> {
        let now = self.env.wall_clock_millis();

        match frame {
            ClientFrame::PairRequest { to } => Ok(self.pairing.request_pairing(sender, &to)),
            ClientFrame::PairAccept { from } => {
                if &from == sender || !self.identities.exists(&from)? {
                    tracing::debug!(code = %sender, from = %from, "invalid pair accept dropped");
                    return Ok(Vec::new());
                }
                self.pairing.accept_pairing(sender, &from)
            },
            ClientFrame::PairDecline { to } => Ok(self.pairing.decline_pairing(sender, &to)),
            ClientFrame::DirectMsg { to, text } => {
                self.pairing.relay_direct_message(sender, &to, DirectPayload::Text(text), now)
            },
            ClientFrame::VoiceMsg { to, audio } => {
                self.pairing.relay_direct_message(sender, &to, DirectPayload::Voice(audio), now)
            },
            ClientFrame::GroupCreate { name, members } => {
                let (_, notices) = self.groups.create_group(sender, name, members, &self.env)?;
                Ok(notices)
            },
            ClientFrame::GroupAccept { group_id } => self.groups.accept_invite(&group_id, sender),
            ClientFrame::GroupMsg { group_id, text } => {
                self.groups.post_message(&group_id, sender, text, now)
            },
            ClientFrame::GroupClose { group_id } => self.groups.close_group(&group_id, sender),
            ClientFrame::GroupLeave { group_id } => self.groups.leave_group(&group_id, sender),
            ClientFrame::Unknown => {
                tracing::debug!(code = %sender, "unknown frame type dropped");
                Ok(Vec::new())
            },
        }
    }

    /// Resolve each notice to the recipient's live connection. Offline
    /// recipients are skipped.
    fn dispatch(&self, origin: ConnectionId, notices: Vec<Notice>) -> Vec<RouterAction> {
        notices
            .into_iter()
            .filter_map(|notice| match notice.recipient {
                Recipient::Identity(code) => self.registry.send(&code, notice.frame),
                Recipient::Origin => {
                    Some(RouterAction::Send { conn_id: origin, frame: notice.frame })
                },
            })
            .collect()
    }

    /// Active configuration.
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Identity issuer.
    pub fn identities(&self) -> &IdentityIssuer<I> {
        &self.identities
    }

    /// Live connection map.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Pairing graph.
    pub fn pairing(&self) -> &PairingGraph<P> {
        &self.pairing
    }

    /// Group manager.
    pub fn groups(&self) -> &GroupManager<G> {
        &self.groups
    }

    /// Number of identities with a live connection.
    pub fn connection_count(&self) -> usize {
        self.registry.len()
    }
}
