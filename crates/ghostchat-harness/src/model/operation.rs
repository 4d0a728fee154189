//! Operations for model-based testing.
//!
//! Operations represent every client-visible action in the system. They are
//! generated randomly by proptest (or decoded from fuzz input) and applied to
//! both the model and the real router.

use arbitrary::Arbitrary;

/// Client identifier (0-indexed). Client `n` holds the `n + 1`th registered
/// code.
pub type ClientId = u8;

/// Reference to a group by creation order, taken modulo the number of groups
/// created so far.
pub type GroupRef = u8;

/// Operations that can be applied to the system.
///
/// Frame-sending operations from a client that is not connected are no-ops
/// in both the model and the real system: the transport never delivers
/// frames from a socket that is not bound.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Client opens a socket with its current token.
    Connect {
        /// Connecting client
        client: ClientId,
    },

    /// Client's socket closes.
    Disconnect {
        /// Disconnecting client
        client: ClientId,
    },

    /// `pair_request`
    PairRequest {
        /// Requester
        from: ClientId,
        /// Target
        to: ClientId,
    },

    /// `pair_accept`
    PairAccept {
        /// Accepting client
        accepter: ClientId,
        /// Client whose request is being accepted
        requester: ClientId,
    },

    /// `pair_decline`
    PairDecline {
        /// Declining client
        decliner: ClientId,
        /// Client whose request is being declined
        requester: ClientId,
    },

    /// `direct_msg`
    DirectMessage {
        /// Sender
        from: ClientId,
        /// Recipient
        to: ClientId,
        /// Body
        text: SmallText,
    },

    /// `group_create`
    CreateGroup {
        /// Creator
        creator: ClientId,
        /// Invited clients; may repeat or include the creator
        invitees: Vec<ClientId>,
    },

    /// `group_accept`
    AcceptInvite {
        /// Accepting client
        client: ClientId,
        /// Target group
        group: GroupRef,
    },

    /// `group_msg`
    PostMessage {
        /// Sender
        client: ClientId,
        /// Target group
        group: GroupRef,
        /// Body
        text: SmallText,
    },

    /// `group_close`
    CloseGroup {
        /// Requesting client
        client: ClientId,
        /// Target group
        group: GroupRef,
    },

    /// `group_leave`
    LeaveGroup {
        /// Leaving client
        client: ClientId,
        /// Target group
        group: GroupRef,
    },

    /// Advance the server clock.
    AdvanceTime {
        /// Milliseconds to advance
        millis: u16,
    },
}

/// Small message body for testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct SmallText {
    /// Seed the body is derived from
    pub seed: u8,
}

impl SmallText {
    /// Expand to the message text.
    pub fn to_text(self) -> String {
        format!("m{}", self.seed)
    }
}

/// Abstract view of one delivered frame.
///
/// Codes are replaced by client ids and group ids by creation index, so the
/// model can predict deliveries without knowing random identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// `hello`
    Hello {
        /// Bound client
        client: ClientId,
    },
    /// `pair_request`
    PairRequest {
        /// Requester
        from: ClientId,
    },
    /// `pair_accept`
    PairAccept {
        /// Other side of the pairing
        from: ClientId,
    },
    /// `pair_decline`
    PairDecline {
        /// Decliner
        from: ClientId,
    },
    /// `direct_msg`
    DirectMessage {
        /// Sender
        from: ClientId,
        /// Recipient
        to: ClientId,
        /// Body
        text: String,
        /// Server timestamp
        ts: u64,
    },
    /// `group_invite`
    Invite {
        /// Group index
        group: usize,
        /// Snapshot members
        members: Vec<ClientId>,
        /// Snapshot pending
        pending: Vec<ClientId>,
    },
    /// `group_created`
    Created {
        /// Group index
        group: usize,
        /// Snapshot members
        members: Vec<ClientId>,
        /// Snapshot pending
        pending: Vec<ClientId>,
    },
    /// `group_join`
    Join {
        /// Group index
        group: usize,
        /// Accepting client
        client: ClientId,
        /// Post-accept members
        members: Vec<ClientId>,
        /// Post-accept pending
        pending: Vec<ClientId>,
    },
    /// `group_msg`
    GroupMessage {
        /// Group index
        group: usize,
        /// Sender
        from: ClientId,
        /// Body
        text: String,
        /// Server timestamp
        ts: u64,
    },
    /// `group_closed`
    Closed {
        /// Group index
        group: usize,
    },
    /// `group_leave`
    Leave {
        /// Group index
        group: usize,
        /// Leaving client
        client: ClientId,
    },
}
