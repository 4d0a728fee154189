//! Inbound and outbound frame enums.
//!
//! Field names on the wire are camelCase (`groupId`), frame kinds are
//! snake_case (`group_accept`). Decoding ignores fields it does not know, so
//! a client cannot smuggle a forged `from` or `ts` into a relayed message:
//! those are only ever set by the server on [`ServerFrame`].

use serde::{Deserialize, Deserializer, Serialize};

use crate::{Code, FrameError, GroupId, GroupSnapshot};

/// Frame sent by a client over its live channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientFrame {
    /// Ask `to` to pair with the sender.
    PairRequest {
        /// Identity being asked
        to: Code,
    },

    /// Accept a pairing request previously received from `from`.
    PairAccept {
        /// Identity that sent the request
        from: Code,
    },

    /// Decline a pairing request received from `to`.
    PairDecline {
        /// Identity that sent the request
        to: Code,
    },

    /// Text message to a paired identity.
    DirectMsg {
        /// Recipient
        to: Code,
        /// Message body
        text: String,
    },

    /// Voice message to a paired identity.
    VoiceMsg {
        /// Recipient
        to: Code,
        /// Encoded audio, relayed untouched
        audio: String,
    },

    /// Create a group and invite `members`.
    GroupCreate {
        /// Display name; a default is chosen when absent or blank
        #[serde(default)]
        name: Option<String>,
        /// Codes to invite; absent or `null` means nobody
        #[serde(default, deserialize_with = "null_as_empty")]
        members: Vec<Code>,
    },

    /// Accept a pending group invite.
    GroupAccept {
        /// Target group
        group_id: GroupId,
    },

    /// Post a message to a group.
    GroupMsg {
        /// Target group
        group_id: GroupId,
        /// Message body
        text: String,
    },

    /// Close a group (creator only).
    GroupClose {
        /// Target group
        group_id: GroupId,
    },

    /// Leave a group.
    GroupLeave {
        /// Target group
        group_id: GroupId,
    },

    /// Any frame kind this server does not understand.
    #[serde(other)]
    Unknown,
}

impl ClientFrame {
    /// Decode a frame from its JSON text.
    ///
    /// An unrecognized `type` is not an error; it decodes to
    /// [`ClientFrame::Unknown`].
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(FrameError::Malformed)
    }

    /// Encode the frame as JSON text.
    pub fn encode(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Encode)
    }

    /// Wire name of the frame kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PairRequest { .. } => "pair_request",
            Self::PairAccept { .. } => "pair_accept",
            Self::PairDecline { .. } => "pair_decline",
            Self::DirectMsg { .. } => "direct_msg",
            Self::VoiceMsg { .. } => "voice_msg",
            Self::GroupCreate { .. } => "group_create",
            Self::GroupAccept { .. } => "group_accept",
            Self::GroupMsg { .. } => "group_msg",
            Self::GroupClose { .. } => "group_close",
            Self::GroupLeave { .. } => "group_leave",
            Self::Unknown => "unknown",
        }
    }
}

/// Frame pushed by the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerFrame {
    /// First frame after a successful handshake.
    Hello {
        /// The authenticated identity
        code: Code,
    },

    /// Someone wants to pair with the recipient.
    PairRequest {
        /// Requesting identity
        from: Code,
    },

    /// A pairing was established with `from`.
    PairAccept {
        /// The other side of the new pairing
        from: Code,
    },

    /// `from` declined the recipient's pairing request.
    PairDecline {
        /// Declining identity
        from: Code,
    },

    /// Relayed text message between paired identities.
    DirectMsg {
        /// Sender
        from: Code,
        /// Recipient
        to: Code,
        /// Message body
        text: String,
        /// Server timestamp (UNIX epoch milliseconds)
        ts: u64,
    },

    /// Relayed voice message between paired identities.
    VoiceMsg {
        /// Sender
        from: Code,
        /// Recipient
        to: Code,
        /// Encoded audio
        audio: String,
        /// Server timestamp (UNIX epoch milliseconds)
        ts: u64,
    },

    /// The recipient was invited to a group.
    GroupInvite {
        /// Group state at invite time
        group: GroupSnapshot,
    },

    /// Confirmation to the creator that a group exists.
    GroupCreated {
        /// Group state at creation time
        group: GroupSnapshot,
    },

    /// `code` accepted an invite.
    GroupJoin {
        /// Target group
        group_id: GroupId,
        /// Identity that accepted
        code: Code,
        /// Members after the accept
        members: Vec<Code>,
        /// Pending invites after the accept
        pending: Vec<Code>,
    },

    /// Fan-out of a group message.
    GroupMsg {
        /// Target group
        group_id: GroupId,
        /// Sender
        from: Code,
        /// Message body
        text: String,
        /// Server timestamp (UNIX epoch milliseconds)
        ts: u64,
    },

    /// The creator closed the group.
    GroupClosed {
        /// Closed group
        group_id: GroupId,
    },

    /// `code` left the group.
    GroupLeave {
        /// Target group
        group_id: GroupId,
        /// Identity that left
        code: Code,
    },
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl ServerFrame {
    /// Encode the frame as JSON text.
    pub fn encode(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Encode)
    }

    /// Decode a frame from its JSON text.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(FrameError::Malformed)
    }

    /// Wire name of the frame kind, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Hello { .. } => "hello",
            Self::PairRequest { .. } => "pair_request",
            Self::PairAccept { .. } => "pair_accept",
            Self::PairDecline { .. } => "pair_decline",
            Self::DirectMsg { .. } => "direct_msg",
            Self::VoiceMsg { .. } => "voice_msg",
            Self::GroupInvite { .. } => "group_invite",
            Self::GroupCreated { .. } => "group_created",
            Self::GroupJoin { .. } => "group_join",
            Self::GroupMsg { .. } => "group_msg",
            Self::GroupClosed { .. } => "group_closed",
            Self::GroupLeave { .. } => "group_leave",
        }
    }
}
