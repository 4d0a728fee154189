//! Group record and its membership transitions.
//!
//! ```text
//!            create                      close (creator)
//!   ───────────────────> ┌──────┐ ─────────────────────> ┌────────┐
//!                        │ Open │                        │ Closed │
//!                        └──────┘                        └────────┘
//!   per code, while Open:
//!     invited ──accept──> member ──leave──> (no record)
//! ```
//!
//! # Invariants
//!
//! - `members ∩ pending = ∅`
//! - Once closed, membership never changes again
//! - The creator is a member from creation; nothing stops the creator from
//!   leaving, and the close privilege stays with the creator afterwards

use ghostchat_proto::{Code, GroupId, GroupSnapshot};
use serde::{Deserialize, Serialize};

/// A named collection of codes with creator-controlled lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    name: String,
    creator: Code,
    /// Joined members, in join order
    members: Vec<Code>,
    /// Invited codes, in invite order
    pending: Vec<Code>,
    closed: bool,
}

impl Group {
    /// Create an open group whose only member is `creator`.
    ///
    /// Duplicate invitees and the creator itself are dropped from `pending`.
    pub fn new(id: GroupId, name: String, creator: Code, invitees: Vec<Code>) -> Self {
        let mut pending: Vec<Code> = Vec::with_capacity(invitees.len());
        for invitee in invitees {
            if invitee != creator && !pending.contains(&invitee) {
                pending.push(invitee);
            }
        }

        Self { id, name, members: vec![creator.clone()], creator, pending, closed: false }
    }

    /// Group identifier.
    pub fn id(&self) -> &GroupId {
        &self.id
    }

    /// Display name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creator's code.
    pub fn creator(&self) -> &Code {
        &self.creator
    }

    /// Joined members.
    pub fn members(&self) -> &[Code] {
        &self.members
    }

    /// Invited codes that have not joined.
    pub fn pending(&self) -> &[Code] {
        &self.pending
    }

    /// Whether the group has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether `code` is a joined member.
    pub fn is_member(&self, code: &Code) -> bool {
        self.members.contains(code)
    }

    /// Whether `code` holds a pending invite.
    pub fn is_pending(&self, code: &Code) -> bool {
        self.pending.contains(code)
    }

    /// Move `code` from pending to members.
    ///
    /// Returns `false` (and changes nothing) if the group is closed or `code`
    /// was not pending.
    pub fn accept(&mut self, code: &Code) -> bool {
        if self.closed {
            return false;
        }
        let Some(index) = self.pending.iter().position(|c| c == code) else {
            return false;
        };
        let code = self.pending.remove(index);
        self.members.push(code);
        true
    }

    /// Remove `code` from members.
    ///
    /// Returns `false` if the group is closed or `code` was not a member.
    pub fn remove_member(&mut self, code: &Code) -> bool {
        if self.closed {
            return false;
        }
        let Some(index) = self.members.iter().position(|c| c == code) else {
            return false;
        };
        self.members.remove(index);
        true
    }

    /// Close the group on behalf of `requester`.
    ///
    /// Returns `false` if `requester` is not the creator or the group was
    /// already closed.
    pub fn close(&mut self, requester: &Code) -> bool {
        if self.closed || &self.creator != requester {
            return false;
        }
        self.closed = true;
        true
    }

    /// Wire view of the current membership.
    pub fn snapshot(&self) -> GroupSnapshot {
        GroupSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            creator: self.creator.clone(),
            members: self.members.clone(),
            pending: self.pending.clone(),
        }
    }
}
