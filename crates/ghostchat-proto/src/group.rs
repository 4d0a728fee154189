//! Group snapshot carried by invite and creation frames.

use serde::{Deserialize, Serialize};

use crate::{Code, GroupId};

/// Full membership view of a group at the moment a frame was produced.
///
/// `members` and `pending` keep insertion order: members in the order they
/// joined (creator first), pending codes in the order they were invited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSnapshot {
    /// Group identifier
    pub id: GroupId,
    /// Display name
    pub name: String,
    /// Code of the identity that created the group
    pub creator: Code,
    /// Joined members
    pub members: Vec<Code>,
    /// Invited codes that have not accepted yet
    pub pending: Vec<Code>,
}
