//! Group Manager
//!
//! Owns group lifecycle and membership, and produces the notices that keep
//! every member's view of a group current.
//!
//! ## Responsibilities
//!
//! - Group Lifecycle: create with a fresh id, close (creator only)
//! - Membership: accept pending invites, leave
//! - Fan-out: group messages go to every member, sender included
//!
//! ## Design
//!
//! - Authorization before side effects: every handler checks existence,
//!   closure, and membership before touching the store
//! - Silent rejection: unauthorized or inert operations return no notices
//!   rather than an error, so the sender observes nothing
//! - Notice-based: handlers return notices addressed to codes, never touch
//!   connections

use ghostchat_proto::{Code, GroupId, ServerFrame};

use crate::{
    action::Notice,
    env::Environment,
    error::StoreError,
    group::Group,
    store::{GroupStore, MemoryGroupStore},
};

/// Random bytes behind a minted group id.
const GROUP_ID_BYTES: usize = 6;

/// Owns every group and enforces the membership state machine.
#[derive(Debug, Default)]
pub struct GroupManager<S = MemoryGroupStore>
where
    S: GroupStore,
{
    store: S,
}

impl<S> GroupManager<S>
where
    S: GroupStore,
{
    /// Create a manager over `store`.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Look up a group.
    pub fn group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        self.store.get(id)
    }

    /// Every group id.
    pub fn group_ids(&self) -> Result<Vec<GroupId>, StoreError> {
        self.store.ids()
    }

    /// Mint a group id that is not yet in the store.
    fn fresh_id<E: Environment>(&self, env: &E) -> Result<GroupId, StoreError> {
        loop {
            let mut bytes = [0u8; GROUP_ID_BYTES];
            env.random_bytes(&mut bytes);
            let id = GroupId::from_random(bytes);
            if !self.store.contains(&id)? {
                return Ok(id);
            }
        }
    }

    /// Create a group owned by `creator` and invite `invitees`.
    ///
    /// Every invitee receives `group_invite` and the creator receives
    /// `group_created`, all carrying the same snapshot. A missing or blank
    /// name falls back to `"<creator>'s group"`.
    pub fn create_group<E: Environment>(
        &mut self,
        creator: &Code,
        name: Option<String>,
        invitees: Vec<Code>,
        env: &E,
    ) -> Result<(GroupId, Vec<Notice>), StoreError> {
        let id = self.fresh_id(env)?;
        let name = match name {
            Some(name) if !name.trim().is_empty() => name,
            _ => format!("{creator}'s group"),
        };

        let group = Group::new(id.clone(), name, creator.clone(), invitees);
        let snapshot = group.snapshot();

        let mut notices: Vec<Notice> = group
            .pending()
            .iter()
            .map(|invitee| {
                Notice::to(invitee.clone(), ServerFrame::GroupInvite { group: snapshot.clone() })
            })
            .collect();
        notices.push(Notice::to(creator.clone(), ServerFrame::GroupCreated { group: snapshot }));

        tracing::info!(
            group_id = %id,
            creator = %creator,
            invited = group.pending().len(),
            "group created"
        );

        self.store.put(group)?;

        Ok((id, notices))
    }

    /// Accept a pending invite to `group_id` on behalf of `code`.
    ///
    /// Inert if the group is missing or closed. Otherwise `group_join` is
    /// broadcast to every current member whether or not `code` was actually
    /// pending, so a repeated accept re-broadcasts harmlessly.
    pub fn accept_invite(
        &mut self,
        group_id: &GroupId,
        code: &Code,
    ) -> Result<Vec<Notice>, StoreError> {
        let Some(mut group) = self.open_group(group_id)? else {
            return Ok(Vec::new());
        };

        if group.accept(code) {
            tracing::info!(group_id = %group_id, code = %code, "invite accepted");
            self.store.put(group.clone())?;
        }

        let frame = ServerFrame::GroupJoin {
            group_id: group_id.clone(),
            code: code.clone(),
            members: group.members().to_vec(),
            pending: group.pending().to_vec(),
        };

        Ok(broadcast(group.members(), &frame))
    }

    /// Fan a message from `from` out to every member of `group_id`,
    /// including the sender.
    ///
    /// Dropped if the group is missing, closed, or `from` is not a member.
    pub fn post_message(
        &self,
        group_id: &GroupId,
        from: &Code,
        text: String,
        now: u64,
    ) -> Result<Vec<Notice>, StoreError> {
        let Some(group) = self.open_group(group_id)? else {
            return Ok(Vec::new());
        };

        if !group.is_member(from) {
            tracing::debug!(group_id = %group_id, from = %from, "message from non-member dropped");
            return Ok(Vec::new());
        }

        let frame =
            ServerFrame::GroupMsg { group_id: group_id.clone(), from: from.clone(), text, ts: now };

        Ok(broadcast(group.members(), &frame))
    }

    /// Close `group_id` on behalf of `requester` and tell every member.
    ///
    /// Inert unless `requester` is the creator and the group is open.
    pub fn close_group(
        &mut self,
        group_id: &GroupId,
        requester: &Code,
    ) -> Result<Vec<Notice>, StoreError> {
        let Some(mut group) = self.open_group(group_id)? else {
            return Ok(Vec::new());
        };

        if !group.close(requester) {
            tracing::debug!(
                group_id = %group_id,
                requester = %requester,
                creator = %group.creator(),
                "close by non-creator dropped"
            );
            return Ok(Vec::new());
        }

        tracing::info!(group_id = %group_id, "group closed");

        let notices =
            broadcast(group.members(), &ServerFrame::GroupClosed { group_id: group_id.clone() });
        self.store.put(group)?;

        Ok(notices)
    }

    /// Remove `code` from `group_id` and tell the remaining members.
    ///
    /// Inert if the group is missing, closed, or `code` is not a member.
    /// The creator is not special-cased.
    pub fn leave_group(
        &mut self,
        group_id: &GroupId,
        code: &Code,
    ) -> Result<Vec<Notice>, StoreError> {
        let Some(mut group) = self.open_group(group_id)? else {
            return Ok(Vec::new());
        };

        if !group.remove_member(code) {
            return Ok(Vec::new());
        }

        tracing::info!(group_id = %group_id, code = %code, "member left");

        let notices = broadcast(
            group.members(),
            &ServerFrame::GroupLeave { group_id: group_id.clone(), code: code.clone() },
        );
        self.store.put(group)?;

        Ok(notices)
    }

    /// Load `group_id` if it exists and is still open.
    fn open_group(&self, group_id: &GroupId) -> Result<Option<Group>, StoreError> {
        match self.store.get(group_id)? {
            Some(group) if !group.is_closed() => Ok(Some(group)),
            Some(_) => {
                tracing::debug!(group_id = %group_id, "operation on closed group dropped");
                Ok(None)
            },
            None => {
                tracing::debug!(group_id = %group_id, "operation on unknown group dropped");
                Ok(None)
            },
        }
    }
}

/// One notice per member, all carrying `frame`.
fn broadcast(members: &[Code], frame: &ServerFrame) -> Vec<Notice> {
    members.iter().map(|member| Notice::to(member.clone(), frame.clone())).collect()
}
