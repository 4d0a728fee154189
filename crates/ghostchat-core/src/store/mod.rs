//! Store abstractions for identity, pairing, and group state.
//!
//! The router never touches a map directly. Each of the three process-wide
//! tables sits behind a trait with explicit `get` / `put` / iterate methods
//! so the in-memory default can be swapped for a persistent or sharded
//! backend without touching routing logic.
//!
//! # Single writer
//!
//! Stores take `&mut self` for every mutation and are owned by exactly one
//! [`MessageRouter`](crate::MessageRouter). Serialization is the driver's
//! job (one lock or one dispatch queue in front of the router), so the
//! traits carry no `Send`/`Sync` or interior-mutability requirements.

mod memory;

use ghostchat_proto::{Code, GroupId};
pub use memory::{MemoryGroupStore, MemoryIdentityStore, MemoryPairingStore};

use crate::{
    error::StoreError,
    group::Group,
    identity::{Identity, SessionToken},
};

/// Table of registered identities, keyed by code.
pub trait IdentityStore {
    /// Look up an identity by code.
    fn get(&self, code: &Code) -> Result<Option<Identity>, StoreError>;

    /// Insert or overwrite the identity stored under `identity.code`.
    fn put(&mut self, identity: Identity) -> Result<(), StoreError>;

    /// Find the identity whose active token equals `token`.
    fn find_by_token(&self, token: &SessionToken) -> Result<Option<Code>, StoreError>;

    /// Number of registered identities.
    fn len(&self) -> Result<usize, StoreError>;

    /// Whether an identity exists for `code`.
    fn contains(&self, code: &Code) -> Result<bool, StoreError> {
        Ok(self.get(code)?.is_some())
    }

    /// Whether no identity has been registered.
    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }
}

/// Symmetric pairing relation between codes.
pub trait PairingStore {
    /// Record the edge in both directions at once.
    ///
    /// Returns `true` if the edge did not exist before.
    fn insert_pair(&mut self, a: &Code, b: &Code) -> Result<bool, StoreError>;

    /// Whether `a` and `b` are paired.
    fn contains_pair(&self, a: &Code, b: &Code) -> Result<bool, StoreError>;

    /// Every code paired with `code`, in ascending order.
    fn partners(&self, code: &Code) -> Result<Vec<Code>, StoreError>;
}

/// Table of groups, keyed by id. Groups are never deleted.
pub trait GroupStore {
    /// Look up a group by id.
    fn get(&self, id: &GroupId) -> Result<Option<Group>, StoreError>;

    /// Insert or overwrite the group stored under `group.id()`.
    fn put(&mut self, group: Group) -> Result<(), StoreError>;

    /// Every stored group id, in ascending order.
    fn ids(&self) -> Result<Vec<GroupId>, StoreError>;

    /// Whether a group exists for `id`.
    fn contains(&self, id: &GroupId) -> Result<bool, StoreError> {
        Ok(self.get(id)?.is_some())
    }
}
