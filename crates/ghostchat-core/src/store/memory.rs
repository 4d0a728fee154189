//! In-memory stores. All state is wiped on restart.

use std::collections::{BTreeSet, HashMap};

use ghostchat_proto::{Code, GroupId};

use super::{GroupStore, IdentityStore, PairingStore};
use crate::{
    error::StoreError,
    group::Group,
    identity::{Identity, SessionToken},
};

/// Identity table backed by a `HashMap`.
#[derive(Debug, Default, Clone)]
pub struct MemoryIdentityStore {
    identities: HashMap<Code, Identity>,
}

impl MemoryIdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn get(&self, code: &Code) -> Result<Option<Identity>, StoreError> {
        Ok(self.identities.get(code).cloned())
    }

    fn put(&mut self, identity: Identity) -> Result<(), StoreError> {
        self.identities.insert(identity.code().clone(), identity);
        Ok(())
    }

    fn find_by_token(&self, token: &SessionToken) -> Result<Option<Code>, StoreError> {
        // Linear scan: tokens are not indexed.
        Ok(self
            .identities
            .values()
            .find(|identity| identity.token() == Some(token))
            .map(|identity| identity.code().clone()))
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.identities.len())
    }
}

/// Pairing relation backed by an adjacency map.
#[derive(Debug, Default, Clone)]
pub struct MemoryPairingStore {
    edges: HashMap<Code, BTreeSet<Code>>,
}

impl MemoryPairingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl PairingStore for MemoryPairingStore {
    fn insert_pair(&mut self, a: &Code, b: &Code) -> Result<bool, StoreError> {
        let forward = self.edges.entry(a.clone()).or_default().insert(b.clone());
        let backward = self.edges.entry(b.clone()).or_default().insert(a.clone());
        Ok(forward || backward)
    }

    fn contains_pair(&self, a: &Code, b: &Code) -> Result<bool, StoreError> {
        Ok(self.edges.get(a).is_some_and(|partners| partners.contains(b)))
    }

    fn partners(&self, code: &Code) -> Result<Vec<Code>, StoreError> {
        Ok(self
            .edges
            .get(code)
            .map(|partners| partners.iter().cloned().collect())
            .unwrap_or_default())
    }
}

/// Group table backed by a `HashMap`.
#[derive(Debug, Default, Clone)]
pub struct MemoryGroupStore {
    groups: HashMap<GroupId, Group>,
}

impl MemoryGroupStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl GroupStore for MemoryGroupStore {
    fn get(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.groups.get(id).cloned())
    }

    fn put(&mut self, group: Group) -> Result<(), StoreError> {
        self.groups.insert(group.id().clone(), group);
        Ok(())
    }

    fn ids(&self) -> Result<Vec<GroupId>, StoreError> {
        let mut ids: Vec<GroupId> = self.groups.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(raw: &str) -> Code {
        Code::new(raw)
    }

    #[test]
    fn identity_store_overwrites_on_put() {
        let mut store = MemoryIdentityStore::new();
        store.put(Identity::new(code("01"), "1234".to_string())).unwrap();

        let mut updated = store.get(&code("01")).unwrap().unwrap();
        updated.set_token(SessionToken::new("abc"));
        store.put(updated).unwrap();

        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(store.find_by_token(&SessionToken::new("abc")).unwrap(), Some(code("01")));
    }

    #[test]
    fn identity_without_token_never_matches() {
        let mut store = MemoryIdentityStore::new();
        store.put(Identity::new(code("01"), "1234".to_string())).unwrap();

        assert_eq!(store.find_by_token(&SessionToken::new("")).unwrap(), None);
    }

    #[test]
    fn pairing_store_inserts_both_directions() {
        let mut store = MemoryPairingStore::new();

        assert!(store.insert_pair(&code("01"), &code("02")).unwrap());
        assert!(store.contains_pair(&code("01"), &code("02")).unwrap());
        assert!(store.contains_pair(&code("02"), &code("01")).unwrap());
        assert!(!store.insert_pair(&code("02"), &code("01")).unwrap());
    }

    #[test]
    fn partners_are_sorted() {
        let mut store = MemoryPairingStore::new();
        store.insert_pair(&code("01"), &code("03")).unwrap();
        store.insert_pair(&code("01"), &code("02")).unwrap();

        assert_eq!(store.partners(&code("01")).unwrap(), vec![code("02"), code("03")]);
        assert!(store.partners(&code("09")).unwrap().is_empty());
    }
}
