//! In-memory implementation of `GrantStore`.
//!
//! Grants live in a `HashMap` keyed by principal behind an `RwLock`: many
//! concurrent gate evaluations read, while grant and revoke take the write
//! lock briefly.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use tracing::debug;

use toolgate_contracts::{
    capability::{CapabilityGrant, CapabilitySet, GrantId},
    error::{GateError, GateResult},
    principal::PrincipalId,
};
use toolgate_core::traits::GrantStore;

use crate::strip;

/// A `GrantStore` that forgets everything when dropped.
///
/// Cloning shares the underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGrantStore {
    grants: Arc<RwLock<HashMap<PrincipalId, Vec<CapabilityGrant>>>>,
}

impl InMemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored grants, expired or not.
    pub fn len(&self) -> usize {
        self.read()
            .map(|grants| grants.values().map(Vec::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> GateResult<RwLockReadGuard<'_, HashMap<PrincipalId, Vec<CapabilityGrant>>>> {
        self.grants.read().map_err(|e| GateError::StorageError {
            reason: format!("grant store lock poisoned: {e}"),
        })
    }

    fn write(&self) -> GateResult<RwLockWriteGuard<'_, HashMap<PrincipalId, Vec<CapabilityGrant>>>> {
        self.grants.write().map_err(|e| GateError::StorageError {
            reason: format!("grant store lock poisoned: {e}"),
        })
    }
}

impl GrantStore for InMemoryGrantStore {
    fn insert(&self, grant: CapabilityGrant) -> GateResult<GrantId> {
        let grant_id = grant.grant_id.clone();
        self.write()?
            .entry(grant.principal.clone())
            .or_default()
            .push(grant);
        Ok(grant_id)
    }

    fn revoke(&self, principal: &PrincipalId, capabilities: &CapabilitySet) -> GateResult<usize> {
        let mut grants = self.write()?;
        let Some(held) = grants.get_mut(principal) else {
            return Ok(0);
        };

        let mut touched = 0;
        for grant in held.iter_mut() {
            if strip(grant, capabilities) {
                touched += 1;
            }
        }
        held.retain(|g| !g.capabilities.is_empty());
        if held.is_empty() {
            grants.remove(principal);
        }

        debug!(principal = %principal, touched, "grants revoked in memory");
        Ok(touched)
    }

    fn active_grants(
        &self,
        principal: &PrincipalId,
        now: DateTime<Utc>,
    ) -> GateResult<Vec<CapabilityGrant>> {
        Ok(self
            .read()?
            .get(principal)
            .map(|held| held.iter().filter(|g| !g.is_expired(now)).cloned().collect())
            .unwrap_or_default())
    }

    fn purge_expired(&self, now: DateTime<Utc>) -> GateResult<usize> {
        let mut grants = self.write()?;
        let mut purged = 0;
        for held in grants.values_mut() {
            let before = held.len();
            held.retain(|g| !g.is_expired(now));
            purged += before - held.len();
        }
        grants.retain(|_, held| !held.is_empty());
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use toolgate_contracts::capability::{Capability, GrantScope};

    use super::*;

    fn caps(list: &[Capability]) -> CapabilitySet {
        list.iter().copied().collect()
    }

    fn alice() -> PrincipalId {
        PrincipalId::new("alice")
    }

    #[test]
    fn insert_then_read_back() {
        let store = InMemoryGrantStore::new();
        let grant = CapabilityGrant::new(alice(), caps(&[Capability::ReadLocalData]), None, None);
        let id = store.insert(grant.clone()).unwrap();

        assert_eq!(id, grant.grant_id);
        assert_eq!(store.active_grants(&alice(), Utc::now()).unwrap(), vec![grant]);
        assert!(store
            .active_grants(&PrincipalId::new("bob"), Utc::now())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn expired_grants_are_not_active() {
        let store = InMemoryGrantStore::new();
        let now = Utc::now();
        store
            .insert(CapabilityGrant::new(
                alice(),
                caps(&[Capability::ModifyCalendar]),
                None,
                Some(now + Duration::seconds(10)),
            ))
            .unwrap();

        assert_eq!(store.active_grants(&alice(), now).unwrap().len(), 1);
        assert!(store
            .active_grants(&alice(), now + Duration::seconds(10))
            .unwrap()
            .is_empty());

        assert_eq!(store.purge_expired(now + Duration::seconds(11)).unwrap(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn revoke_strips_capabilities_and_drops_empty_grants() {
        let store = InMemoryGrantStore::new();
        store
            .insert(CapabilityGrant::new(
                alice(),
                caps(&[Capability::ReadLocalData, Capability::WriteLocalData]),
                None,
                None,
            ))
            .unwrap();
        store
            .insert(CapabilityGrant::new(
                alice(),
                caps(&[Capability::ReadLocalData]),
                Some(GrantScope::new(["/home/alice/*"])),
                None,
            ))
            .unwrap();

        let touched = store
            .revoke(&alice(), &caps(&[Capability::ReadLocalData]))
            .unwrap();
        assert_eq!(touched, 2);

        let left = store.active_grants(&alice(), Utc::now()).unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].capabilities, caps(&[Capability::WriteLocalData]));

        // Nothing left to revoke.
        assert_eq!(
            store.revoke(&alice(), &caps(&[Capability::ReadLocalData])).unwrap(),
            0
        );
    }
}
