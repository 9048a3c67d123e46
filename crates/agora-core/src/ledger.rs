use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use agora_types::models::{Membership, Role};

use crate::cache::FallbackCache;
use crate::store::{membership_now, MembershipStore, StoreError};

/// Tracks who belongs to which community. Reads and writes go to the
/// durable store first and degrade to the injected fallback cache when the
/// store fails; no method here ever surfaces a store error to its caller.
#[derive(Clone)]
pub struct MembershipLedger {
    store: Arc<dyn MembershipStore>,
    fallback: Arc<FallbackCache>,
}

impl MembershipLedger {
    pub fn new(store: Arc<dyn MembershipStore>, fallback: Arc<FallbackCache>) -> Self {
        Self { store, fallback }
    }

    /// Absence is a valid, non-error result. A durable hit wins; on a
    /// durable miss or failure the fallback cache may still hold a record
    /// written during an earlier degraded add.
    pub fn membership(&self, community_id: Uuid, user_id: Uuid) -> Option<Membership> {
        match self.store.membership(community_id, user_id) {
            Ok(Some(m)) => Some(m),
            Ok(None) => self.fallback.get(community_id, user_id),
            Err(e) => {
                warn!(%community_id, %user_id, "membership read failed, consulting fallback: {e}");
                self.fallback.get(community_id, user_id)
            }
        }
    }

    /// Insert a membership. On store failure the record is kept only in
    /// the fallback cache; the returned value does not reveal which path
    /// was taken.
    pub fn add(&self, community_id: Uuid, user_id: Uuid, role: Role) -> Membership {
        let membership = membership_now(community_id, user_id, role);
        match self.store.insert_membership(&membership) {
            Ok(()) => {
                // The durable row is now authoritative; a leftover cache
                // entry from an earlier degraded add must not shadow it.
                self.fallback.remove(community_id, user_id);
            }
            Err(e) => {
                warn!(%community_id, %user_id, "membership insert failed, keeping record in fallback cache: {e}");
                self.fallback.insert(membership.clone());
            }
        }
        membership
    }

    /// Idempotent removal. A missing durable row is not a failure, and a
    /// store error only costs us the durable delete; the fallback entry is
    /// evicted regardless.
    pub fn remove(&self, community_id: Uuid, user_id: Uuid) {
        match self.store.delete_membership(community_id, user_id) {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => {
                warn!(%community_id, %user_id, "membership delete failed: {e}");
            }
        }
        self.fallback.remove(community_id, user_id);
    }

    /// Drop all fallback entries for a community (community deletion).
    pub fn evict_community(&self, community_id: Uuid) {
        self.fallback.remove_community(community_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FailingStore, MemStore};

    fn ids() -> (Uuid, Uuid) {
        (Uuid::from_u128(100), Uuid::from_u128(200))
    }

    #[test]
    fn durable_path_does_not_touch_the_cache() {
        let store = Arc::new(MemStore::new());
        let cache = Arc::new(FallbackCache::new());
        let ledger = MembershipLedger::new(store.clone(), cache.clone());
        let (cid, uid) = ids();

        let added = ledger.add(cid, uid, Role::Member);
        assert_eq!(added.role, Role::Member);
        assert!(cache.is_empty());

        let found = ledger.membership(cid, uid).expect("membership present");
        assert_eq!(found.user_id, uid);
    }

    #[test]
    fn failing_store_degrades_to_cache() {
        let store = Arc::new(FailingStore);
        let cache = Arc::new(FallbackCache::new());
        let ledger = MembershipLedger::new(store, cache.clone());
        let (cid, uid) = ids();

        let added = ledger.add(cid, uid, Role::Admin);
        assert_eq!(added.role, Role::Admin);
        assert_eq!(cache.len(), 1);

        // Reads route through the cache while the store is down.
        let found = ledger.membership(cid, uid).expect("fallback record");
        assert_eq!(found.role, Role::Admin);

        // Removal still reports nothing and clears the cache.
        ledger.remove(cid, uid);
        assert!(cache.is_empty());
        assert!(ledger.membership(cid, uid).is_none());
    }

    #[test]
    fn durable_hit_wins_over_stale_cache_entry() {
        let store = Arc::new(MemStore::new());
        let cache = Arc::new(FallbackCache::new());
        let ledger = MembershipLedger::new(store.clone(), cache.clone());
        let (cid, uid) = ids();

        cache.insert(membership_now(cid, uid, Role::Admin));
        store
            .insert_membership(&membership_now(cid, uid, Role::Member))
            .unwrap();

        let found = ledger.membership(cid, uid).unwrap();
        assert_eq!(found.role, Role::Member);
    }

    #[test]
    fn successful_insert_evicts_stale_fallback_entry() {
        let store = Arc::new(MemStore::new());
        let cache = Arc::new(FallbackCache::new());
        let ledger = MembershipLedger::new(store, cache.clone());
        let (cid, uid) = ids();

        cache.insert(membership_now(cid, uid, Role::Admin));
        ledger.add(cid, uid, Role::Member);
        assert!(cache.is_empty());
    }

    #[test]
    fn remove_is_idempotent() {
        let store = Arc::new(MemStore::new());
        let ledger = MembershipLedger::new(store, Arc::new(FallbackCache::new()));
        let (cid, uid) = ids();

        // Removing something that never existed is fine.
        ledger.remove(cid, uid);
        assert!(ledger.membership(cid, uid).is_none());
    }
}
