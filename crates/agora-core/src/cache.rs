use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use agora_types::models::Membership;

/// Process-lifetime fallback for membership records, consulted only when
/// the durable store fails. Entries are keyed by (community_id, user_id),
/// matching the durable composite key. Never authoritative once the store
/// answers again: a durable hit always wins over a cached one.
#[derive(Debug, Default)]
pub struct FallbackCache {
    entries: Mutex<HashMap<(Uuid, Uuid), Membership>>,
}

impl FallbackCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<(Uuid, Uuid), Membership>> {
        // Map operations cannot leave the map inconsistent, so a poisoned
        // lock is still safe to reuse.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get(&self, community_id: Uuid, user_id: Uuid) -> Option<Membership> {
        self.lock().get(&(community_id, user_id)).cloned()
    }

    pub fn insert(&self, membership: Membership) {
        self.lock()
            .insert((membership.community_id, membership.user_id), membership);
    }

    pub fn remove(&self, community_id: Uuid, user_id: Uuid) {
        self.lock().remove(&(community_id, user_id));
    }

    /// Drop every cached entry for a community.
    pub fn remove_community(&self, community_id: Uuid) {
        self.lock().retain(|(cid, _), _| *cid != community_id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
