use std::sync::Arc;

use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use agora_types::api::MemberProfile;
use agora_types::models::{Community, Membership, Role};

use crate::error::{Error, Result};
use crate::ledger::MembershipLedger;
use crate::placeholder_name;
use crate::store::{CommunityStore, MembershipStore};

/// Community create/join/leave/remove/delete, delegating role bookkeeping
/// to the membership ledger.
#[derive(Clone)]
pub struct CommunityManager {
    communities: Arc<dyn CommunityStore>,
    memberships: Arc<dyn MembershipStore>,
    ledger: MembershipLedger,
}

impl CommunityManager {
    pub fn new(
        communities: Arc<dyn CommunityStore>,
        memberships: Arc<dyn MembershipStore>,
        ledger: MembershipLedger,
    ) -> Self {
        Self {
            communities,
            memberships,
            ledger,
        }
    }

    /// The creator becomes the sole initial admin. The community row is
    /// inserted with member_count already at 1, so the creator's ledger
    /// entry does not bump the count.
    pub fn create(
        &self,
        name: &str,
        description: &str,
        category: &str,
        color: &str,
        creator_id: Uuid,
    ) -> Result<Community> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation("community name must not be empty".into()));
        }

        let community = Community {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            color: color.to_string(),
            creator_id,
            member_count: 1,
            created_at: Utc::now(),
        };
        self.communities.insert_community(&community)?;

        // The ledger cannot fail: a store failure here degrades the admin
        // record to the fallback cache, so a community never exists without
        // its creator's admin membership.
        self.ledger.add(community.id, creator_id, Role::Admin);

        Ok(community)
    }

    pub fn list(&self) -> Result<Vec<Community>> {
        Ok(self.communities.communities()?)
    }

    pub fn join(&self, community_id: Uuid, user_id: Uuid) -> Result<Membership> {
        match self.communities.community(community_id) {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Err(Error::NotFound(format!(
                    "community {community_id} does not exist"
                )));
            }
            // Can't verify while the store is down; membership writes have
            // their own degraded path, so keep going.
            Err(e) => warn!(%community_id, "community lookup failed, joining degraded: {e}"),
        }

        if self.ledger.membership(community_id, user_id).is_some() {
            return Err(Error::Conflict("already a member of this community".into()));
        }

        let membership = self.ledger.add(community_id, user_id, Role::Member);
        self.bump_member_count(community_id, 1);
        Ok(membership)
    }

    /// Admins may not leave, even as the last remaining member; the roster
    /// operations are the only way an admin membership ends.
    pub fn leave(&self, community_id: Uuid, user_id: Uuid) -> Result<()> {
        let membership = self
            .ledger
            .membership(community_id, user_id)
            .ok_or_else(|| Error::NotFound("not a member of this community".into()))?;

        if membership.role == Role::Admin {
            return Err(Error::Authorization(
                "admins cannot leave their community".into(),
            ));
        }

        self.ledger.remove(community_id, user_id);
        self.bump_member_count(community_id, -1);
        Ok(())
    }

    pub fn remove_member(
        &self,
        community_id: Uuid,
        target_user_id: Uuid,
        acting_user_id: Uuid,
    ) -> Result<()> {
        self.require_admin(community_id, acting_user_id)?;

        let target = self
            .ledger
            .membership(community_id, target_user_id)
            .ok_or_else(|| Error::NotFound("target is not a member of this community".into()))?;

        if target.role == Role::Admin {
            return Err(Error::Authorization(
                "admins cannot be removed from their community".into(),
            ));
        }

        self.ledger.remove(community_id, target_user_id);
        self.bump_member_count(community_id, -1);
        Ok(())
    }

    /// Best-effort cascade: memberships, then community-scoped posts, then
    /// the community row. Sub-deletion failures are logged and swallowed so
    /// the deletion as a whole still completes.
    pub fn delete(&self, community_id: Uuid, acting_user_id: Uuid) -> Result<()> {
        self.require_admin(community_id, acting_user_id)?;

        if let Err(e) = self.communities.delete_community_memberships(community_id) {
            error!(%community_id, "failed to delete community memberships, continuing: {e}");
        }
        if let Err(e) = self.communities.delete_community_posts(community_id) {
            error!(%community_id, "failed to delete community posts, continuing: {e}");
        }
        if let Err(e) = self.communities.delete_community(community_id) {
            error!(%community_id, "failed to delete community record, continuing: {e}");
        }

        self.ledger.evict_community(community_id);
        Ok(())
    }

    /// Roster listing, restricted to current members. Members with no
    /// profile row get a synthesized display name.
    pub fn members(
        &self,
        community_id: Uuid,
        requesting_user_id: Uuid,
    ) -> Result<Vec<MemberProfile>> {
        if self
            .ledger
            .membership(community_id, requesting_user_id)
            .is_none()
        {
            return Err(Error::Authorization(
                "only members may list the member roster".into(),
            ));
        }

        let records = self.memberships.community_members(community_id)?;
        Ok(records
            .into_iter()
            .map(|r| MemberProfile {
                user_id: r.membership.user_id,
                role: r.membership.role,
                joined_at: r.membership.joined_at,
                display_name: r
                    .display_name
                    .unwrap_or_else(|| placeholder_name(r.membership.user_id)),
                avatar_url: r.avatar_url,
            })
            .collect())
    }

    /// Current membership for a user, fallback-aware. Used by the post
    /// pass-through for its ownership checks.
    pub fn membership(&self, community_id: Uuid, user_id: Uuid) -> Option<Membership> {
        self.ledger.membership(community_id, user_id)
    }

    fn require_admin(&self, community_id: Uuid, user_id: Uuid) -> Result<()> {
        match self.ledger.membership(community_id, user_id) {
            Some(m) if m.role == Role::Admin => Ok(()),
            _ => Err(Error::Authorization(
                "this operation requires a community admin".into(),
            )),
        }
    }

    fn bump_member_count(&self, community_id: Uuid, delta: i64) {
        // The membership change already happened (or degraded); a failed
        // count update must not undo it.
        if let Err(e) = self.memberships.adjust_member_count(community_id, delta) {
            warn!(%community_id, delta, "member count update failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FallbackCache;
    use crate::store::StoreError;
    use crate::testutil::{FailingStore, MemStore};

    fn manager() -> (Arc<MemStore>, CommunityManager) {
        let store = Arc::new(MemStore::new());
        let ledger = MembershipLedger::new(store.clone(), Arc::new(FallbackCache::new()));
        let manager = CommunityManager::new(store.clone(), store.clone(), ledger);
        (store, manager)
    }

    fn uid(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    #[test]
    fn create_seeds_exactly_one_admin_membership() {
        let (store, manager) = manager();
        let creator = uid(1);

        let community = manager
            .create("Robotics", "bots", "tech", "#ff0000", creator)
            .unwrap();
        assert_eq!(community.member_count, 1);

        let members = store.community_members(community.id).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].membership.user_id, creator);
        assert_eq!(members[0].membership.role, Role::Admin);
    }

    #[test]
    fn create_rejects_whitespace_names() {
        let (_, manager) = manager();
        let err = manager.create("   ", "", "", "", uid(1)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn join_is_rejected_for_existing_members() {
        let (_, manager) = manager();
        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();

        manager.join(community.id, uid(2)).unwrap();
        let err = manager.join(community.id, uid(2)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn join_unknown_community_is_not_found() {
        let (_, manager) = manager();
        let err = manager.join(uid(99), uid(2)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn member_count_follows_membership_rows() {
        let (store, manager) = manager();
        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();

        manager.join(community.id, uid(2)).unwrap();
        manager.join(community.id, uid(3)).unwrap();
        assert_eq!(store.member_count(community.id), 3);
        assert_eq!(store.community_members(community.id).unwrap().len(), 3);

        manager.leave(community.id, uid(3)).unwrap();
        assert_eq!(store.member_count(community.id), 2);
        assert_eq!(store.community_members(community.id).unwrap().len(), 2);
    }

    #[test]
    fn admins_cannot_leave_even_alone() {
        let (_, manager) = manager();
        let creator = uid(1);
        let community = manager.create("Robotics", "", "", "", creator).unwrap();

        // Degenerate single-member community: still rejected.
        let err = manager.leave(community.id, creator).unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[test]
    fn leave_without_membership_is_not_found() {
        let (_, manager) = manager();
        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();
        let err = manager.leave(community.id, uid(9)).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn remove_member_requires_an_admin_actor() {
        let (_, manager) = manager();
        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();
        manager.join(community.id, uid(2)).unwrap();
        manager.join(community.id, uid(3)).unwrap();

        // A plain member may not remove anyone.
        let err = manager
            .remove_member(community.id, uid(3), uid(2))
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        // Neither may a stranger.
        let err = manager
            .remove_member(community.id, uid(3), uid(9))
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[test]
    fn remove_member_never_targets_admins() {
        let (_, manager) = manager();
        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();

        let err = manager
            .remove_member(community.id, uid(1), uid(1))
            .unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[test]
    fn remove_member_deletes_the_target_row() {
        let (store, manager) = manager();
        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();
        manager.join(community.id, uid(2)).unwrap();

        manager.remove_member(community.id, uid(2), uid(1)).unwrap();
        assert!(store.membership(community.id, uid(2)).unwrap().is_none());
        assert_eq!(store.member_count(community.id), 1);
    }

    #[test]
    fn delete_cascades_and_evicts_fallback_entries() {
        let store = Arc::new(MemStore::new());
        let cache = Arc::new(FallbackCache::new());
        let ledger = MembershipLedger::new(store.clone(), cache.clone());
        let manager = CommunityManager::new(store.clone(), store.clone(), ledger);

        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();
        manager.join(community.id, uid(2)).unwrap();
        cache.insert(crate::store::membership_now(
            community.id,
            uid(7),
            Role::Member,
        ));

        manager.delete(community.id, uid(1)).unwrap();
        assert!(store.community(community.id).unwrap().is_none());
        assert!(store.community_members(community.id).unwrap().is_empty());
        assert!(cache.is_empty());
    }

    #[test]
    fn delete_requires_admin() {
        let (_, manager) = manager();
        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();
        manager.join(community.id, uid(2)).unwrap();

        let err = manager.delete(community.id, uid(2)).unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));
    }

    #[test]
    fn members_listing_requires_membership() {
        let (_, manager) = manager();
        let community = manager.create("Robotics", "", "", "", uid(1)).unwrap();

        let err = manager.members(community.id, uid(9)).unwrap_err();
        assert!(matches!(err, Error::Authorization(_)));

        let roster = manager.members(community.id, uid(1)).unwrap();
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].role, Role::Admin);
    }

    #[test]
    fn members_listing_synthesizes_missing_display_names() {
        let (_, manager) = manager();
        let creator = Uuid::parse_str("00000000-0000-0000-0000-00000000abcd").unwrap();
        let community = manager.create("Robotics", "", "", "", creator).unwrap();

        // MemStore has no profile rows, so every name is synthesized.
        let roster = manager.members(community.id, creator).unwrap();
        assert_eq!(roster[0].display_name, "User abcd");
    }

    #[test]
    fn membership_invariants_hold_with_a_failing_store() {
        let cache = Arc::new(FallbackCache::new());
        let failing = Arc::new(FailingStore);
        let ledger = MembershipLedger::new(failing.clone(), cache.clone());
        let manager = CommunityManager::new(failing.clone(), failing, ledger);

        // Community lookup degrades, duplicate detection still works via
        // the cache, and the double join is still a conflict.
        manager.join(uid(50), uid(2)).unwrap();
        assert_eq!(cache.len(), 1);
        let err = manager.join(uid(50), uid(2)).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        // Member listing has no degraded path and surfaces the store error.
        // (The requester's own membership check passes via the cache.)
        let err = manager.members(uid(50), uid(2)).unwrap_err();
        assert!(matches!(err, Error::Store(StoreError::Unavailable(_))));
    }
}
