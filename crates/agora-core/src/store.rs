//! Contracts the domain core holds against the durable store.
//!
//! Absence and failure are structurally distinct: a query that runs but
//! matches nothing is `Ok(None)` (or `StoreError::NotFound` for mutations
//! that require a row), while an unreachable or refusing store is
//! `StoreError::Unavailable`. Callers never inspect message text.

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use agora_types::models::{
    Community, FriendRequest, Friendship, Membership, RequestStatus, Role, UserProfile,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation matched no row.
    #[error("no matching row")]
    NotFound,

    /// The store was unreachable or rejected the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Membership row joined with the member's display data, when the profile
/// join produced one.
#[derive(Debug, Clone)]
pub struct MemberRecord {
    pub membership: Membership,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

pub trait MembershipStore: Send + Sync {
    fn membership(&self, community_id: Uuid, user_id: Uuid) -> StoreResult<Option<Membership>>;

    fn insert_membership(&self, membership: &Membership) -> StoreResult<()>;

    /// `NotFound` when no such row existed.
    fn delete_membership(&self, community_id: Uuid, user_id: Uuid) -> StoreResult<()>;

    fn community_members(&self, community_id: Uuid) -> StoreResult<Vec<MemberRecord>>;

    /// Atomic store-side adjustment, clamped at zero.
    fn adjust_member_count(&self, community_id: Uuid, delta: i64) -> StoreResult<()>;
}

pub trait CommunityStore: Send + Sync {
    fn community(&self, id: Uuid) -> StoreResult<Option<Community>>;

    fn communities(&self) -> StoreResult<Vec<Community>>;

    fn insert_community(&self, community: &Community) -> StoreResult<()>;

    fn delete_community(&self, id: Uuid) -> StoreResult<()>;

    /// Returns the number of rows removed.
    fn delete_community_memberships(&self, community_id: Uuid) -> StoreResult<usize>;

    /// Returns the number of rows removed.
    fn delete_community_posts(&self, community_id: Uuid) -> StoreResult<usize>;
}

pub trait FriendStore: Send + Sync {
    fn insert_request(&self, request: &FriendRequest) -> StoreResult<()>;

    /// Any request row between the pair, in either direction, any status.
    fn request_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<FriendRequest>>;

    /// The pending request from `sender` to `receiver`, if one exists.
    fn pending_request_from(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<Option<FriendRequest>>;

    /// Flip a request's status, scoped to the addressed receiver and the
    /// expected current status. Returns the updated row, `NotFound` when
    /// nothing matched the scope.
    fn transition_request(
        &self,
        id: Uuid,
        receiver_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<FriendRequest>;

    /// Delete a pending request, scoped to its sender. `NotFound` when
    /// nothing matched.
    fn delete_request(&self, id: Uuid, sender_id: Uuid) -> StoreResult<()>;

    /// All pending requests where the user is sender or receiver.
    fn pending_requests_for(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>>;

    fn insert_friendship(&self, friendship: &Friendship) -> StoreResult<()>;

    /// Checks both stored orderings.
    fn friendship_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<Friendship>>;

    /// All friendships where the user appears in either position.
    fn friendships_of(&self, user_id: Uuid) -> StoreResult<Vec<Friendship>>;
}

pub trait ProfileStore: Send + Sync {
    fn find_by_username(&self, username: &str) -> StoreResult<Option<UserProfile>>;

    fn profile(&self, id: Uuid) -> StoreResult<Option<UserProfile>>;
}

/// Convenience constructor used by the ledger's degraded write path.
pub fn membership_now(community_id: Uuid, user_id: Uuid, role: Role) -> Membership {
    Membership {
        community_id,
        user_id,
        role,
        joined_at: Utc::now(),
    }
}
