//! In-memory store doubles for unit tests: `MemStore` behaves like a
//! healthy durable store, `FailingStore` refuses every operation.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use uuid::Uuid;

use agora_types::models::{
    Community, FriendRequest, Friendship, Membership, RequestStatus, UserProfile,
};

use crate::store::{
    CommunityStore, FriendStore, MemberRecord, MembershipStore, ProfileStore, StoreError,
    StoreResult,
};

#[derive(Default)]
pub struct MemStore {
    memberships: Mutex<HashMap<(Uuid, Uuid), Membership>>,
    communities: Mutex<HashMap<Uuid, Community>>,
    posts: Mutex<Vec<(Uuid, Uuid)>>,
    requests: Mutex<HashMap<Uuid, FriendRequest>>,
    friendships: Mutex<HashMap<Uuid, Friendship>>,
    users: Mutex<Vec<UserProfile>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, username: &str, display_name: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.users.lock().unwrap().push(UserProfile {
            id,
            username: username.to_string(),
            display_name: display_name.to_string(),
            avatar_url: None,
            created_at: Utc::now(),
        });
        id
    }

    pub fn member_count(&self, community_id: Uuid) -> i64 {
        self.communities
            .lock()
            .unwrap()
            .get(&community_id)
            .map(|c| c.member_count)
            .unwrap_or(0)
    }
}

impl MembershipStore for MemStore {
    fn membership(&self, community_id: Uuid, user_id: Uuid) -> StoreResult<Option<Membership>> {
        Ok(self
            .memberships
            .lock()
            .unwrap()
            .get(&(community_id, user_id))
            .cloned())
    }

    fn insert_membership(&self, membership: &Membership) -> StoreResult<()> {
        let key = (membership.community_id, membership.user_id);
        let mut map = self.memberships.lock().unwrap();
        if map.contains_key(&key) {
            return Err(StoreError::Unavailable("duplicate membership row".into()));
        }
        map.insert(key, membership.clone());
        Ok(())
    }

    fn delete_membership(&self, community_id: Uuid, user_id: Uuid) -> StoreResult<()> {
        match self
            .memberships
            .lock()
            .unwrap()
            .remove(&(community_id, user_id))
        {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    fn community_members(&self, community_id: Uuid) -> StoreResult<Vec<MemberRecord>> {
        let users = self.users.lock().unwrap();
        let mut records: Vec<MemberRecord> = self
            .memberships
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.community_id == community_id)
            .map(|m| {
                let profile = users.iter().find(|u| u.id == m.user_id);
                MemberRecord {
                    membership: m.clone(),
                    display_name: profile.map(|p| p.display_name.clone()),
                    avatar_url: profile.and_then(|p| p.avatar_url.clone()),
                }
            })
            .collect();
        records.sort_by_key(|r| r.membership.joined_at);
        Ok(records)
    }

    fn adjust_member_count(&self, community_id: Uuid, delta: i64) -> StoreResult<()> {
        let mut map = self.communities.lock().unwrap();
        let community = map.get_mut(&community_id).ok_or(StoreError::NotFound)?;
        community.member_count = (community.member_count + delta).max(0);
        Ok(())
    }
}

impl CommunityStore for MemStore {
    fn community(&self, id: Uuid) -> StoreResult<Option<Community>> {
        Ok(self.communities.lock().unwrap().get(&id).cloned())
    }

    fn communities(&self) -> StoreResult<Vec<Community>> {
        let mut all: Vec<Community> = self.communities.lock().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    fn insert_community(&self, community: &Community) -> StoreResult<()> {
        self.communities
            .lock()
            .unwrap()
            .insert(community.id, community.clone());
        Ok(())
    }

    fn delete_community(&self, id: Uuid) -> StoreResult<()> {
        match self.communities.lock().unwrap().remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound),
        }
    }

    fn delete_community_memberships(&self, community_id: Uuid) -> StoreResult<usize> {
        let mut map = self.memberships.lock().unwrap();
        let before = map.len();
        map.retain(|(cid, _), _| *cid != community_id);
        Ok(before - map.len())
    }

    fn delete_community_posts(&self, community_id: Uuid) -> StoreResult<usize> {
        let mut posts = self.posts.lock().unwrap();
        let before = posts.len();
        posts.retain(|(_, cid)| *cid != community_id);
        Ok(before - posts.len())
    }
}

impl FriendStore for MemStore {
    fn insert_request(&self, request: &FriendRequest) -> StoreResult<()> {
        self.requests
            .lock()
            .unwrap()
            .insert(request.id, request.clone());
        Ok(())
    }

    fn request_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<FriendRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .values()
            .find(|r| {
                (r.sender_id == a && r.receiver_id == b)
                    || (r.sender_id == b && r.receiver_id == a)
            })
            .cloned())
    }

    fn pending_request_from(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> StoreResult<Option<FriendRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .values()
            .find(|r| {
                r.sender_id == sender_id
                    && r.receiver_id == receiver_id
                    && r.status == RequestStatus::Pending
            })
            .cloned())
    }

    fn transition_request(
        &self,
        id: Uuid,
        receiver_id: Uuid,
        from: RequestStatus,
        to: RequestStatus,
    ) -> StoreResult<FriendRequest> {
        let mut map = self.requests.lock().unwrap();
        match map.get_mut(&id) {
            Some(r) if r.receiver_id == receiver_id && r.status == from => {
                r.status = to;
                r.updated_at = Utc::now();
                Ok(r.clone())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    fn delete_request(&self, id: Uuid, sender_id: Uuid) -> StoreResult<()> {
        let mut map = self.requests.lock().unwrap();
        match map.get(&id) {
            Some(r) if r.sender_id == sender_id && r.status == RequestStatus::Pending => {
                map.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    fn pending_requests_for(&self, user_id: Uuid) -> StoreResult<Vec<FriendRequest>> {
        Ok(self
            .requests
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.status == RequestStatus::Pending
                    && (r.sender_id == user_id || r.receiver_id == user_id)
            })
            .cloned()
            .collect())
    }

    fn insert_friendship(&self, friendship: &Friendship) -> StoreResult<()> {
        self.friendships
            .lock()
            .unwrap()
            .insert(friendship.id, friendship.clone());
        Ok(())
    }

    fn friendship_between(&self, a: Uuid, b: Uuid) -> StoreResult<Option<Friendship>> {
        Ok(self
            .friendships
            .lock()
            .unwrap()
            .values()
            .find(|f| {
                (f.user1_id == a && f.user2_id == b) || (f.user1_id == b && f.user2_id == a)
            })
            .cloned())
    }

    fn friendships_of(&self, user_id: Uuid) -> StoreResult<Vec<Friendship>> {
        Ok(self
            .friendships
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.user1_id == user_id || f.user2_id == user_id)
            .cloned()
            .collect())
    }
}

impl ProfileStore for MemStore {
    fn find_by_username(&self, username: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    fn profile(&self, id: Uuid) -> StoreResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.id == id)
            .cloned())
    }
}

/// Every operation fails with `Unavailable`.
pub struct FailingStore;

fn unavailable<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("injected failure".into()))
}

impl MembershipStore for FailingStore {
    fn membership(&self, _: Uuid, _: Uuid) -> StoreResult<Option<Membership>> {
        unavailable()
    }

    fn insert_membership(&self, _: &Membership) -> StoreResult<()> {
        unavailable()
    }

    fn delete_membership(&self, _: Uuid, _: Uuid) -> StoreResult<()> {
        unavailable()
    }

    fn community_members(&self, _: Uuid) -> StoreResult<Vec<MemberRecord>> {
        unavailable()
    }

    fn adjust_member_count(&self, _: Uuid, _: i64) -> StoreResult<()> {
        unavailable()
    }
}

impl CommunityStore for FailingStore {
    fn community(&self, _: Uuid) -> StoreResult<Option<Community>> {
        unavailable()
    }

    fn communities(&self) -> StoreResult<Vec<Community>> {
        unavailable()
    }

    fn insert_community(&self, _: &Community) -> StoreResult<()> {
        unavailable()
    }

    fn delete_community(&self, _: Uuid) -> StoreResult<()> {
        unavailable()
    }

    fn delete_community_memberships(&self, _: Uuid) -> StoreResult<usize> {
        unavailable()
    }

    fn delete_community_posts(&self, _: Uuid) -> StoreResult<usize> {
        unavailable()
    }
}
