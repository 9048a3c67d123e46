use std::sync::Arc;

use chrono::Utc;
use tracing::error;
use uuid::Uuid;

use agora_types::api::{FriendEntry, FriendState, PendingRequests, PublicProfile, RequestEntry};
use agora_types::models::{FriendRequest, Friendship, RequestStatus};

use crate::error::{Error, Result};
use crate::placeholder_name;
use crate::store::{FriendStore, ProfileStore, StoreError, StoreResult};

/// The friend-request state machine: none -> pending -> accepted/rejected,
/// with sender-only cancellation back to none while pending. Acceptance
/// materializes the symmetric friendship row.
#[derive(Clone)]
pub struct FriendManager {
    friends: Arc<dyn FriendStore>,
    profiles: Arc<dyn ProfileStore>,
}

impl FriendManager {
    pub fn new(friends: Arc<dyn FriendStore>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self { friends, profiles }
    }

    /// Any prior request row between the pair blocks a new one, in either
    /// direction and regardless of status; a rejected request therefore
    /// permanently blocks resending.
    pub fn send_request(&self, sender_id: Uuid, receiver_username: &str) -> Result<FriendRequest> {
        let receiver = self
            .profiles
            .find_by_username(receiver_username)?
            .ok_or_else(|| Error::NotFound(format!("no user named '{receiver_username}'")))?;

        if receiver.id == sender_id {
            return Err(Error::Validation(
                "cannot send a friend request to yourself".into(),
            ));
        }

        if self
            .friends
            .friendship_between(sender_id, receiver.id)?
            .is_some()
        {
            return Err(Error::Conflict("already friends with this user".into()));
        }

        if self
            .friends
            .request_between(sender_id, receiver.id)?
            .is_some()
        {
            return Err(Error::Conflict(
                "a friend request already exists between these users".into(),
            ));
        }

        let now = Utc::now();
        let request = FriendRequest {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id: receiver.id,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.friends.insert_request(&request)?;
        Ok(request)
    }

    /// Only the addressed receiver can accept, and only while pending.
    /// Acceptance and the friendship row are a saga: if the friendship
    /// insert fails, the status flip is compensated back to pending so the
    /// accept can be retried.
    pub fn accept(&self, request_id: Uuid, receiver_id: Uuid) -> Result<Friendship> {
        let request = self
            .friends
            .transition_request(
                request_id,
                receiver_id,
                RequestStatus::Pending,
                RequestStatus::Accepted,
            )
            .map_err(|e| match e {
                StoreError::NotFound => {
                    Error::NotFound("no pending request addressed to this user".into())
                }
                other => Error::Store(other),
            })?;

        let (user1_id, user2_id) = Friendship::canonical_pair(request.sender_id, receiver_id);
        let friendship = Friendship {
            id: Uuid::new_v4(),
            user1_id,
            user2_id,
            created_at: Utc::now(),
        };

        if let Err(e) = self.friends.insert_friendship(&friendship) {
            if let Err(revert) = self.friends.transition_request(
                request_id,
                receiver_id,
                RequestStatus::Accepted,
                RequestStatus::Pending,
            ) {
                error!(%request_id, "failed to revert request after friendship insert failure: {revert}");
            }
            return Err(Error::Store(e));
        }

        Ok(friendship)
    }

    pub fn reject(&self, request_id: Uuid, receiver_id: Uuid) -> Result<FriendRequest> {
        self.friends
            .transition_request(
                request_id,
                receiver_id,
                RequestStatus::Pending,
                RequestStatus::Rejected,
            )
            .map_err(|e| match e {
                StoreError::NotFound => {
                    Error::NotFound("no pending request addressed to this user".into())
                }
                other => Error::Store(other),
            })
    }

    /// Sender-only, and only while the request is still pending.
    pub fn cancel(&self, request_id: Uuid, sender_id: Uuid) -> Result<()> {
        match self.friends.delete_request(request_id, sender_id) {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound) => {
                Err(Error::NotFound("no pending request sent by this user".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Every friendship touching the user, each carrying the other party's
    /// display profile.
    pub fn friends(&self, user_id: Uuid) -> Result<Vec<FriendEntry>> {
        let friendships = self.friends.friendships_of(user_id)?;
        let mut entries = Vec::with_capacity(friendships.len());
        for friendship in friendships {
            let other = if friendship.user1_id == user_id {
                friendship.user2_id
            } else {
                friendship.user1_id
            };
            entries.push(FriendEntry {
                friendship_id: friendship.id,
                user: self.public_profile(other)?,
                since: friendship.created_at,
            });
        }
        Ok(entries)
    }

    /// Relation as seen from `user_id`, in priority order: friends, then
    /// an outgoing pending request, then an incoming one, else none.
    pub fn status(&self, user_id: Uuid, other_username: &str) -> Result<FriendState> {
        let other = self
            .profiles
            .find_by_username(other_username)?
            .ok_or_else(|| Error::NotFound(format!("no user named '{other_username}'")))?;

        if self.friends.friendship_between(user_id, other.id)?.is_some() {
            return Ok(FriendState::Friends);
        }
        if self
            .friends
            .pending_request_from(user_id, other.id)?
            .is_some()
        {
            return Ok(FriendState::RequestSent);
        }
        if self
            .friends
            .pending_request_from(other.id, user_id)?
            .is_some()
        {
            return Ok(FriendState::RequestReceived);
        }
        Ok(FriendState::None)
    }

    /// Pending requests involving the user, split by direction.
    pub fn requests(&self, user_id: Uuid) -> Result<PendingRequests> {
        let rows = self.friends.pending_requests_for(user_id)?;
        let mut incoming = Vec::new();
        let mut outgoing = Vec::new();
        for row in rows {
            if row.receiver_id == user_id {
                incoming.push(RequestEntry {
                    request_id: row.id,
                    user: self.public_profile(row.sender_id)?,
                    created_at: row.created_at,
                });
            } else {
                outgoing.push(RequestEntry {
                    request_id: row.id,
                    user: self.public_profile(row.receiver_id)?,
                    created_at: row.created_at,
                });
            }
        }
        Ok(PendingRequests { incoming, outgoing })
    }

    fn public_profile(&self, user_id: Uuid) -> StoreResult<PublicProfile> {
        Ok(match self.profiles.profile(user_id)? {
            Some(p) => PublicProfile {
                id: p.id,
                username: p.username,
                display_name: p.display_name,
                avatar_url: p.avatar_url,
            },
            None => {
                let name = placeholder_name(user_id);
                PublicProfile {
                    id: user_id,
                    username: name.clone(),
                    display_name: name,
                    avatar_url: None,
                }
            }
        })
    }
}
