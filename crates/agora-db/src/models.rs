//! Database row types and their conversions into the shared domain models.
//! Rows carry raw TEXT columns; parsing happens once, here, with corrupt
//! values logged and defaulted rather than failing a whole listing.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use agora_types::models::{
    Community, CommunityPost, FriendRequest, Friendship, Membership, RequestStatus, Role,
    UserProfile,
};

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub created_at: String,
}

pub struct CommunityRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub color: String,
    pub creator_id: String,
    pub member_count: i64,
    pub created_at: String,
}

pub struct MembershipRow {
    pub community_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: String,
}

pub struct FriendRequestRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

pub struct FriendshipRow {
    pub id: String,
    pub user1_id: String,
    pub user2_id: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub community_id: String,
    pub author_id: String,
    pub author_name: Option<String>,
    pub content: String,
    pub created_at: String,
}

/// SQLite defaults store timestamps as "YYYY-MM-DD HH:MM:SS" without a
/// timezone; rows we write ourselves carry RFC 3339. Accept both.
pub(crate) fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("corrupt timestamp '{raw}': {e}");
            DateTime::default()
        })
}

pub(crate) fn parse_id(raw: &str, what: &str) -> Uuid {
    raw.parse().unwrap_or_else(|e| {
        warn!("corrupt {what} id '{raw}': {e}");
        Uuid::default()
    })
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            id: parse_id(&row.id, "user"),
            username: row.username,
            display_name: row.display_name,
            avatar_url: row.avatar_url,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

impl From<CommunityRow> for Community {
    fn from(row: CommunityRow) -> Self {
        Community {
            id: parse_id(&row.id, "community"),
            name: row.name,
            description: row.description,
            category: row.category,
            color: row.color,
            creator_id: parse_id(&row.creator_id, "creator"),
            member_count: row.member_count,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

impl From<MembershipRow> for Membership {
    fn from(row: MembershipRow) -> Self {
        Membership {
            community_id: parse_id(&row.community_id, "community"),
            user_id: parse_id(&row.user_id, "user"),
            role: row.role.parse().unwrap_or_else(|e| {
                warn!("corrupt membership role: {e}");
                Role::Member
            }),
            joined_at: parse_timestamp(&row.joined_at),
        }
    }
}

impl From<FriendRequestRow> for FriendRequest {
    fn from(row: FriendRequestRow) -> Self {
        FriendRequest {
            id: parse_id(&row.id, "request"),
            sender_id: parse_id(&row.sender_id, "sender"),
            receiver_id: parse_id(&row.receiver_id, "receiver"),
            status: row.status.parse().unwrap_or_else(|e| {
                warn!("corrupt request status: {e}");
                RequestStatus::Pending
            }),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

impl From<FriendshipRow> for Friendship {
    fn from(row: FriendshipRow) -> Self {
        Friendship {
            id: parse_id(&row.id, "friendship"),
            user1_id: parse_id(&row.user1_id, "user1"),
            user2_id: parse_id(&row.user2_id, "user2"),
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

impl From<PostRow> for CommunityPost {
    fn from(row: PostRow) -> Self {
        CommunityPost {
            id: parse_id(&row.id, "post"),
            community_id: parse_id(&row.community_id, "community"),
            author_id: parse_id(&row.author_id, "author"),
            author_name: row.author_name.unwrap_or_else(|| "unknown".to_string()),
            content: row.content,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}
