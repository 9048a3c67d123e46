use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use agora_core::cache::FallbackCache;
use agora_core::community::CommunityManager;
use agora_core::friends::FriendManager;
use agora_core::ledger::MembershipLedger;
use agora_db::Database;
use agora_types::api::{
    ApiSuccess, Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse,
};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub communities: CommunityManager,
    pub friends: FriendManager,
    pub jwt_secret: String,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, jwt_secret: String) -> Self {
        let fallback = Arc::new(FallbackCache::new());
        let ledger = MembershipLedger::new(db.clone(), fallback);
        let communities = CommunityManager::new(db.clone(), db.clone(), ledger);
        let friends = FriendManager::new(db.clone(), db.clone());
        Self {
            db,
            communities,
            friends,
            jwt_secret,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Validate input
    if req.username.len() < 3 || req.username.len() > 32 {
        return Err(ApiError::validation("username must be 3 to 32 characters"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::validation("password must be at least 8 characters"));
    }

    // Check if username is taken
    if state.db.user_by_username(&req.username)?.is_some() {
        return Err(ApiError::conflict("username is already taken"));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| ApiError::internal("password hashing failed"))?
        .to_string();

    let user_id = Uuid::new_v4();
    let display_name = req
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(&req.username);

    state.db.create_user(
        &user_id.to_string(),
        &req.username,
        &password_hash,
        display_name,
        req.avatar_url.as_deref(),
    )?;

    let token = create_token(&state.jwt_secret, user_id, &req.username)
        .map_err(|_| ApiError::internal("token issuance failed"))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiSuccess::new(RegisterResponse { user_id, token })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .user_by_username(&req.username)?
        .ok_or_else(|| ApiError::unauthorized("unknown username or wrong password"))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| ApiError::internal("stored password hash is unreadable"))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::unauthorized("unknown username or wrong password"))?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| ApiError::internal("stored user id is unreadable"))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)
        .map_err(|_| ApiError::internal("token issuance failed"))?;

    Ok(Json(ApiSuccess::new(LoginResponse {
        user_id,
        username: user.username,
        token,
    })))
}

fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}
