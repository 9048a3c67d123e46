use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use agora_api::auth::{self, AppState, AppStateInner};
use agora_api::communities;
use agora_api::friends;
use agora_api::middleware::require_auth;
use agora_api::posts;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("AGORA_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("AGORA_DB_PATH").unwrap_or_else(|_| "agora.db".into());
    let host = std::env::var("AGORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("AGORA_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = Arc::new(agora_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner::new(db, jwt_secret));

    // Routes
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/communities", post(communities::create_community))
        .route("/communities", get(communities::list_communities))
        .route("/communities/{community_id}", delete(communities::delete_community))
        .route("/communities/{community_id}/join", post(communities::join_community))
        .route("/communities/{community_id}/leave", post(communities::leave_community))
        .route("/communities/{community_id}/members", get(communities::list_members))
        .route(
            "/communities/{community_id}/members/{user_id}",
            delete(communities::remove_member),
        )
        .route("/communities/{community_id}/posts", get(posts::list_posts))
        .route("/communities/{community_id}/posts", post(posts::create_post))
        .route("/friends", get(friends::list_friends))
        .route("/friends/requests", post(friends::send_request))
        .route("/friends/requests", get(friends::list_requests))
        .route("/friends/requests/{request_id}/accept", post(friends::accept_request))
        .route("/friends/requests/{request_id}/reject", post(friends::reject_request))
        .route("/friends/requests/{request_id}", delete(friends::cancel_request))
        .route("/friends/status/{username}", get(friends::friendship_status))
        .layer(middleware::from_fn(require_auth))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Agora server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
