use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, SessionStore};

use crate::config::Config;
use crate::db::Store;

pub mod auth;
mod comments;
mod error;
mod flags;
mod posts;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

pub struct AppState {
    pub config: Config,

    store: Store,

    pub start_time: std::time::Instant,
}

impl AppState {
    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    Ok(Arc::new(AppState {
        config,
        store,
        start_time: std::time::Instant::now(),
    }))
}

/// Build the router over the default in-memory session store.
pub async fn router(state: Arc<AppState>) -> Router {
    let ttl = state.config.server.session_ttl_minutes;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(ttl)));

    router_with_sessions(state, session_layer)
}

/// Build the router over any session store. The store is the swap point for
/// a deployment that wants sessions to outlive the process.
pub fn router_with_sessions<S>(state: Arc<AppState>, session_layer: SessionManagerLayer<S>) -> Router
where
    S: SessionStore + Clone,
{
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/totp", post(auth::complete_second_factor))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::current_session))
        .route("/posts", get(posts::list_posts))
        .route("/posts", post(posts::create_post))
        .route("/posts/{id}", get(posts::get_post))
        .route("/posts/{id}", delete(posts::delete_post))
        .route("/posts/{id}/comments", get(comments::list_comments))
        .route("/posts/{id}/comments", post(comments::create_comment))
        .route("/comments/{id}", put(comments::edit_comment))
        .route("/comments/{id}", delete(comments::delete_comment))
        .route("/comments/{id}/interesting", put(flags::mark_interesting))
        .route(
            "/comments/{id}/interesting",
            delete(flags::unmark_interesting),
        )
        .route("/system/status", get(system::get_status))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
