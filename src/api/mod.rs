use axum::{
    Router,
    http::HeaderValue,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::db::Store;
use crate::services::TokenSigner;

pub mod auth;
mod error;
mod links;
mod tags;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub signer: TokenSigner,
}

impl AppState {
    #[must_use]
    pub const fn per_page(&self) -> u64 {
        self.config.general.per_page
    }
}

pub async fn create_app_state(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let signer = TokenSigner::new(&config.auth.token_secret, config.auth.token_expiry_hours);

    Ok(Arc::new(AppState {
        config,
        store,
        signer,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            state.config.server.session_minutes,
        )));

    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let api_router = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/users", post(users::signup))
        .route("/users/invited", post(users::claim_invite))
        .route("/users/password", put(users::change_password))
        .route("/invites", post(users::create_invite))
        .route("/invites", get(users::list_invites))
        .route("/u/{user}", get(links::list_links))
        .route("/u/{user}/links", post(links::create_link))
        .route("/u/{user}/links/{id}", get(links::get_link))
        .route("/u/{user}/links/{id}", put(links::update_link))
        .route("/u/{user}/links/{id}", delete(links::delete_link))
        .route("/u/{user}/search", get(links::search_links))
        .route("/u/{user}/tags", get(tags::list_tags))
        .route("/u/{user}/t/{*tag}", get(tags::links_for_tag))
        .route("/u/{user}/related/{*tag}", get(tags::related_tags))
        .route("/u/{user}/import", post(users::import))
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
