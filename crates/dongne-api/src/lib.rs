//! HTTP surface of the marketplace: REST handlers, session/JWT auth and the
//! `/ws` upgrade, assembled by [`router`].

pub mod auth;
pub mod categories;
pub mod chats;
pub mod config;
pub mod error;
pub mod extract;
pub mod images;
pub mod items;
pub mod likes;
pub mod middleware;
pub mod seed;
pub mod state;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    middleware::from_fn_with_state,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use config::Config;
pub use error::ApiError;
pub use state::{AppState, AppStateInner};

/// Multipart item uploads carry up to ten 5 MB images plus text fields.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let mut public_routes = Router::new()
        .route("/api/health", get(health))
        .route("/api/login", get(auth::login))
        .route("/api/callback", get(auth::callback))
        .route("/api/logout", get(auth::logout))
        .route("/api/categories", get(categories::list_categories))
        .route("/api/items", get(items::list_items));

    if state.config.is_development() {
        info!("Development mode: POST /api/seed enabled");
        public_routes = public_routes.route("/api/seed", post(seed::seed));
    }

    let viewer_routes = Router::new()
        .route("/api/items/{id}", get(items::get_item))
        .layer(from_fn_with_state(state.clone(), middleware::optional_auth));

    let protected_routes = Router::new()
        .route("/api/auth/user", get(auth::current_user))
        .route("/api/auth/token", post(auth::issue_token))
        .route("/api/categories", post(categories::create_category))
        .route("/api/items", post(items::create_item))
        .route("/api/likes", get(likes::list_likes))
        .route("/api/likes/{item_id}", post(likes::toggle_like))
        .route("/api/chats", get(chats::list_chats).post(chats::create_chat))
        .route("/api/chats/{id}", get(chats::get_chat))
        .route("/api/chats/{id}/messages", post(chats::send_message))
        .layer(from_fn_with_state(state.clone(), middleware::require_auth));

    let ws_route = Router::new().route("/ws", get(ws_upgrade));

    let mut app = Router::new()
        .merge(public_routes)
        .merge(viewer_routes)
        .merge(protected_routes)
        .merge(ws_route);

    if let Some(dir) = &state.config.static_dir {
        info!("Serving client bundle from {}", dir.display());
        // Unknown paths get index.html so client-side routes survive a reload
        let spa = ServeDir::new(dir).fallback(ServeFile::new(dir.join("index.html")));
        app = app.fallback_service(spa);
    }

    app.layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let rooms = state.rooms.clone();
    ws.on_upgrade(move |socket| dongne_gateway::handle_socket(socket, rooms))
}
