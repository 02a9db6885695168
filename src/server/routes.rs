use std::path::Path;

use axum::http::HeaderValue;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::server::api;
use crate::server::AppState;

pub fn router(state: AppState, server: &ServerConfig) -> Router {
    let api_routes = Router::new()
        .route("/health", get(api::health))
        .route("/calcio/init", post(api::init_team))
        .route("/calcio/rosa/:email", get(api::roster))
        .route("/calcio/rosa/:email/ingaggi", post(api::sign_player))
        .route("/calcio/rosa/:email/ingaggi/:player_id", delete(api::release_player))
        .route("/calcio/query/check", post(api::check_query))
        .route("/calcio/partite", post(api::schedule_match))
        .route("/calcio/partite/:email", get(api::matches))
        .route("/calcio/partita/start", post(api::start_match))
        .route("/calcio/partita/:id", get(api::match_details))
        .route("/calcio/partita/:id/timeline", get(api::timeline))
        .route("/calcio/partita/:id/pronta", post(api::set_ready))
        .fallback(api::not_found);

    let frontend_dir = Path::new(&server.frontend_dir);
    let frontend = ServeDir::new(frontend_dir)
        .fallback(ServeFile::new(frontend_dir.join("index.html")));

    Router::new()
        .route("/health", get(api::health))
        .nest("/api", api_routes)
        .fallback_service(frontend)
        .layer(cors_layer(server.frontend_url.as_deref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    match origin.and_then(|origin| HeaderValue::from_str(origin).ok()) {
        Some(origin) => layer.allow_origin(origin),
        None => layer.allow_origin(Any),
    }
}
