mod api;
mod pages;

pub use api::*;
pub use pages::*;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/movies/:movie_id", get(movie_page))
        .route("/health", get(frontend_health))
        .route("/api/status", get(get_status))
        .route("/api/movies", get(list_movies))
        .route("/api/movies/:movie_id", get(movie_detail))
        .route("/api/movies/:movie_id/select", post(select_movie))
        .route("/api/movies/:movie_id/reviews", post(submit_review))
        .route("/api/session/back", post(back_to_catalog))
        .route("/api/reviews/latest", get(latest_reviews))
        .route("/api/notifications", get(notifications))
        .route("/api/admin/backend/:action", post(toggle_backend))
        .route("/api/admin/refresh", post(refresh_status))
        .route("/admin/start-overload", post(start_overload))
        .route("/admin/stop-overload", post(stop_overload))
        .route("/admin/toggle-health", post(toggle_health))
        .route("/admin/crash", post(crash))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
