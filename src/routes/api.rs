use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::admin;
use crate::backend::BackendToggle;
use crate::catalog::{self, MOVIES};
use crate::reviews::{self, SubmissionOutcome, SubmitError};
use crate::state::AppState;
use crate::status::{self, AdminControls, ServiceStatus, SystemHealth};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub status: ServiceStatus,
    pub health: SystemHealth,
    pub message: &'static str,
    pub severity: &'static str,
    pub frontend_healthy: bool,
    pub frontend_overloaded: bool,
    pub controls: AdminControls,
    pub backend_url: String,
}

pub async fn status_view(state: &AppState) -> StatusView {
    let status = state.status.current();
    let frontend_overloaded = state.simulation.is_overloaded().await;
    let health = status::classify(&status, frontend_overloaded);

    StatusView {
        status,
        health,
        message: health.message(),
        severity: health.severity(),
        frontend_healthy: state.simulation.is_healthy(),
        frontend_overloaded,
        controls: AdminControls::for_status(&status),
        backend_url: state.config.backend_url.clone(),
    }
}

fn not_found(what: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": format!("{} not found", what) })),
    )
        .into_response()
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(status_view(&state).await)
}

pub async fn list_movies() -> impl IntoResponse {
    Json(MOVIES)
}

pub async fn movie_detail(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> impl IntoResponse {
    let Some(movie) = catalog::find(&movie_id) else {
        return not_found("Movie");
    };
    let status = state.status.current();

    Json(serde_json::json!({
        "movie": movie,
        "reviews": state.reviews.for_movie(movie.id).await.to_vec(),
        "latestAnalysis": state.session.latest_analysis_for(movie.id).await.as_deref(),
        "submissionNotice": status::submission_notice(&status),
        "reviewsNotice": status::reviews_notice(&status),
        "submitting": state.session.submitting(),
    }))
    .into_response()
}

pub async fn select_movie(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> impl IntoResponse {
    match state.session.select_movie(&movie_id).await {
        Some(movie) => {
            state.notifications.info(format!("Viewing {}", movie.title)).await;
            Json(movie).into_response()
        }
        None => not_found("Movie"),
    }
}

pub async fn back_to_catalog(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.session.back_to_catalog().await;
    StatusCode::NO_CONTENT
}

pub async fn latest_reviews(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.reviews.latest().await.to_vec())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewForm {
    #[serde(default)]
    review_text: String,
}

pub async fn submit_review(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
    Json(form): Json<ReviewForm>,
) -> impl IntoResponse {
    match reviews::submit_review(&state, &movie_id, &form.review_text).await {
        Ok(result) => {
            let code = match result.outcome {
                SubmissionOutcome::Failure => StatusCode::BAD_GATEWAY,
                SubmissionOutcome::Success | SubmissionOutcome::PartialSuccess => StatusCode::OK,
            };
            (code, Json(serde_json::json!(result))).into_response()
        }
        Err(e @ SubmitError::EmptyReview) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

pub async fn notifications(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.notifications.active().await)
}

pub async fn toggle_backend(
    State(state): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> impl IntoResponse {
    let Some(toggle) = BackendToggle::from_endpoint(&action) else {
        return not_found("Admin action");
    };
    Json(admin::toggle_backend(&state, toggle).await).into_response()
}

pub async fn refresh_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    admin::refresh_status(&state).await;
    Json(status_view(&state).await)
}

pub async fn frontend_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.simulation.is_healthy() {
        (StatusCode::OK, Json(serde_json::json!({ "status": "healthy" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "unhealthy" })),
        )
    }
}

pub async fn start_overload(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(admin::start_frontend_overload(&state).await)
}

pub async fn stop_overload(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(admin::stop_frontend_overload(&state).await)
}

pub async fn toggle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(admin::toggle_frontend_health(&state).await)
}

pub async fn crash(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(admin::crash_frontend(&state).await)
}
