use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Redirect},
};
use serde::Serialize;
use std::sync::Arc;
use tera::Context;

use crate::backend::Review;
use crate::catalog::{self, MOVIES};
use crate::state::AppState;
use crate::status;

use super::api::status_view;

#[derive(Serialize)]
struct LatestEntry<'a> {
    title: &'a str,
    #[serde(flatten)]
    review: &'a Review,
}

#[derive(Serialize)]
struct ReviewEntry<'a> {
    #[serde(flatten)]
    review: &'a Review,
    unsaved: bool,
}

/// Values every page needs: status bar, admin panel, notifications.
async fn base_context(state: &AppState) -> Context {
    let view = status_view(state).await;

    let mut ctx = Context::new();
    ctx.insert("status", &view.status);
    ctx.insert("severity", view.severity);
    ctx.insert("health_message", view.message);
    ctx.insert("controls", &view.controls);
    ctx.insert("backend_url", &view.backend_url);
    ctx.insert("frontend_healthy", &view.frontend_healthy);
    ctx.insert("frontend_overloaded", &view.frontend_overloaded);
    ctx.insert("notifications", &state.notifications.active().await);
    ctx
}

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if state.session.selected().await.is_some() {
        state.session.back_to_catalog().await;
    }

    let latest = state.reviews.latest().await;
    let entries: Vec<LatestEntry> = latest
        .iter()
        .map(|review| LatestEntry {
            title: review.movie_id.as_deref().map_or("Unknown movie", catalog::title_for),
            review,
        })
        .collect();

    let mut ctx = base_context(&state).await;
    ctx.insert("movies", MOVIES);
    ctx.insert("latest", &entries);
    render_template("index.html", ctx)
}

pub async fn movie_page(
    State(state): State<Arc<AppState>>,
    Path(movie_id): Path<String>,
) -> impl IntoResponse {
    let Some(movie) = catalog::find(&movie_id) else {
        return Redirect::to("/").into_response();
    };

    // Reloading the page the user is already on keeps the latest analysis.
    if state.session.selected().await.map(|m| m.id) != Some(movie.id) {
        state.session.select_movie(movie.id).await;
        state.notifications.info(format!("Viewing {}", movie.title)).await;
    }

    let service_status = state.status.current();
    let submitting = state.session.submitting();
    let reviews = state.reviews.for_movie(movie.id).await;
    let entries: Vec<ReviewEntry> = reviews
        .iter()
        .map(|review| ReviewEntry {
            review,
            unsaved: review.id.as_ref().is_some_and(|id| id.is_local()),
        })
        .collect();
    let analysis = state.session.latest_analysis_for(movie.id).await;

    let mut ctx = base_context(&state).await;
    ctx.insert("movie", movie);
    ctx.insert("reviews", &entries);
    ctx.insert("analysis", &analysis.as_deref());
    ctx.insert("submission_notice", status::submission_notice(&service_status));
    ctx.insert("reviews_notice", &status::reviews_notice(&service_status));
    ctx.insert("submitting", &submitting);
    ctx.insert("submission_disabled", &(!service_status.backend || submitting));
    render_template("movie.html", ctx).into_response()
}

fn render_template(name: &str, ctx: Context) -> Html<String> {
    let tera = crate::templates::get_tera();
    let rendered = tera.render(name, &ctx).unwrap_or_else(|e| {
        tracing::error!("Template error in {}: {:?}", name, e);
        format!("Template error: {}", name)
    });
    Html(rendered)
}
