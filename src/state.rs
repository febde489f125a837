use std::sync::Arc;
use tracing::info;

use crate::backend::{BackendClient, BackendError};
use crate::config::Config;
use crate::notify::Notifications;
use crate::reviews::{self, ReviewStore, Session};
use crate::simulation::FrontendSimulation;
use crate::status::{self, StatusBoard};

pub struct AppState {
    pub config: Arc<Config>,
    pub backend: BackendClient,
    pub status: StatusBoard,
    pub reviews: ReviewStore,
    pub session: Session,
    pub notifications: Notifications,
    pub simulation: FrontendSimulation,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, BackendError> {
        let backend = BackendClient::new(&config.backend_url, config.timeouts)?;
        let simulation = FrontendSimulation::new(config.overload_workers, config.crash_delay);

        Ok(Self {
            config: Arc::new(config),
            backend,
            status: StatusBoard::new(),
            reviews: ReviewStore::new(),
            session: Session::new(),
            notifications: Notifications::new(),
            simulation,
        })
    }

    /// Startup poll, then review loading in the background so a slow or
    /// broken backend never holds up the first page.
    pub async fn bootstrap(self: &Arc<Self>) {
        let initial = status::poll(&self.backend, &self.status).await;
        info!("Initial service status: {:?}", initial);

        let state = self.clone();
        tokio::spawn(async move {
            reviews::load_all(&state).await;
        });

        let state = self.clone();
        tokio::spawn(async move {
            reviews::load_latest(&state).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeBackend;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::time::Duration;

    #[tokio::test]
    async fn bootstrap_loads_reviews_and_tolerates_failures() {
        let backend = FakeBackend::spawn(
            Router::new()
                .route(
                    "/api/admin/health",
                    get(|| async { Json(json!({"database": true, "modelServer": true})) }),
                )
                .route(
                    "/api/reviews/latest",
                    get(|| async {
                        let reviews: Vec<_> = (0..8)
                            .map(|i| json!({"id": i, "movieId": "inception", "reviewText": format!("r{i}")}))
                            .collect();
                        Json(json!(reviews))
                    }),
                )
                .route(
                    "/api/reviews/inception",
                    get(|| async { Json(json!([{"id": 1, "movieId": "inception", "reviewText": "Dreamy"}])) }),
                )
                .route(
                    "/api/reviews/gladiator",
                    get(|| async { (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "db down"}))) }),
                ),
        )
        .await;

        let state = Arc::new(AppState::new(crate::config::Config::for_backend(&backend.url)).unwrap());
        state.bootstrap().await;
        assert!(state.status.current().database);

        for _ in 0..50 {
            if backend.hits().await.len() >= 8 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(state.reviews.for_movie("inception").await.len(), 1);
        assert!(state.reviews.for_movie("gladiator").await.is_empty());
        assert_eq!(state.reviews.latest().await.len(), reviews::LATEST_FEED_LEN);
    }
}
