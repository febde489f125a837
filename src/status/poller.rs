use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum PollerError {
    #[error("health poller already running")]
    AlreadyRunning,
}

/// Fixed-period health polling tied to the session lifetime.
pub struct HealthPoller {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl HealthPoller {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// The first tick fires one `period` from now; the startup poll is done by
    /// the caller.
    pub fn start(&mut self, state: Arc<AppState>, period: Duration) -> Result<(), PollerError> {
        if self.is_running() {
            return Err(PollerError::AlreadyRunning);
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(poll_loop(state, period, cancel_token.clone()));

        info!("Health polling every {}s", period.as_secs_f32());
        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!("Health poller task failed to join: {}", e);
            }
        }
    }
}

impl Default for HealthPoller {
    fn default() -> Self {
        Self::new()
    }
}

async fn poll_loop(state: Arc<AppState>, period: Duration, cancel_token: CancellationToken) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                super::poll(&state.backend, &state.status).await;
            }
            _ = cancel_token.cancelled() => {
                info!("Health poller shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Timeouts};
    use crate::status::ServiceStatus;
    use crate::testing::FakeBackend;
    use axum::{routing::get, Json, Router};

    fn health_ok() -> Router {
        Router::new().route(
            "/api/admin/health",
            get(|| async { Json(serde_json::json!({"database": true, "modelServer": true})) }),
        )
    }

    fn state_for(url: &str) -> Arc<AppState> {
        let mut config = Config::for_backend(url);
        config.timeouts = Timeouts {
            health: Duration::from_millis(50),
            ..Timeouts::default()
        };
        Arc::new(AppState::new(config).unwrap())
    }

    #[tokio::test]
    async fn polls_on_a_fixed_period_until_stopped() {
        let backend = FakeBackend::spawn(health_ok()).await;
        let state = state_for(&backend.url);

        let mut poller = HealthPoller::new();
        poller.start(state.clone(), Duration::from_millis(40)).unwrap();
        assert!(matches!(
            poller.start(state.clone(), Duration::from_millis(40)),
            Err(PollerError::AlreadyRunning)
        ));

        tokio::time::sleep(Duration::from_millis(300)).await;
        poller.stop().await;
        assert!(!poller.is_running());

        let polled = backend.hits().await.len();
        assert!(polled >= 3, "expected several polls, saw {polled}");
        assert!(state.status.current().backend);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(backend.hits().await.len(), polled);
    }

    #[tokio::test]
    async fn restarts_after_stop() {
        let backend = FakeBackend::spawn(health_ok()).await;
        let state = state_for(&backend.url);

        let mut poller = HealthPoller::new();
        poller.start(state.clone(), Duration::from_millis(40)).unwrap();
        poller.stop().await;
        assert!(!poller.is_running());

        poller.start(state.clone(), Duration::from_millis(40)).unwrap();
        assert!(poller.is_running());
        poller.stop().await;
    }

    #[tokio::test]
    async fn keeps_polling_through_timeouts() {
        let backend = FakeBackend::spawn(Router::new().route(
            "/api/admin/health",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Json(serde_json::json!({"database": true}))
            }),
        ))
        .await;
        let state = state_for(&backend.url);
        state.status.publish(ServiceStatus {
            backend: true,
            database: true,
            model: true,
            backend_overloaded: false,
        });

        let mut poller = HealthPoller::new();
        poller.start(state.clone(), Duration::from_millis(60)).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(poller.is_running());
        assert!(backend.hits().await.len() >= 2);
        assert_eq!(state.status.current(), ServiceStatus::OFFLINE);

        poller.stop().await;
    }
}
