mod poller;

pub use poller::HealthPoller;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{BackendClient, HealthReport};

/// Last known reachability of the backend and its dependencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceStatus {
    pub backend: bool,
    pub database: bool,
    pub model: bool,
    pub backend_overloaded: bool,
}

impl ServiceStatus {
    pub const OFFLINE: ServiceStatus = ServiceStatus {
        backend: false,
        database: false,
        model: false,
        backend_overloaded: false,
    };

    /// A reachable backend vouching for its dependencies.
    pub fn reachable(report: HealthReport) -> Self {
        Self {
            backend: true,
            database: report.database,
            model: report.model_server,
            backend_overloaded: report.backend_overloaded,
        }
    }

    pub fn online_count(&self) -> u8 {
        [self.backend, self.database, self.model]
            .iter()
            .filter(|up| **up)
            .count() as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemHealth {
    AllGood,
    DegradedPerformance,
    PartialOutage,
    MajorOutage,
    CriticalFailure,
}

impl SystemHealth {
    pub fn message(&self) -> &'static str {
        match self {
            SystemHealth::AllGood => "✅ All Systems Operational",
            SystemHealth::DegradedPerformance => "⚡ Systems Online but Overloaded",
            SystemHealth::PartialOutage => "⚠️ Partial Service Degradation",
            SystemHealth::MajorOutage => "🔴 Major Service Outage",
            SystemHealth::CriticalFailure => "💥 Critical System Failure",
        }
    }

    /// CSS severity bucket for the status bar.
    pub fn severity(&self) -> &'static str {
        match self {
            SystemHealth::AllGood => "all-good",
            SystemHealth::DegradedPerformance | SystemHealth::PartialOutage => "partial",
            SystemHealth::MajorOutage | SystemHealth::CriticalFailure => "critical",
        }
    }
}

pub fn classify(status: &ServiceStatus, frontend_overloaded: bool) -> SystemHealth {
    let has_overload = frontend_overloaded || status.backend_overloaded;

    match (status.online_count(), has_overload) {
        (3, false) => SystemHealth::AllGood,
        (3, true) => SystemHealth::DegradedPerformance,
        (2, _) => SystemHealth::PartialOutage,
        (1, _) => SystemHealth::MajorOutage,
        _ => SystemHealth::CriticalFailure,
    }
}

/// Banner shown above the review form.
pub fn submission_notice(status: &ServiceStatus) -> &'static str {
    match (status.backend, status.database, status.model) {
        (false, _, _) => "❌ Backend service unavailable - cannot submit reviews",
        (true, false, false) => "⚠️ Both database and model server unavailable",
        (true, false, true) => "⚠️ Database unavailable - reviews will be analyzed but not saved",
        (true, true, false) => "⚠️ Model server unavailable - cannot analyze sentiment",
        (true, true, true) => "✅ All services available",
    }
}

/// Why the review list may be empty, if the status explains it.
pub fn reviews_notice(status: &ServiceStatus) -> Option<&'static str> {
    if !status.backend {
        Some("Cannot load reviews - backend service unavailable")
    } else if !status.database {
        Some("Database connection failed - cannot load reviews")
    } else {
        None
    }
}

/// Which backend admin controls can be used right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminControls {
    pub toggle_health: bool,
    pub toggle_overload: bool,
    pub toggle_database: bool,
    pub toggle_model: bool,
}

impl AdminControls {
    pub fn for_status(status: &ServiceStatus) -> Self {
        Self {
            toggle_health: true,
            toggle_overload: status.backend,
            toggle_database: status.backend,
            toggle_model: status.backend,
        }
    }
}

/// Process-wide holder of the latest `ServiceStatus`. Each poll publishes a
/// whole new value; readers only ever see complete snapshots.
pub struct StatusBoard {
    tx: watch::Sender<ServiceStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ServiceStatus::OFFLINE);
        Self { tx }
    }

    pub fn current(&self) -> ServiceStatus {
        *self.tx.borrow()
    }

    pub fn publish(&self, status: ServiceStatus) {
        let previous = self.tx.send_replace(status);
        if previous != status {
            info!(
                "Service status changed: backend={} database={} model={} overloaded={}",
                status.backend, status.database, status.model, status.backend_overloaded
            );
        }
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// One health check. Never fails: anything short of a 200 with a body is
/// reported as everything offline.
pub async fn poll(backend: &BackendClient, board: &StatusBoard) -> ServiceStatus {
    let status = match backend.health().await {
        Ok(response) if response.status == 200 && !response.body.trim().is_empty() => {
            ServiceStatus::reachable(HealthReport::from_body(&response.body))
        }
        Ok(response) => {
            debug!("Health endpoint answered {} with an empty body", response.status);
            ServiceStatus::OFFLINE
        }
        Err(e) if e.is_timeout() => {
            warn!("Health check timed out after {:?}", backend.timeouts().health);
            ServiceStatus::OFFLINE
        }
        Err(e) => {
            warn!("Health check failed: {}", e);
            ServiceStatus::OFFLINE
        }
    };

    board.publish(status);
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timeouts;
    use crate::testing::FakeBackend;
    use axum::{http::StatusCode, routing::get, Json, Router};
    use std::time::Duration;

    fn status(backend: bool, database: bool, model: bool, backend_overloaded: bool) -> ServiceStatus {
        ServiceStatus {
            backend,
            database,
            model,
            backend_overloaded,
        }
    }

    #[test]
    fn classify_covers_every_combination() {
        let expected = [
            (3, false, SystemHealth::AllGood),
            (3, true, SystemHealth::DegradedPerformance),
            (2, false, SystemHealth::PartialOutage),
            (2, true, SystemHealth::PartialOutage),
            (1, false, SystemHealth::MajorOutage),
            (1, true, SystemHealth::MajorOutage),
            (0, false, SystemHealth::CriticalFailure),
            (0, true, SystemHealth::CriticalFailure),
        ];

        for (online, overload, health) in expected {
            let s = status(online >= 1, online >= 2, online >= 3, false);
            assert_eq!(s.online_count(), online);
            assert_eq!(classify(&s, overload), health, "online={online} overload={overload}");
        }
    }

    #[test]
    fn backend_overload_counts_as_overload() {
        assert_eq!(
            classify(&status(true, true, true, true), false),
            SystemHealth::DegradedPerformance
        );
        // Which services are up does not matter, only how many.
        assert_eq!(
            classify(&status(false, true, true, false), false),
            SystemHealth::PartialOutage
        );
    }

    #[test]
    fn notices_follow_status() {
        assert_eq!(
            submission_notice(&ServiceStatus::OFFLINE),
            "❌ Backend service unavailable - cannot submit reviews"
        );
        assert_eq!(
            submission_notice(&status(true, false, true, false)),
            "⚠️ Database unavailable - reviews will be analyzed but not saved"
        );
        assert_eq!(reviews_notice(&status(true, true, false, false)), None);
        assert!(reviews_notice(&status(true, false, true, false)).is_some());

        let controls = AdminControls::for_status(&ServiceStatus::OFFLINE);
        assert!(controls.toggle_health);
        assert!(!controls.toggle_database);
    }

    fn client(url: &str) -> BackendClient {
        let timeouts = Timeouts {
            health: Duration::from_millis(200),
            ..Timeouts::default()
        };
        BackendClient::new(url, timeouts).unwrap()
    }

    #[tokio::test]
    async fn poll_copies_flags_from_healthy_backend() {
        let backend = FakeBackend::spawn(Router::new().route(
            "/api/admin/health",
            get(|| async {
                Json(serde_json::json!({
                    "status": "degraded",
                    "database": false,
                    "modelServer": true,
                    "backendOverloaded": true
                }))
            }),
        ))
        .await;

        let board = StatusBoard::new();
        let polled = poll(&client(&backend.url), &board).await;

        assert_eq!(polled, status(true, false, true, true));
        assert_eq!(board.current(), polled);
    }

    #[tokio::test]
    async fn unhealthy_backend_forces_everything_offline() {
        // 503 bodies still carry flags; they must not leak into the status.
        let backend = FakeBackend::spawn(Router::new().route(
            "/api/admin/health",
            get(|| async {
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(serde_json::json!({"database": true, "modelServer": true})),
                )
            }),
        ))
        .await;

        let board = StatusBoard::new();
        board.publish(status(true, true, true, false));

        assert_eq!(poll(&client(&backend.url), &board).await, ServiceStatus::OFFLINE);
        assert_eq!(board.current(), ServiceStatus::OFFLINE);
    }

    #[tokio::test]
    async fn empty_body_counts_as_unreachable() {
        let backend = FakeBackend::spawn(Router::new().route("/api/admin/health", get(|| async { "" }))).await;

        let board = StatusBoard::new();
        assert_eq!(poll(&client(&backend.url), &board).await, ServiceStatus::OFFLINE);
    }

    #[tokio::test]
    async fn slow_health_endpoint_times_out_to_offline() {
        let backend = FakeBackend::spawn(Router::new().route(
            "/api/admin/health",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(serde_json::json!({"database": true, "modelServer": true}))
            }),
        ))
        .await;

        let board = StatusBoard::new();
        board.publish(status(true, true, true, false));

        assert_eq!(poll(&client(&backend.url), &board).await, ServiceStatus::OFFLINE);
    }

    #[tokio::test]
    async fn unreachable_backend_is_offline() {
        let board = StatusBoard::new();
        let polled = poll(&client(&FakeBackend::closed_url().await), &board).await;
        assert_eq!(polled, ServiceStatus::OFFLINE);
    }
}
