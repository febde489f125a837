use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use crate::backend::{AdminAck, BackendToggle};
use crate::state::AppState;
use crate::status;

/// Delay before re-polling health after a backend toggle.
pub const REFRESH_AFTER_TOGGLE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize)]
pub struct ActionReport {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<AdminAck>,
}

impl ActionReport {
    fn ok(message: impl Into<String>, ack: Option<AdminAck>) -> Self {
        Self {
            ok: true,
            message: message.into(),
            ack,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
            ack: None,
        }
    }
}

fn action_label(toggle: BackendToggle) -> &'static str {
    match toggle {
        BackendToggle::Health => "Toggle backend health",
        BackendToggle::Overload => "toggle backend overload",
        BackendToggle::Database => "Toggle database connection",
        BackendToggle::Model => "Toggle model server connection",
    }
}

fn schedule_refresh(state: &Arc<AppState>) {
    let state = state.clone();
    tokio::spawn(async move {
        tokio::time::sleep(REFRESH_AFTER_TOGGLE).await;
        status::poll(&state.backend, &state.status).await;
    });
}

/// Flip one of the backend's simulated faults.
pub async fn toggle_backend(state: &Arc<AppState>, toggle: BackendToggle) -> ActionReport {
    let label = action_label(toggle);

    // Health can be toggled back on while the backend looks dead.
    let always_attempt = matches!(toggle, BackendToggle::Health | BackendToggle::Overload);
    if !always_attempt && !state.status.current().backend {
        state.notifications.error("Backend service unavailable").await;
        return ActionReport::failed("Backend service unavailable");
    }

    match state.backend.toggle(toggle).await {
        Ok(ack) => {
            let message = match (toggle, ack.overloaded) {
                (BackendToggle::Overload, Some(true)) => {
                    state.notifications.warning("Backend overload started").await;
                    "Backend overload started".to_string()
                }
                (BackendToggle::Overload, _) => {
                    state.notifications.success("Backend overload stopped").await;
                    "Backend overload stopped".to_string()
                }
                _ => {
                    let message = format!("{} successful", label);
                    state.notifications.success(message.clone()).await;
                    message
                }
            };
            schedule_refresh(state);
            ActionReport::ok(message, Some(ack))
        }
        Err(e) if toggle == BackendToggle::Health && e.status() != Some(404) => {
            // The backend may have flipped its flag even though it answered badly.
            let message = format!(
                "{} - {}",
                label,
                e.backend_message()
                    .unwrap_or("Backend may be unhealthy but toggle attempted")
            );
            warn!("{}: {}", label, e);
            state.notifications.warning(message.clone()).await;
            schedule_refresh(state);
            ActionReport::failed(message)
        }
        Err(e) => {
            error!("Failed to {}: {}", label, e);
            let message = format!(
                "Failed to {} - {}",
                label,
                e.backend_message().unwrap_or("Backend unavailable")
            );
            state.notifications.error(message.clone()).await;
            ActionReport::failed(message)
        }
    }
}

pub async fn refresh_status(state: &AppState) -> status::ServiceStatus {
    let polled = status::poll(&state.backend, &state.status).await;
    state.notifications.info("Status refreshed").await;
    polled
}

#[derive(Debug, Clone, Serialize)]
pub struct FrontendAck {
    pub message: String,
    pub healthy: bool,
    pub overloaded: bool,
    pub crashing: bool,
}

async fn frontend_ack(state: &AppState, message: impl Into<String>) -> FrontendAck {
    FrontendAck {
        message: message.into(),
        healthy: state.simulation.is_healthy(),
        overloaded: state.simulation.is_overloaded().await,
        crashing: state.simulation.is_crashing(),
    }
}

pub async fn start_frontend_overload(state: &AppState) -> FrontendAck {
    if !state.simulation.start_overload().await {
        return frontend_ack(state, "Frontend overload already running").await;
    }
    state
        .notifications
        .warning("🔥 Frontend server overload started - Container CPU/Memory stress")
        .await;
    frontend_ack(state, "Frontend overload started").await
}

pub async fn stop_frontend_overload(state: &AppState) -> FrontendAck {
    if !state.simulation.stop_overload().await {
        return frontend_ack(state, "Frontend overload not running").await;
    }
    state
        .notifications
        .success("✅ Frontend server overload stopped - Performance restored")
        .await;
    frontend_ack(state, "Frontend overload stopped").await
}

pub async fn toggle_frontend_health(state: &AppState) -> FrontendAck {
    let healthy = state.simulation.toggle_health();
    let message = format!("Frontend health {}", if healthy { "enabled" } else { "disabled" });
    if healthy {
        state.notifications.success(message.clone()).await;
    } else {
        state.notifications.warning(message.clone()).await;
    }
    frontend_ack(state, message).await
}

/// Whole seconds announced in the countdown and the sleep between each.
fn countdown(delay: Duration) -> (u32, Duration) {
    let seconds = u32::try_from(delay.as_secs()).unwrap_or(u32::MAX).max(1);
    (seconds, delay / seconds)
}

/// Acknowledge, count down once a second, then exit the process.
pub async fn crash_frontend(state: &Arc<AppState>) -> FrontendAck {
    let delay = state.simulation.crash_delay();
    let (seconds, tick) = countdown(delay);

    if !state.simulation.begin_crash() {
        return frontend_ack(state, "Crash already scheduled").await;
    }

    state
        .notifications
        .error(format!("💥 CRITICAL: Frontend container will crash in {} seconds!", seconds))
        .await;
    error!("Frontend crash initiated, exiting in {:?}", delay);

    let task_state = state.clone();
    tokio::spawn(async move {
        for remaining in (1..seconds).rev() {
            tokio::time::sleep(tick).await;
            let plural = if remaining > 1 { "s" } else { "" };
            task_state
                .notifications
                .error(format!("💥 Container crashing in {} second{}...", remaining, plural))
                .await;
        }
        tokio::time::sleep(tick).await;
        task_state.notifications.error("💥 Container should crash now!").await;
        task_state.simulation.exit_now();
    });

    frontend_ack(state, format!("Crash scheduled in {} seconds", seconds)).await
}
