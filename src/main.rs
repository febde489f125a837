mod admin;
mod backend;
mod catalog;
mod config;
mod notify;
mod reviews;
mod routes;
mod simulation;
mod state;
mod status;
mod templates;
#[cfg(test)]
mod testing;

use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marquee=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let addr = format!("{}:{}", config.host, config.port);
    let poll_interval = config.health_poll_interval;
    tracing::info!("Using review backend at {}", config.backend_url);

    let state = Arc::new(state::AppState::new(config)?);
    state.bootstrap().await;

    let mut poller = status::HealthPoller::new();
    poller.start(state.clone(), poll_interval)?;

    let app = routes::router(state.clone());

    tracing::info!("Marquee listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    poller.stop().await;
    state.simulation.stop_overload().await;
    tracing::info!("Marquee stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
