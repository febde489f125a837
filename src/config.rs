use std::time::Duration;

/// Longest crash countdown accepted from `CRASH_DELAY_SECS`.
pub const MAX_CRASH_DELAY_SECS: u64 = 3600;

#[derive(Clone, Debug)]
pub struct Config {
    pub backend_url: String,
    pub host: String,
    pub port: u16,
    pub health_poll_interval: Duration,
    pub overload_workers: usize,
    pub crash_delay: Duration,
    pub timeouts: Timeouts,
}

/// Request budgets for every call made to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    pub health: Duration,
    pub initial_reviews: Duration,
    pub latest_reviews: Duration,
    pub reload_reviews: Duration,
    pub submit_get: Duration,
    pub submit_post_query: Duration,
    pub submit_post_json: Duration,
    pub admin: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            health: Duration::from_secs(2),
            initial_reviews: Duration::from_secs(1),
            latest_reviews: Duration::from_secs(5),
            reload_reviews: Duration::from_secs(5),
            submit_get: Duration::from_secs(10),
            submit_post_query: Duration::from_secs(10),
            submit_post_json: Duration::from_secs(5),
            admin: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        dotenvy::dotenv().ok();

        let backend_url = std::env::var("BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        if !backend_url.starts_with("http://") && !backend_url.starts_with("https://") {
            return Err(format!("BACKEND_URL must be an http(s) URL, got {}", backend_url).into());
        }

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .unwrap_or(3000);

        let poll_secs: u64 = std::env::var("HEALTH_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(10);

        let overload_workers: usize = std::env::var("OVERLOAD_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        let crash_secs: u64 = std::env::var("CRASH_DELAY_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3)
            .min(MAX_CRASH_DELAY_SECS);

        Ok(Self {
            backend_url,
            host,
            port,
            health_poll_interval: Duration::from_secs(poll_secs),
            overload_workers,
            crash_delay: Duration::from_secs(crash_secs),
            timeouts: Timeouts::default(),
        })
    }

    #[cfg(test)]
    pub fn for_backend(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            health_poll_interval: Duration::from_secs(10),
            overload_workers: 0,
            crash_delay: Duration::from_secs(3),
            timeouts: Timeouts::default(),
        }
    }
}
