use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    #[serde(rename = "type")]
    pub level: Level,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    expires_at: Instant,
}

/// Short-lived toasts shown to the user.
pub struct Notifications {
    next_id: AtomicU64,
    ttl: Duration,
    items: RwLock<Vec<Notification>>,
}

impl Notifications {
    pub fn new() -> Self {
        Self::with_ttl(NOTIFICATION_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ttl,
            items: RwLock::new(Vec::new()),
        }
    }

    pub async fn push(&self, message: impl Into<String>, level: Level) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let notification = Notification {
            id,
            message: message.into(),
            level,
            created_at: Utc::now(),
            expires_at: now + self.ttl,
        };

        let mut items = self.items.write().await;
        items.retain(|n| n.expires_at > now);
        items.push(notification);
        id
    }

    pub async fn info(&self, message: impl Into<String>) -> u64 {
        self.push(message, Level::Info).await
    }

    pub async fn success(&self, message: impl Into<String>) -> u64 {
        self.push(message, Level::Success).await
    }

    pub async fn warning(&self, message: impl Into<String>) -> u64 {
        self.push(message, Level::Warning).await
    }

    pub async fn error(&self, message: impl Into<String>) -> u64 {
        self.push(message, Level::Error).await
    }

    /// Unexpired notifications, oldest first.
    pub async fn active(&self) -> Vec<Notification> {
        let now = Instant::now();
        self.items
            .read()
            .await
            .iter()
            .filter(|n| n.expires_at > now)
            .cloned()
            .collect()
    }
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}
