mod models;

pub use models::*;

use reqwest::{Client, RequestBuilder, StatusCode, Url};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::Timeouts;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("invalid backend URL {url}")]
    InvalidUrl { url: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{endpoint} unreachable: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Server {
        endpoint: String,
        status: u16,
        message: Option<String>,
    },

    #[error("unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Message supplied by the backend in an error body, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            BackendError::Server { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BackendError::Transport { source, .. } if source.is_timeout())
    }
}

/// A completed 2xx exchange.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

impl BackendResponse {
    pub fn is_partial_content(&self) -> bool {
        self.status == StatusCode::PARTIAL_CONTENT.as_u16()
    }
}

/// Transport strategies for review submission, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStrategy {
    GetQuery,
    PostQuery,
    PostJson,
}

impl SubmitStrategy {
    pub fn timeout(&self, timeouts: &Timeouts) -> Duration {
        match self {
            SubmitStrategy::GetQuery => timeouts.submit_get,
            SubmitStrategy::PostQuery => timeouts.submit_post_query,
            SubmitStrategy::PostJson => timeouts.submit_post_json,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SubmitStrategy::GetQuery => "GET submit-get",
            SubmitStrategy::PostQuery => "POST submit (query)",
            SubmitStrategy::PostJson => "POST submit (json)",
        }
    }
}

/// Fault-injection switches exposed by the backend under `/api/admin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendToggle {
    Health,
    Overload,
    Database,
    Model,
}

impl BackendToggle {
    pub fn endpoint(&self) -> &'static str {
        match self {
            BackendToggle::Health => "toggle-health",
            BackendToggle::Overload => "toggle-overload",
            BackendToggle::Database => "toggle-database",
            BackendToggle::Model => "toggle-model",
        }
    }

    pub fn from_endpoint(name: &str) -> Option<Self> {
        [
            BackendToggle::Health,
            BackendToggle::Overload,
            BackendToggle::Database,
            BackendToggle::Model,
        ]
        .into_iter()
        .find(|toggle| toggle.endpoint() == name)
    }
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base: Url,
    timeouts: Timeouts,
}

impl BackendClient {
    pub fn new(base_url: &str, timeouts: Timeouts) -> Result<Self, BackendError> {
        let base = Url::parse(base_url).map_err(|_| BackendError::InvalidUrl {
            url: base_url.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(BackendError::InvalidUrl {
                url: base_url.to_string(),
            });
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(2))
            .build()
            .map_err(BackendError::Client)?;

        Ok(Self {
            client,
            base,
            timeouts,
        })
    }

    pub fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(&self, endpoint: &str, request: RequestBuilder) -> Result<BackendResponse, BackendError> {
        let response = request.send().await.map_err(|source| BackendError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| BackendError::Transport {
            endpoint: endpoint.to_string(),
            source,
        })?;

        if !status.is_success() {
            debug!("{} answered {}: {}", endpoint, status, body);
            return Err(BackendError::Server {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        Ok(BackendResponse {
            status: status.as_u16(),
            body,
        })
    }

    fn decode<T: serde::de::DeserializeOwned>(endpoint: &str, body: &str) -> Result<T, BackendError> {
        serde_json::from_str(body).map_err(|e| BackendError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn health(&self) -> Result<BackendResponse, BackendError> {
        let request = self
            .client
            .get(self.url(&["api", "admin", "health"]))
            .timeout(self.timeouts.health);
        self.send("/api/admin/health", request).await
    }

    pub async fn movie_reviews(&self, movie_id: &str, timeout: Duration) -> Result<Vec<Review>, BackendError> {
        let endpoint = format!("/api/reviews/{}", movie_id);
        let request = self
            .client
            .get(self.url(&["api", "reviews", movie_id]))
            .timeout(timeout);
        let response = self.send(&endpoint, request).await?;
        Self::decode(&endpoint, &response.body)
    }

    pub async fn latest_reviews(&self) -> Result<Vec<Review>, BackendError> {
        let endpoint = "/api/reviews/latest";
        let request = self
            .client
            .get(self.url(&["api", "reviews", "latest"]))
            .timeout(self.timeouts.latest_reviews);
        let response = self.send(endpoint, request).await?;
        Self::decode(endpoint, &response.body)
    }

    pub async fn submit_review(
        &self,
        strategy: SubmitStrategy,
        movie_id: &str,
        review_text: &str,
    ) -> Result<BackendResponse, BackendError> {
        let params = [("movieId", movie_id), ("reviewText", review_text)];
        let timeout = strategy.timeout(&self.timeouts);

        let (endpoint, request) = match strategy {
            SubmitStrategy::GetQuery => (
                "/api/reviews/submit-get",
                self.client
                    .get(self.url(&["api", "reviews", "submit-get"]))
                    .query(&params),
            ),
            SubmitStrategy::PostQuery => (
                "/api/reviews/submit",
                self.client
                    .post(self.url(&["api", "reviews", "submit"]))
                    .query(&params),
            ),
            SubmitStrategy::PostJson => (
                "/api/reviews/submit",
                self.client
                    .post(self.url(&["api", "reviews", "submit"]))
                    .json(&serde_json::json!({
                        "movieId": movie_id,
                        "reviewText": review_text,
                    })),
            ),
        };

        debug!("Submitting review for {} via {}", movie_id, strategy.label());
        self.send(endpoint, request.timeout(timeout)).await
    }

    pub async fn toggle(&self, toggle: BackendToggle) -> Result<AdminAck, BackendError> {
        let endpoint = format!("/api/admin/{}", toggle.endpoint());
        let request = self
            .client
            .post(self.url(&["api", "admin", toggle.endpoint()]))
            .timeout(self.timeouts.admin);
        let response = self.send(&endpoint, request).await?;

        // Some toggles answer with an empty body; treat that as a bare ack.
        if response.body.trim().is_empty() {
            return Ok(AdminAck::default());
        }
        Self::decode(&endpoint, &response.body).or_else(|e| {
            warn!("{}", e);
            Ok(AdminAck::default())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_keep_base_path_and_escape_segments() {
        let client = BackendClient::new("http://backend:8080/svc/", Timeouts::default()).unwrap();
        assert_eq!(
            client.url(&["api", "reviews", "fight club"]).as_str(),
            "http://backend:8080/svc/api/reviews/fight%20club"
        );

        let client = BackendClient::new("http://backend:8080", Timeouts::default()).unwrap();
        assert_eq!(
            client.url(&["api", "admin", "health"]).as_str(),
            "http://backend:8080/api/admin/health"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        assert!(matches!(
            BackendClient::new("mailto:ops@example.com", Timeouts::default()),
            Err(BackendError::InvalidUrl { .. })
        ));
        assert!(BackendClient::new("not a url", Timeouts::default()).is_err());
    }

    #[test]
    fn strategy_budgets() {
        let t = Timeouts::default();
        assert_eq!(SubmitStrategy::GetQuery.timeout(&t), Duration::from_secs(10));
        assert_eq!(SubmitStrategy::PostQuery.timeout(&t), Duration::from_secs(10));
        assert_eq!(SubmitStrategy::PostJson.timeout(&t), Duration::from_secs(5));
    }

    #[test]
    fn toggles_round_trip_through_endpoint_names() {
        for name in ["toggle-health", "toggle-overload", "toggle-database", "toggle-model"] {
            let toggle = BackendToggle::from_endpoint(name).unwrap();
            assert_eq!(toggle.endpoint(), name);
        }
        assert_eq!(BackendToggle::from_endpoint("toggle-frontend"), None);
    }
}
