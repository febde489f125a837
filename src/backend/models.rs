use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    #[serde(other)]
    Unknown,
}

/// Backend ids are numeric; reviews that never reached the database get a
/// `temp-` string id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ReviewId {
    Remote(i64),
    Local(String),
}

impl ReviewId {
    pub const LOCAL_PREFIX: &'static str = "temp-";

    pub fn is_local(&self) -> bool {
        matches!(self, ReviewId::Local(id) if id.starts_with(Self::LOCAL_PREFIX))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Option<ReviewId>,
    pub movie_id: Option<String>,
    pub review_text: String,
    pub sentiment: Option<Sentiment>,
    pub rating: Option<f64>,
    pub sentiment_score: Option<f64>,
    pub created_at: Option<String>,
}

/// Body of every submit endpoint. Only the analysis matters here; messages
/// in error bodies are picked up by `error_message`.
#[derive(Debug, Clone, Default)]
pub struct SubmitResponse {
    pub review: Option<AnalyzedReview>,
}

impl SubmitResponse {
    /// A present `review` always counts, whatever shape its fields arrive in.
    pub fn from_body(body: &str) -> Self {
        let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let review = match value.get("review") {
            None | Some(Value::Null) => None,
            Some(review) => Some(AnalyzedReview::from_value(review)),
        };
        Self { review }
    }
}

/// The analysis part of a submit response's `review`. Everything else in it
/// is an echo of the request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalyzedReview {
    pub sentiment: Option<Sentiment>,
    pub rating: Option<f64>,
    pub sentiment_score: Option<f64>,
}

impl AnalyzedReview {
    /// Fields that are missing or of the wrong type read as absent.
    pub fn from_value(review: &Value) -> Self {
        Self {
            sentiment: review
                .get("sentiment")
                .filter(|s| s.is_string())
                .and_then(|s| Sentiment::deserialize(s).ok()),
            rating: review.get("rating").and_then(Value::as_f64),
            sentiment_score: review.get("sentimentScore").and_then(Value::as_f64),
        }
    }
}

/// Flags reported by `/api/admin/health`. Anything missing or not a boolean
/// reads as false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthReport {
    pub database: bool,
    pub model_server: bool,
    pub backend_overloaded: bool,
}

impl HealthReport {
    pub fn from_body(body: &str) -> Self {
        let value: Value = serde_json::from_str(body).unwrap_or(Value::Null);
        let flag = |key: &str| value.get(key).and_then(Value::as_bool).unwrap_or(false);

        Self {
            database: flag("database"),
            model_server: flag("modelServer"),
            backend_overloaded: flag("backendOverloaded"),
        }
    }
}

/// Acknowledgement returned by the backend fault-injection endpoints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminAck {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthy: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overloaded: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Pulls a human-readable message out of a backend error body.
pub fn error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .filter(|msg| !msg.trim().is_empty())
        .map(str::to_string)
}
