use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::{
    AnalyzedReview, BackendClient, BackendError, BackendResponse, Sentiment, SubmitResponse, SubmitStrategy,
};
use crate::state::AppState;

use super::local_review;

/// Strategies in the order they are tried. Only a failure moves on to the
/// next one; the last one's result is final.
pub const SUBMIT_CHAIN: [SubmitStrategy; 3] = [
    SubmitStrategy::GetQuery,
    SubmitStrategy::PostQuery,
    SubmitStrategy::PostJson,
];

const ANALYZED_MESSAGE: &str = "🎯 Review analyzed successfully! Check your results below.";
const NOT_SAVED_MESSAGE: &str = "🎯 Review analyzed successfully! (Database unavailable - not saved)";
const ACKNOWLEDGED_MESSAGE: &str = "Review submitted successfully!";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("Please enter a review")]
    EmptyReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionOutcome {
    Success,
    PartialSuccess,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    Transport,
    ServerRejected,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmissionResult {
    pub outcome: SubmissionOutcome,
    pub sentiment: Option<Sentiment>,
    pub rating: Option<f64>,
    pub sentiment_score: Option<f64>,
    pub review_text: String,
    pub movie_id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip)]
    pub attempts: Vec<SubmitStrategy>,
}

impl ReviewSubmissionResult {
    fn analyzed(
        outcome: SubmissionOutcome,
        movie_id: &str,
        review_text: &str,
        review: &AnalyzedReview,
        message: &str,
    ) -> Self {
        Self {
            outcome,
            sentiment: Some(review.sentiment.unwrap_or(Sentiment::Unknown)),
            rating: Some(review.rating.unwrap_or(0.0).clamp(0.0, 5.0)),
            sentiment_score: Some(review.sentiment_score.unwrap_or(0.0).clamp(0.0, 1.0)),
            review_text: review_text.to_string(),
            movie_id: movie_id.to_string(),
            timestamp: Utc::now(),
            message: message.to_string(),
            failure: None,
            attempts: Vec::new(),
        }
    }

    pub(crate) fn acknowledged(movie_id: &str, review_text: &str, message: String) -> Self {
        Self {
            outcome: SubmissionOutcome::Success,
            sentiment: None,
            rating: None,
            sentiment_score: None,
            review_text: review_text.to_string(),
            movie_id: movie_id.to_string(),
            timestamp: Utc::now(),
            message,
            failure: None,
            attempts: Vec::new(),
        }
    }

    fn failed(movie_id: &str, review_text: &str, kind: FailureKind, message: String) -> Self {
        Self {
            outcome: SubmissionOutcome::Failure,
            failure: Some(kind),
            ..Self::acknowledged(movie_id, review_text, message)
        }
    }
}

/// Result of walking the strategy chain.
#[derive(Debug)]
pub struct Delivery {
    pub result: Result<BackendResponse, BackendError>,
    pub attempts: Vec<SubmitStrategy>,
}

pub async fn deliver(backend: &BackendClient, movie_id: &str, review_text: &str) -> Delivery {
    let [first, fallbacks @ ..] = SUBMIT_CHAIN;
    let mut attempts = vec![first];
    let mut result = backend.submit_review(first, movie_id, review_text).await;

    for strategy in fallbacks {
        let Err(e) = &result else { break };
        let previous = attempts.last().copied().unwrap_or(first);
        warn!("{} failed, trying {}: {}", previous.label(), strategy.label(), e);

        attempts.push(strategy);
        result = backend.submit_review(strategy, movie_id, review_text).await;
    }

    Delivery { result, attempts }
}

#[derive(Debug)]
enum Resolution {
    Analyzed { persisted: bool, review: AnalyzedReview },
    Acknowledged,
    Failed { kind: FailureKind, message: String },
}

fn resolve(result: &Result<BackendResponse, BackendError>) -> Resolution {
    match result {
        Ok(response) => {
            match SubmitResponse::from_body(&response.body).review {
                Some(review) => Resolution::Analyzed {
                    persisted: !response.is_partial_content(),
                    review,
                },
                None => Resolution::Acknowledged,
            }
        }
        Err(e) => {
            let kind = if e.status().is_some() {
                FailureKind::ServerRejected
            } else {
                FailureKind::Transport
            };
            let message = e
                .backend_message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("Failed to submit review - {}", e));
            Resolution::Failed { kind, message }
        }
    }
}

/// Submit a review and apply the outcome to the session, the review lists
/// and the notification feed.
pub async fn submit_review(
    state: &AppState,
    movie_id: &str,
    review_text: &str,
) -> Result<ReviewSubmissionResult, SubmitError> {
    let review_text = review_text.trim();
    if review_text.is_empty() {
        return Err(SubmitError::EmptyReview);
    }

    let _guard = state.session.begin_submission();
    let delivery = deliver(&state.backend, movie_id, review_text).await;

    let mut result = match resolve(&delivery.result) {
        Resolution::Analyzed {
            persisted: true,
            review,
        } => {
            let result = ReviewSubmissionResult::analyzed(
                SubmissionOutcome::Success,
                movie_id,
                review_text,
                &review,
                ANALYZED_MESSAGE,
            );
            info!(
                "Review for {} analyzed as {:?} ({} stars)",
                movie_id, result.sentiment, result.rating.unwrap_or_default()
            );
            state.session.record_analysis(result.clone()).await;
            state.notifications.success(ANALYZED_MESSAGE).await;

            let reload = state.backend.timeouts().reload_reviews;
            match state.backend.movie_reviews(movie_id, reload).await {
                Ok(reviews) => state.reviews.replace(movie_id, reviews).await,
                Err(e) => {
                    warn!(
                        "Failed to reload reviews for {} after analysis, keeping a local copy: {}",
                        movie_id, e
                    );
                    state.reviews.append(movie_id, local_review(&result)).await;
                }
            }
            result
        }
        Resolution::Analyzed {
            persisted: false,
            review,
        } => {
            let result = ReviewSubmissionResult::analyzed(
                SubmissionOutcome::PartialSuccess,
                movie_id,
                review_text,
                &review,
                NOT_SAVED_MESSAGE,
            );
            info!("Review for {} analyzed but not stored", movie_id);
            state.session.record_analysis(result.clone()).await;
            state.notifications.warning(NOT_SAVED_MESSAGE).await;
            state.reviews.append(movie_id, local_review(&result)).await;
            result
        }
        Resolution::Acknowledged => {
            state.notifications.success(ACKNOWLEDGED_MESSAGE).await;
            ReviewSubmissionResult::acknowledged(movie_id, review_text, ACKNOWLEDGED_MESSAGE.to_string())
        }
        Resolution::Failed { kind, message } => {
            warn!("Review submission for {} failed: {}", movie_id, message);
            state.notifications.error(message.clone()).await;
            ReviewSubmissionResult::failed(movie_id, review_text, kind, message)
        }
    };

    result.attempts = delivery.attempts;
    Ok(result)
}
