mod submit;

pub use submit::*;

use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backend::{Review, ReviewId};
use crate::catalog::{self, Movie, MOVIES};
use crate::state::AppState;

/// Number of reviews shown in the homepage feed.
pub const LATEST_FEED_LEN: usize = 5;

/// Per-movie review lists and the homepage feed. Lists are immutable
/// snapshots; every update swaps in a new one.
pub struct ReviewStore {
    by_movie: RwLock<HashMap<String, Arc<[Review]>>>,
    latest: RwLock<Arc<[Review]>>,
}

impl ReviewStore {
    pub fn new() -> Self {
        Self {
            by_movie: RwLock::new(HashMap::new()),
            latest: RwLock::new(Arc::from(Vec::new())),
        }
    }

    pub async fn for_movie(&self, movie_id: &str) -> Arc<[Review]> {
        self.by_movie
            .read()
            .await
            .get(movie_id)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub async fn replace(&self, movie_id: &str, reviews: Vec<Review>) {
        self.by_movie
            .write()
            .await
            .insert(movie_id.to_string(), Arc::from(reviews));
    }

    pub async fn append(&self, movie_id: &str, review: Review) {
        let mut by_movie = self.by_movie.write().await;
        let mut next: Vec<Review> = by_movie
            .get(movie_id)
            .map(|current| current.to_vec())
            .unwrap_or_default();
        next.push(review);
        by_movie.insert(movie_id.to_string(), Arc::from(next));
    }

    pub async fn latest(&self) -> Arc<[Review]> {
        self.latest.read().await.clone()
    }

    pub async fn set_latest(&self, reviews: Vec<Review>) {
        *self.latest.write().await = Arc::from(reviews);
    }
}

impl Default for ReviewStore {
    fn default() -> Self {
        Self::new()
    }
}

/// What the single UI session is looking at.
pub struct Session {
    selected: RwLock<Option<&'static Movie>>,
    latest_analysis: RwLock<Option<Arc<ReviewSubmissionResult>>>,
    in_flight: AtomicUsize,
}

impl Session {
    pub fn new() -> Self {
        Self {
            selected: RwLock::new(None),
            latest_analysis: RwLock::new(None),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub async fn selected(&self) -> Option<&'static Movie> {
        *self.selected.read().await
    }

    /// Switching movies always drops the previous analysis.
    pub async fn select_movie(&self, movie_id: &str) -> Option<&'static Movie> {
        let movie = catalog::find(movie_id)?;
        *self.selected.write().await = Some(movie);
        *self.latest_analysis.write().await = None;
        Some(movie)
    }

    pub async fn back_to_catalog(&self) {
        *self.selected.write().await = None;
        *self.latest_analysis.write().await = None;
    }

    pub async fn latest_analysis(&self) -> Option<Arc<ReviewSubmissionResult>> {
        self.latest_analysis.read().await.clone()
    }

    pub async fn latest_analysis_for(&self, movie_id: &str) -> Option<Arc<ReviewSubmissionResult>> {
        self.latest_analysis()
            .await
            .filter(|analysis| analysis.movie_id == movie_id)
    }

    pub async fn record_analysis(&self, result: ReviewSubmissionResult) {
        *self.latest_analysis.write().await = Some(Arc::new(result));
    }

    pub fn submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire) > 0
    }

    pub fn begin_submission(&self) -> SubmissionGuard<'_> {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        SubmissionGuard { session: self }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

pub struct SubmissionGuard<'a> {
    session: &'a Session,
}

impl Drop for SubmissionGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.fetch_sub(1, Ordering::AcqRel);
    }
}

pub fn temporary_review_id() -> ReviewId {
    ReviewId::Local(format!(
        "{}{}-{}",
        ReviewId::LOCAL_PREFIX,
        Utc::now().timestamp_millis(),
        &Uuid::new_v4().to_string()[..8]
    ))
}

/// A review that only exists in this process, built from an analysed
/// submission that may not have been stored.
pub fn local_review(result: &ReviewSubmissionResult) -> Review {
    Review {
        id: Some(temporary_review_id()),
        movie_id: Some(result.movie_id.clone()),
        review_text: result.review_text.clone(),
        sentiment: result.sentiment,
        rating: result.rating,
        sentiment_score: result.sentiment_score,
        created_at: Some(result.timestamp.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}

/// Fetch every catalog movie's reviews, one at a time. A movie whose fetch
/// fails gets an empty list.
pub async fn load_all(state: &AppState) {
    let timeout = state.backend.timeouts().initial_reviews;

    for movie in MOVIES {
        let reviews = match state.backend.movie_reviews(movie.id, timeout).await {
            Ok(reviews) => reviews,
            Err(e) => {
                debug!("No reviews loaded for {}: {}", movie.id, e);
                Vec::new()
            }
        };
        state.reviews.replace(movie.id, reviews).await;
    }
    info!("Reviews loaded for {} movies", MOVIES.len());
}

pub async fn load_latest(state: &AppState) {
    let reviews = match state.backend.latest_reviews().await {
        Ok(mut reviews) => {
            reviews.truncate(LATEST_FEED_LEN);
            reviews
        }
        Err(e) => {
            info!("Failed to load latest reviews: {}", e);
            Vec::new()
        }
    };
    state.reviews.set_latest(reviews).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::Sentiment;

    fn review(text: &str) -> Review {
        Review {
            id: Some(ReviewId::Remote(1)),
            movie_id: Some("inception".into()),
            review_text: text.into(),
            sentiment: Some(Sentiment::Neutral),
            rating: Some(3.0),
            sentiment_score: Some(0.5),
            created_at: None,
        }
    }

    #[tokio::test]
    async fn append_swaps_in_a_new_snapshot() {
        let store = ReviewStore::new();
        store.replace("inception", vec![review("first")]).await;

        let before = store.for_movie("inception").await;
        store.append("inception", review("second")).await;
        let after = store.for_movie("inception").await;

        assert_eq!(before.len(), 1);
        assert_eq!(after.len(), 2);
        assert_eq!(after[1].review_text, "second");
        assert!(store.for_movie("gladiator").await.is_empty());
    }

    #[tokio::test]
    async fn navigation_clears_latest_analysis() {
        let session = Session::new();
        assert!(session.select_movie("inception").await.is_some());
        session
            .record_analysis(ReviewSubmissionResult::acknowledged("inception", "Great", "ok".into()))
            .await;
        assert!(session.latest_analysis_for("inception").await.is_some());
        assert!(session.latest_analysis_for("gladiator").await.is_none());

        session.select_movie("gladiator").await;
        assert!(session.latest_analysis().await.is_none());

        session
            .record_analysis(ReviewSubmissionResult::acknowledged("gladiator", "Meh", "ok".into()))
            .await;
        session.back_to_catalog().await;
        assert!(session.latest_analysis().await.is_none());
        assert!(session.selected().await.is_none());

        assert!(session.select_movie("avatar").await.is_none());
    }

    #[test]
    fn submission_guard_tracks_in_flight_work() {
        let session = Session::new();
        assert!(!session.submitting());
        let a = session.begin_submission();
        let b = session.begin_submission();
        drop(a);
        assert!(session.submitting());
        drop(b);
        assert!(!session.submitting());
    }

    #[test]
    fn temporary_ids_are_prefixed_and_distinct() {
        let a = temporary_review_id();
        let b = temporary_review_id();
        assert!(a.is_local());
        assert_ne!(a, b);
    }
}
