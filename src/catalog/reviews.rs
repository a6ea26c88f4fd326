//! Per-movie review lists.
//!
//! Every change to a movie's reviews recomputes its displayed rating and
//! pushes it into the cache, which broadcasts it to all subscribed views.

use crate::cache::CatalogCache;
use crate::core::movie::MovieId;
use crate::core::review::{NewReview, Review};
use crate::error::Result;
use crate::rating::{compute_display_rating, DisplayRating};
use crate::source::CatalogSource;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub struct ReviewLedger {
    cache: Arc<CatalogCache>,
    source: Arc<dyn CatalogSource>,
    reviews: DashMap<MovieId, Vec<Review>>,
    request_timeout: Duration,
}

impl ReviewLedger {
    pub fn new(
        cache: Arc<CatalogCache>,
        source: Arc<dyn CatalogSource>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            source,
            reviews: DashMap::new(),
            request_timeout,
        }
    }

    /// Fetch a movie's reviews, replacing what is held locally
    pub async fn load(&self, movie_id: MovieId) -> Result<Vec<Review>> {
        let raw = tokio::time::timeout(self.request_timeout, self.source.fetch_reviews(movie_id))
            .await??;
        let reviews = raw
            .into_iter()
            .map(|r| r.into_review(movie_id))
            .collect::<Result<Vec<_>>>()?;

        debug!(%movie_id, count = reviews.len(), "reviews loaded");
        self.reviews.insert(movie_id, reviews.clone());
        self.push_rating(movie_id);
        Ok(reviews)
    }

    /// Submit a review remotely, then record it
    pub async fn submit(&self, review: NewReview) -> Result<Review> {
        review.validate()?;
        let movie_id = review.movie_id;
        let raw = tokio::time::timeout(self.request_timeout, self.source.create_review(review))
            .await??;
        let stored = raw.into_review(movie_id)?;
        self.record(stored.clone());
        Ok(stored)
    }

    /// Add or replace a review locally and return the recomputed rating
    pub fn record(&self, review: Review) -> DisplayRating {
        let movie_id = review.movie_id;
        {
            let mut list = self.reviews.entry(movie_id).or_default();
            list.retain(|r| r.id != review.id);
            list.push(review);
        }
        self.push_rating(movie_id)
    }

    /// Drop a review locally; `None` if it was not held
    pub fn remove(&self, movie_id: MovieId, review_id: u64) -> Option<DisplayRating> {
        let removed = {
            let mut list = self.reviews.get_mut(&movie_id)?;
            let before = list.len();
            list.retain(|r| r.id != review_id);
            list.len() != before
        };
        removed.then(|| self.push_rating(movie_id))
    }

    pub fn reviews(&self, movie_id: MovieId) -> Vec<Review> {
        self.reviews
            .get(&movie_id)
            .map(|list| list.value().clone())
            .unwrap_or_default()
    }

    // No map guard may be held here: listeners can call back into the ledger.
    fn push_rating(&self, movie_id: MovieId) -> DisplayRating {
        let reviews = self.reviews(movie_id);
        let intrinsic = self.cache.find(movie_id).and_then(|m| m.intrinsic);
        let rating = compute_display_rating(intrinsic, &reviews);
        self.cache.update_rating(movie_id, rating);
        rating
    }
}
