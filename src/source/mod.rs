//! Remote catalog sources.
//!
//! The remote API itself is an external collaborator; this module defines the
//! contract the cache consumes, an HTTP implementation of it, and the fixed
//! dataset served when the remote is unreachable.

pub mod fallback;
pub mod http;

pub use fallback::*;
pub use http::*;

use crate::core::movie::{MovieId, RawMovie};
use crate::core::review::{NewReview, RawReview};
use crate::error::Result;
use async_trait::async_trait;

/// Request/response access to the remote catalog
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the full movie collection.
    async fn fetch_all(&self) -> Result<Vec<RawMovie>>;

    /// Fetch a single movie; a miss is `Error::NotFound`.
    async fn fetch_movie(&self, id: MovieId) -> Result<RawMovie>;

    /// Fetch every review of a movie.
    async fn fetch_reviews(&self, id: MovieId) -> Result<Vec<RawReview>>;

    /// Submit a review and return it as stored remotely.
    async fn create_review(&self, review: NewReview) -> Result<RawReview>;
}
