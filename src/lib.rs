//! Movie Catalog: client-side data layer for a movie catalog API
//!
//! Views read the catalog through a snapshot cache that fetches at most once
//! per TTL, degrades to a built-in dataset when the API is unreachable, and
//! broadcasts rating corrections to every subscribed view.
//!
//! # Core Concepts
//!
//! - **Snapshot**: The immutable list of movies served to all views
//! - **Display rating**: Review average on a 0-5 scale, or the movie's own rating
//! - **Rating bus**: Fan-out of rating changes to subscribers
//! - **Featured selection**: One movie per day from a year-seeded shuffle
//!
//! # Example
//!
//! ```no_run
//! use movie_catalog::prelude::*;
//!
//! # async fn example() -> movie_catalog::error::Result<()> {
//! let catalog = Catalog::from_config(&CatalogConfig::load(None)?)?;
//!
//! let _view = catalog.cache().subscribe(|event, _snapshot| {
//!     println!("{} is now {}", event.movie_id, event.rating);
//!     Ok(())
//! });
//!
//! let dramas = catalog.movies_by_genre("drama", SortOrder::Desc).await;
//! let today = catalog.featured(chrono::Utc::now().date_naive()).await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod rating;
pub mod selection;
pub mod source;
pub mod telemetry;

/// Prelude module for common imports
pub mod prelude {
    pub use crate::cache::{CacheStats, CatalogCache, RatingChangeEvent, RatingUpdateBus};
    pub use crate::catalog::{Catalog, ReviewLedger, SortOrder};
    pub use crate::config::CatalogConfig;
    pub use crate::core::*;
    pub use crate::error::{Error, Result};
    pub use crate::rating::DisplayRating;
    pub use crate::source::CatalogSource;
}
