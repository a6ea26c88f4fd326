//! Catalog facade: the queries views run against the cached snapshot

pub mod reviews;

pub use reviews::ReviewLedger;

use crate::cache::{CacheOptions, CacheStats, CatalogCache, JsonFileStore, Snapshot};
use crate::config::CatalogConfig;
use crate::core::movie::{MovieId, MovieRecord};
use crate::error::{Error, Result};
use crate::selection::{pick_random, select_for_date};
use crate::source::{CatalogSource, HttpCatalogSource};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// Rating order for genre listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

pub struct Catalog {
    cache: Arc<CatalogCache>,
    source: Arc<dyn CatalogSource>,
    reviews: ReviewLedger,
    request_timeout: Duration,
}

impl Catalog {
    pub fn new(source: Arc<dyn CatalogSource>, options: CacheOptions) -> Self {
        let request_timeout = options.request_timeout;
        let cache = Arc::new(CatalogCache::new(Arc::clone(&source), options));
        Self::with_cache(cache, source, request_timeout)
    }

    pub fn with_cache(
        cache: Arc<CatalogCache>,
        source: Arc<dyn CatalogSource>,
        request_timeout: Duration,
    ) -> Self {
        let reviews = ReviewLedger::new(Arc::clone(&cache), Arc::clone(&source), request_timeout);
        Self {
            cache,
            source,
            reviews,
            request_timeout,
        }
    }

    /// HTTP-backed catalog, persisting snapshots when a path is configured
    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        let source: Arc<dyn CatalogSource> = Arc::new(HttpCatalogSource::from_config(config)?);
        let options = CacheOptions::from_config(config);
        let cache = match &config.snapshot_path {
            Some(path) => CatalogCache::with_store(
                Arc::clone(&source),
                options,
                Arc::new(JsonFileStore::new(path)),
            ),
            None => CatalogCache::new(Arc::clone(&source), options),
        };
        Ok(Self::with_cache(
            Arc::new(cache),
            source,
            config.request_timeout(),
        ))
    }

    pub fn cache(&self) -> &Arc<CatalogCache> {
        &self.cache
    }

    pub fn reviews(&self) -> &ReviewLedger {
        &self.reviews
    }

    pub async fn movies(&self) -> Snapshot {
        self.cache.get().await
    }

    /// One movie's detail.
    ///
    /// Served from the snapshot when it holds the movie, otherwise asked of the
    /// source. Unlike browsing, failures here reach the caller.
    pub async fn movie_by_id(&self, id: MovieId) -> Result<MovieRecord> {
        if let Some(movie) = self.movies().await.iter().find(|m| m.id == id) {
            return Ok(movie.clone());
        }
        let raw = tokio::time::timeout(self.request_timeout, self.source.fetch_movie(id)).await??;
        raw.into_record()
    }

    pub async fn movie_by_slug(&self, slug: &str) -> Result<MovieRecord> {
        self.movies()
            .await
            .iter()
            .find(|m| m.slug == slug)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("movie '{}'", slug)))
    }

    /// Movies in `genre`, best rated first for `Desc`. Unrated movies sort
    /// below every rated one; ties go by title.
    pub async fn movies_by_genre(&self, genre: &str, order: SortOrder) -> Vec<MovieRecord> {
        let mut movies: Vec<MovieRecord> = self
            .movies()
            .await
            .iter()
            .filter(|m| m.has_genre(genre))
            .cloned()
            .collect();
        movies.sort_by(|a, b| {
            let by_rating = match order {
                SortOrder::Asc => a.rating.cmp_value(&b.rating),
                SortOrder::Desc => b.rating.cmp_value(&a.rating),
            };
            by_rating.then_with(|| a.title.cmp(&b.title))
        });
        movies
    }

    /// Every genre in the catalog, sorted
    pub async fn genres(&self) -> Vec<String> {
        self.movies()
            .await
            .iter()
            .flat_map(|m| m.genres.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Case-insensitive match on title, director or description
    pub async fn search(&self, query: &str) -> Vec<MovieRecord> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.movies()
            .await
            .iter()
            .filter(|m| m.matches_query(&needle))
            .cloned()
            .collect()
    }

    /// The featured movie for `date`
    pub async fn featured(&self, date: NaiveDate) -> Option<MovieRecord> {
        select_for_date(&self.movies().await, date).cloned()
    }

    pub async fn random(&self) -> Option<MovieRecord> {
        pick_random(&self.movies().await).cloned()
    }

    pub async fn refresh(&self) -> Result<Snapshot> {
        self.cache.refresh().await
    }

    pub fn invalidate(&self) {
        self.cache.invalidate();
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.introspect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::movie::RawMovie;
    use crate::source::MockCatalogSource;
    use mockall::predicate::eq;

    fn movie(id: u64, title: &str, rating: Option<f64>, genres: &str, director: &str) -> RawMovie {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "title": title,
            "rating": rating,
            "genre": genres,
            "director": director,
        }))
        .unwrap()
    }

    fn catalog() -> Catalog {
        let mut mock = MockCatalogSource::new();
        mock.expect_fetch_all().returning(|| {
            Ok(vec![
                movie(1, "Heat", Some(8.3), "Crime, Drama", "Michael Mann"),
                movie(2, "Collateral", Some(7.5), "Crime, Thriller", "Michael Mann"),
                movie(3, "Thief", None, "Crime", "Michael Mann"),
                movie(4, "Arrival", Some(7.9), "Drama, Sci-Fi", "Denis Villeneuve"),
            ])
        });
        mock.expect_fetch_movie()
            .with(eq(MovieId(99)))
            .returning(|id| Err(Error::NotFound(format!("movie {}", id))));
        mock.expect_fetch_movie()
            .with(eq(MovieId(50)))
            .returning(|_| Ok(movie(50, "Manhunter", Some(7.2), "Thriller", "Michael Mann")));
        Catalog::new(Arc::new(mock), CacheOptions::default())
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_slug() {
        let catalog = catalog();

        assert_eq!(catalog.movie_by_id(MovieId(4)).await.unwrap().title, "Arrival");
        assert_eq!(catalog.movie_by_id(MovieId(50)).await.unwrap().title, "Manhunter");
        assert!(matches!(
            catalog.movie_by_id(MovieId(99)).await,
            Err(Error::NotFound(_))
        ));

        assert_eq!(catalog.movie_by_slug("collateral").await.unwrap().id, MovieId(2));
        assert!(matches!(
            catalog.movie_by_slug("missing").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_genre_listing_order() {
        let catalog = catalog();

        let desc: Vec<_> = catalog
            .movies_by_genre("crime", SortOrder::Desc)
            .await
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(desc, ["Heat", "Collateral", "Thief"]);

        let asc: Vec<_> = catalog
            .movies_by_genre("Crime", SortOrder::Asc)
            .await
            .into_iter()
            .map(|m| m.title)
            .collect();
        assert_eq!(asc, ["Thief", "Collateral", "Heat"]);
    }

    #[tokio::test]
    async fn test_genres_and_search() {
        let catalog = catalog();

        assert_eq!(
            catalog.genres().await,
            ["Crime", "Drama", "Sci-Fi", "Thriller"]
        );
        assert_eq!(catalog.search("MANN").await.len(), 3);
        assert_eq!(catalog.search("arriv").await[0].id, MovieId(4));
        assert!(catalog.search("   ").await.is_empty());
    }

    #[tokio::test]
    async fn test_featured_is_stable() {
        let catalog = catalog();
        let day = NaiveDate::from_ymd_opt(2025, 10, 16).unwrap();

        let first = catalog.featured(day).await.unwrap();
        assert_eq!(catalog.featured(day).await.unwrap(), first);
        assert!(catalog.random().await.is_some());
    }
}
