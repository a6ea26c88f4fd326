//! HTTP implementation of [`CatalogSource`]

use super::CatalogSource;
use crate::config::CatalogConfig;
use crate::core::movie::{MovieId, RawMovie};
use crate::core::review::{NewReview, RawReview};
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Catalog source backed by the movie REST API
pub struct HttpCatalogSource {
    client: Client,
    base_url: String,
}

impl HttpCatalogSource {
    /// Create a source for `base_url` whose requests give up after `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Configuration("empty API base URL".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    pub fn from_config(config: &CatalogConfig) -> Result<Self> {
        Self::new(config.api_base_url.clone(), config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T> {
        let url = self.url(path);
        debug!(%url, "GET");
        let response = self.client.get(&url).send().await?;
        decode(response, what).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(what.to_string()));
    }
    if !status.is_success() {
        return Err(Error::Network(format!("{} returned HTTP {}", what, status)));
    }
    let body = response.bytes().await?;
    Ok(serde_json::from_slice(&body)?)
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn fetch_all(&self) -> Result<Vec<RawMovie>> {
        self.get_json("/movies-view/", "movie collection").await
    }

    async fn fetch_movie(&self, id: MovieId) -> Result<RawMovie> {
        self.get_json(&format!("/movies/{}", id), &format!("movie {}", id))
            .await
    }

    async fn fetch_reviews(&self, id: MovieId) -> Result<Vec<RawReview>> {
        self.get_json(
            &format!("/reviews/movie/{}", id),
            &format!("reviews of movie {}", id),
        )
        .await
    }

    async fn create_review(&self, review: NewReview) -> Result<RawReview> {
        let url = self.url("/reviews/");
        debug!(%url, movie_id = %review.movie_id, "POST");
        let response = self.client.post(&url).json(&review).send().await?;
        decode(response, "review submission").await
    }
}
