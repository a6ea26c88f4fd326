//! User reviews

use crate::core::movie::MovieId;
use crate::error::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Highest rating a review may carry
pub const MAX_REVIEW_RATING: u8 = 5;

/// A validated user review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: u64,
    pub movie_id: MovieId,
    /// 0 to 5
    pub rating: u8,
    pub text: String,
    pub user: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Review author as sent by the remote source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawAuthor {
    Name(String),
    Account { id: u64, username: String },
}

impl RawAuthor {
    fn into_name(self) -> String {
        match self {
            RawAuthor::Name(name) => name,
            RawAuthor::Account { username, .. } => username,
        }
    }
}

/// Review as returned by the remote source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReview {
    pub id: u64,
    pub rating: i64,
    #[serde(default)]
    pub review_text: String,
    #[serde(default)]
    pub user: Option<RawAuthor>,
    /// Offset-less timestamps are taken as UTC
    #[serde(default, alias = "review_date", deserialize_with = "lenient_datetime")]
    pub date: Option<DateTime<Utc>>,
}

fn lenient_datetime<'de, D>(deserializer: D) -> std::result::Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(raw) = Option::<String>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let raw = raw.trim();
    if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(date.with_timezone(&Utc)));
    }
    raw.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| Some(naive.and_utc()))
        .map_err(|e| D::Error::custom(format!("invalid review date {:?}: {}", raw, e)))
}

impl RawReview {
    /// Validate and attach to a movie
    pub fn into_review(self, movie_id: MovieId) -> Result<Review> {
        let rating = u8::try_from(self.rating)
            .ok()
            .filter(|r| *r <= MAX_REVIEW_RATING)
            .ok_or_else(|| {
                Error::Format(format!(
                    "review {} has rating {} outside 0-{}",
                    self.id, self.rating, MAX_REVIEW_RATING
                ))
            })?;

        Ok(Review {
            id: self.id,
            movie_id,
            rating,
            text: self.review_text,
            user: self.user.map(RawAuthor::into_name),
            date: self.date,
        })
    }
}

/// A review about to be submitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    pub movie_id: MovieId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    pub rating: u8,
    pub review_text: String,
}

impl NewReview {
    pub fn new(movie_id: MovieId, rating: u8, review_text: impl Into<String>) -> Self {
        Self {
            movie_id,
            user_id: None,
            rating,
            review_text: review_text.into(),
        }
    }

    pub fn with_user(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_id.is_none() {
            return Err(Error::Format("review has no author".to_string()));
        }
        if self.rating > MAX_REVIEW_RATING {
            return Err(Error::Format(format!(
                "rating {} outside 0-{}",
                self.rating, MAX_REVIEW_RATING
            )));
        }
        Ok(())
    }
}
