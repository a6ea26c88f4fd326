//! Movie records and their wire representation

use crate::error::{Error, Result};
use crate::rating::{compute_display_rating, DisplayRating};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Unique movie identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub u64);

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for MovieId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Scale an intrinsic catalog rating is expressed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingScale {
    /// 0 to 5, the scale user reviews use
    FivePoint,
    /// 0 to 10, the scale most catalog feeds use
    TenPoint,
}

impl RatingScale {
    /// Guess the scale from the magnitude of a value.
    ///
    /// Anything above 5 can only be on the ten point scale. A low ten point
    /// value is indistinguishable from a five point one, so sources that know
    /// their scale should declare it instead.
    pub fn infer(value: f64) -> Self {
        if value > 5.0 {
            RatingScale::TenPoint
        } else {
            RatingScale::FivePoint
        }
    }
}

/// The catalog's own baseline rating for a movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntrinsicRating {
    pub value: f64,
    pub scale: RatingScale,
}

impl IntrinsicRating {
    pub fn new(value: f64, scale: RatingScale) -> Self {
        Self { value, scale }
    }

    /// Rating whose scale is inferred from its magnitude
    pub fn inferred(value: f64) -> Self {
        Self::new(value, RatingScale::infer(value))
    }

    /// Value on the 0-5 display scale
    pub fn normalized(&self) -> f64 {
        match self.scale {
            RatingScale::FivePoint => self.value,
            RatingScale::TenPoint => self.value / 2.0,
        }
    }
}

impl From<f64> for IntrinsicRating {
    fn from(value: f64) -> Self {
        Self::inferred(value)
    }
}

/// A movie as held in the catalog snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: MovieId,
    /// Stable secondary key used for external addressing
    pub slug: String,
    pub title: String,
    pub year: Option<i32>,
    pub intrinsic: Option<IntrinsicRating>,
    /// Displayed rating; the only field rating corrections touch
    pub rating: DisplayRating,
    pub genres: Vec<String>,
    pub director: String,
    pub description: String,
    pub release_date: Option<NaiveDate>,
    pub image: Option<String>,
}

impl MovieRecord {
    /// Case-insensitive genre membership
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }

    /// Substring match on title, director and description.
    ///
    /// `needle` must already be lower-cased.
    pub fn matches_query(&self, needle: &str) -> bool {
        [&self.title, &self.director, &self.description]
            .iter()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

/// Movie as returned by the remote catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMovie {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub rating: Option<f64>,
    /// Declared scale of `rating`, when the source knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_scale: Option<RatingScale>,
    #[serde(default, deserialize_with = "genre_list")]
    pub genres: Vec<String>,
    /// Older endpoints send a single comma separated `genre` field
    #[serde(default, deserialize_with = "genre_list", skip_serializing_if = "Vec::is_empty")]
    pub genre: Vec<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GenreField {
    List(Vec<String>),
    Joined(String),
}

fn genre_list<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let genres = match Option::<GenreField>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(GenreField::List(list)) => list,
        Some(GenreField::Joined(joined)) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(genres
        .into_iter()
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty())
        .collect())
}

impl RawMovie {
    /// Validate and convert into a catalog record
    pub fn into_record(self) -> Result<MovieRecord> {
        let title = self.title.trim().to_string();
        let id = self
            .id
            .map(MovieId)
            .ok_or_else(|| Error::Format(format!("movie '{}' has no id", title)))?;
        if title.is_empty() {
            return Err(Error::Format(format!("movie {} has no title", id)));
        }

        let release_date = self.release_date.as_deref().and_then(parse_release_date);
        let year = self.year.or_else(|| release_date.map(|d| d.year()));

        let intrinsic = self
            .rating
            .filter(|r| r.is_finite() && *r > 0.0)
            .map(|value| match self.rating_scale {
                Some(scale) => IntrinsicRating::new(value, scale),
                None => IntrinsicRating::inferred(value),
            });

        let slug = self
            .slug
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| slugify(&title));

        let mut seen = HashSet::new();
        let genres = self
            .genres
            .into_iter()
            .chain(self.genre)
            .filter(|g| seen.insert(g.to_lowercase()))
            .collect();

        Ok(MovieRecord {
            id,
            slug,
            title,
            year,
            intrinsic,
            rating: compute_display_rating(intrinsic, &[]),
            genres,
            director: self.director.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            release_date,
            image: self.image,
        })
    }
}

/// Convert a whole remote collection.
///
/// A single malformed record or a duplicate id rejects the collection, so a
/// snapshot built from the result is always complete.
pub fn records_from_raw(raw: Vec<RawMovie>) -> Result<Vec<MovieRecord>> {
    let mut ids = HashSet::with_capacity(raw.len());
    raw.into_iter()
        .map(|movie| {
            let record = movie.into_record()?;
            if !ids.insert(record.id) {
                return Err(Error::Format(format!("duplicate movie id {}", record.id)));
            }
            Ok(record)
        })
        .collect()
}

/// Derive a URL slug from a title: lower-case alphanumerics, anything else
/// collapsed into single dashes.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut gap = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if gap && !slug.is_empty() {
                slug.push('-');
            }
            gap = false;
            slug.extend(c.to_lowercase());
        } else {
            gap = true;
        }
    }
    slug
}

// Accepts plain dates and datetimes; only the date part is kept.
fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(id: u64, title: &str) -> RawMovie {
        RawMovie {
            id: Some(id),
            title: title.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Dark Knight"), "the-dark-knight");
        assert_eq!(slugify("Avengers: Endgame"), "avengers-endgame");
        assert_eq!(slugify("  Se7en  "), "se7en");
    }

    #[test]
    fn test_genres_accept_list_or_joined_string() {
        let listed: RawMovie = serde_json::from_value(json!({
            "id": 1, "title": "Heat", "genres": ["Crime", "Drama"]
        }))
        .unwrap();
        let joined: RawMovie = serde_json::from_value(json!({
            "id": 1, "title": "Heat", "genre": "Crime, Drama"
        }))
        .unwrap();

        assert_eq!(listed.into_record().unwrap().genres, vec!["Crime", "Drama"]);
        assert_eq!(joined.into_record().unwrap().genres, vec!["Crime", "Drama"]);
    }

    #[test]
    fn test_record_derives_missing_fields() {
        let movie: RawMovie = serde_json::from_value(json!({
            "id": 7,
            "title": "The Godfather",
            "rating": 9.2,
            "release_date": "1972-03-24T00:00:00"
        }))
        .unwrap();
        let record = movie.into_record().unwrap();

        assert_eq!(record.slug, "the-godfather");
        assert_eq!(record.year, Some(1972));
        assert_eq!(record.intrinsic.unwrap().scale, RatingScale::TenPoint);
        assert_eq!(record.rating.to_string(), "4.6");
    }

    #[test]
    fn test_declared_scale_wins_over_inference() {
        let mut movie = raw(3, "Low Budget");
        movie.rating = Some(3.0);
        movie.rating_scale = Some(RatingScale::TenPoint);

        let record = movie.into_record().unwrap();
        assert_eq!(record.rating.value(), Some(1.5));
    }

    #[test]
    fn test_zero_rating_is_unrated() {
        let mut movie = raw(1, "Unrated");
        movie.rating = Some(0.0);
        let record = movie.into_record().unwrap();
        assert!(record.intrinsic.is_none());
        assert_eq!(record.rating, DisplayRating::NoReviews);
    }

    #[test]
    fn test_collection_rejected_on_bad_record() {
        let missing_id = RawMovie {
            title: "Nameless".to_string(),
            ..Default::default()
        };
        let result = records_from_raw(vec![raw(1, "Heat"), missing_id]);
        assert!(matches!(result, Err(Error::Format(_))));

        let result = records_from_raw(vec![raw(1, "Heat"), raw(1, "Heat again")]);
        assert!(matches!(result, Err(Error::Format(_))));
    }

    #[test]
    fn test_query_matching() {
        let mut movie = raw(1, "Inception");
        movie.director = Some("Christopher Nolan".to_string());
        movie.genres = vec!["Sci-Fi".to_string()];
        let record = movie.into_record().unwrap();

        assert!(record.matches_query("nolan"));
        assert!(record.matches_query("incep"));
        assert!(!record.matches_query("tarantino"));
        assert!(record.has_genre("sci-fi"));
    }
}
