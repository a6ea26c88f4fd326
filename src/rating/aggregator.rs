//! Rating aggregation.
//!
//! A movie's displayed rating is the mean of its user reviews on the 0-5
//! scale, or its intrinsic catalog rating normalised to that scale when no
//! reviews exist. "Unrated" is a state of its own and never renders as 0.0.

use crate::core::movie::{IntrinsicRating, MovieRecord};
use crate::core::review::Review;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Rating as shown to users
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DisplayRating {
    /// Nothing to show; distinct from a genuine score
    #[default]
    NoReviews,
    /// Score on the 0-5 scale
    Rated { value: f64, user_derived: bool },
}

impl DisplayRating {
    /// Build a rating, collapsing zero and non-finite values to `NoReviews`
    pub fn rated(value: f64, user_derived: bool) -> Self {
        if value.is_finite() && value != 0.0 {
            DisplayRating::Rated {
                value,
                user_derived,
            }
        } else {
            DisplayRating::NoReviews
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            DisplayRating::NoReviews => None,
            DisplayRating::Rated { value, .. } => Some(*value),
        }
    }

    pub fn is_rated(&self) -> bool {
        matches!(self, DisplayRating::Rated { .. })
    }

    pub fn is_user_derived(&self) -> bool {
        matches!(
            self,
            DisplayRating::Rated {
                user_derived: true,
                ..
            }
        )
    }

    /// Ascending order with unrated movies first
    pub fn cmp_value(&self, other: &Self) -> Ordering {
        match (self.value(), other.value()) {
            (None, None) => Ordering::Equal,
            (None, Some(_)) => Ordering::Less,
            (Some(_), None) => Ordering::Greater,
            (Some(a), Some(b)) => a.total_cmp(&b),
        }
    }
}

impl fmt::Display for DisplayRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayRating::NoReviews => write!(f, "No reviews"),
            DisplayRating::Rated { value, .. } => write!(f, "{:.1}", value),
        }
    }
}

/// Compute the displayed rating from reviews or the intrinsic rating.
///
/// Pure; callers push the result through `CatalogCache::update_rating`.
pub fn compute_display_rating(
    intrinsic: Option<IntrinsicRating>,
    reviews: &[Review],
) -> DisplayRating {
    if !reviews.is_empty() {
        let total: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
        return DisplayRating::rated(total / reviews.len() as f64, true);
    }

    match intrinsic {
        Some(rating) => DisplayRating::rated(rating.normalized(), false),
        None => DisplayRating::NoReviews,
    }
}

/// Displayed rating for a record given its current reviews
pub fn display_rating_for(movie: &MovieRecord, reviews: &[Review]) -> DisplayRating {
    compute_display_rating(movie.intrinsic, reviews)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::movie::{MovieId, RatingScale};

    fn review(rating: u8) -> Review {
        Review {
            id: u64::from(rating),
            movie_id: MovieId(1),
            rating,
            text: String::new(),
            user: None,
            date: None,
        }
    }

    #[test]
    fn test_unrated_is_sentinel() {
        let rating = compute_display_rating(Some(IntrinsicRating::inferred(0.0)), &[]);
        assert_eq!(rating, DisplayRating::NoReviews);
        assert_eq!(rating.to_string(), "No reviews");

        assert_eq!(compute_display_rating(None, &[]), DisplayRating::NoReviews);
    }

    #[test]
    fn test_reviews_average() {
        let rating = compute_display_rating(
            Some(IntrinsicRating::inferred(9.0)),
            &[review(4), review(2)],
        );
        assert_eq!(rating.value(), Some(3.0));
        assert!(rating.is_user_derived());
        assert_eq!(rating.to_string(), "3.0");
    }

    #[test]
    fn test_ten_point_intrinsic_is_halved() {
        let rating = compute_display_rating(Some(IntrinsicRating::inferred(9.3)), &[]);
        assert_eq!(rating.to_string(), "4.7");
        assert!(!rating.is_user_derived());
    }

    #[test]
    fn test_five_point_intrinsic_kept() {
        let rating = compute_display_rating(Some(IntrinsicRating::inferred(4.8)), &[]);
        assert_eq!(rating.value(), Some(4.8));

        let declared = IntrinsicRating::new(4.8, RatingScale::TenPoint);
        let rating = compute_display_rating(Some(declared), &[]);
        assert_eq!(rating.value(), Some(2.4));
    }

    #[test]
    fn test_all_zero_reviews_are_sentinel() {
        let rating = compute_display_rating(None, &[review(0), review(0)]);
        assert_eq!(rating, DisplayRating::NoReviews);
    }

    #[test]
    fn test_ordering_puts_unrated_first() {
        let mut ratings = vec![
            DisplayRating::rated(4.0, true),
            DisplayRating::NoReviews,
            DisplayRating::rated(2.5, false),
        ];
        ratings.sort_by(|a, b| a.cmp_value(b));
        assert_eq!(ratings[0], DisplayRating::NoReviews);
        assert_eq!(ratings[2].value(), Some(4.0));
    }
}
