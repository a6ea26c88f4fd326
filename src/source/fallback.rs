//! Fixed dataset served while the remote catalog is unreachable

use crate::core::movie::{IntrinsicRating, MovieId, MovieRecord};
use crate::rating::compute_display_rating;

#[allow(clippy::too_many_arguments)]
fn movie(
    id: u64,
    slug: &str,
    title: &str,
    year: i32,
    rating: f64,
    genres: &[&str],
    director: &str,
    description: &str,
    image: &str,
) -> MovieRecord {
    let intrinsic = Some(IntrinsicRating::inferred(rating));
    MovieRecord {
        id: MovieId(id),
        slug: slug.to_string(),
        title: title.to_string(),
        year: Some(year),
        intrinsic,
        rating: compute_display_rating(intrinsic, &[]),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        director: director.to_string(),
        description: description.to_string(),
        release_date: None,
        image: Some(image.to_string()),
    }
}

/// The fallback catalog. Served verbatim, never mutated in place: the cache
/// stores its own copy.
pub fn fallback_dataset() -> Vec<MovieRecord> {
    vec![
        movie(
            1,
            "the-shawshank-redemption",
            "The Shawshank Redemption",
            1994,
            9.3,
            &["Drama"],
            "Frank Darabont",
            "Two imprisoned men bond over a number of years, finding solace and eventual redemption through acts of common decency.",
            "/images/shawshank.jpg",
        ),
        movie(
            2,
            "the-godfather",
            "The Godfather",
            1972,
            9.2,
            &["Crime", "Drama"],
            "Francis Ford Coppola",
            "An organized crime dynasty's aging patriarch transfers control of his clandestine empire to his reluctant son.",
            "/images/godfather.jpg",
        ),
        movie(
            3,
            "the-dark-knight",
            "The Dark Knight",
            2008,
            9.0,
            &["Action", "Crime", "Drama"],
            "Christopher Nolan",
            "When the menace known as the Joker wreaks havoc and chaos on the people of Gotham, Batman must accept one of the greatest psychological and physical tests.",
            "/images/dark-knight.jpg",
        ),
    ]
}
