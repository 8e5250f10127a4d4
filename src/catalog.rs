use crate::model::Movie;

pub const MOVIES: &[Movie] = &[
    Movie {
        id: 1,
        title: "The Last Adventure",
        year: 2024,
        genre: "action",
        rating: 8.2,
        description: "An epic action movie with stunning visuals and heart-pounding sequences.",
        poster: "action",
    },
    Movie {
        id: 2,
        title: "Cosmic Journey",
        year: 2024,
        genre: "sci-fi",
        rating: 7.9,
        description: "A mind-bending sci-fi adventure through space and time.",
        poster: "sci-fi",
    },
    Movie {
        id: 3,
        title: "Love in Paris",
        year: 2024,
        genre: "romance",
        rating: 8.5,
        description: "A beautiful romantic story set in the city of love.",
        poster: "romance",
    },
    Movie {
        id: 4,
        title: "Laugh Out Loud",
        year: 2023,
        genre: "comedy",
        rating: 7.4,
        description: "The funniest comedy of the year that will keep you laughing.",
        poster: "comedy",
    },
    Movie {
        id: 5,
        title: "The Haunted Mansion",
        year: 2023,
        genre: "horror",
        rating: 6.8,
        description: "A terrifying horror experience that will keep you up at night.",
        poster: "horror",
    },
    Movie {
        id: 6,
        title: "Drama Queen",
        year: 2024,
        genre: "drama",
        rating: 8.7,
        description: "An emotional drama about life, love, and everything in between.",
        poster: "drama",
    },
];

/// Linear scan over the catalog. The search term matches title or description
/// case-insensitively; genre and year are exact; all conditions are AND-ed.
pub fn filter(search: &str, genre: Option<&str>, year: Option<u16>) -> Vec<&'static Movie> {
    let search = search.to_lowercase();
    MOVIES
        .iter()
        .filter(|movie| {
            let matches_search = search.is_empty()
                || movie.title.to_lowercase().contains(&search)
                || movie.description.to_lowercase().contains(&search);
            let matches_genre = genre.map_or(true, |g| movie.genre == g);
            let matches_year = year.map_or(true, |y| movie.year == y);
            matches_search && matches_genre && matches_year
        })
        .collect()
}
