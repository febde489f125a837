use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Movie {
    pub id: &'static str,
    pub title: &'static str,
    pub thumbnail: &'static str,
    pub year: u16,
    pub genre: &'static str,
}

/// Ids match the ones the backend was seeded with.
pub const MOVIES: &[Movie] = &[
    Movie {
        id: "shawshank",
        title: "The Shawshank Redemption",
        thumbnail: "/images/movies/shawshank-redemption.jpg",
        year: 1994,
        genre: "Drama",
    },
    Movie {
        id: "inception",
        title: "Inception",
        thumbnail: "/images/movies/inception.jpg",
        year: 2010,
        genre: "Sci-Fi",
    },
    Movie {
        id: "interstellar",
        title: "Interstellar",
        thumbnail: "/images/movies/interstellar.jpg",
        year: 2014,
        genre: "Sci-Fi",
    },
    Movie {
        id: "fight-club",
        title: "Fight Club",
        thumbnail: "/images/movies/fight-club.jpg",
        year: 1999,
        genre: "Drama",
    },
    Movie {
        id: "gladiator",
        title: "Gladiator",
        thumbnail: "/images/movies/gladiator.jpg",
        year: 2000,
        genre: "Action",
    },
    Movie {
        id: "dark-knight",
        title: "Dark Knight",
        thumbnail: "/images/movies/dark-knight.jpg",
        year: 2008,
        genre: "Action",
    },
];

pub fn find(id: &str) -> Option<&'static Movie> {
    MOVIES.iter().find(|m| m.id == id)
}

pub fn title_for(id: &str) -> &str {
    find(id).map_or(id, |m| m.title)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        assert_eq!(find("inception").map(|m| m.year), Some(2010));
        assert!(find("avatar").is_none());
        assert_eq!(title_for("dark-knight"), "Dark Knight");
        assert_eq!(title_for("avatar"), "avatar");
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = MOVIES.iter().map(|m| m.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), MOVIES.len());
    }
}
