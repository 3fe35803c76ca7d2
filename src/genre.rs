use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// The unified five-class genre taxonomy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Genre {
    Classic,
    HipHop,
    Electronic,
    Pop,
    Rock,
}

/// GTZAN genre names that have a counterpart in [`Genre`].
const GTZAN_NAMES: &[(&str, Genre)] = &[
    ("classical", Genre::Classic),
    ("hiphop", Genre::HipHop),
    ("pop", Genre::Pop),
    ("rock", Genre::Rock),
];

/// GTZAN's numeric label codes (alphabetical index of the ten genres).
const GTZAN_CODES: &[(i64, Genre)] = &[
    (1, Genre::Classic),
    (4, Genre::HipHop),
    (7, Genre::Pop),
    (9, Genre::Rock),
];

impl Genre {
    pub const ALL: [Genre; 5] = [
        Genre::Classic,
        Genre::HipHop,
        Genre::Electronic,
        Genre::Pop,
        Genre::Rock,
    ];

    pub fn code(self) -> i64 {
        match self {
            Genre::Classic => 0,
            Genre::HipHop => 1,
            Genre::Electronic => 2,
            Genre::Pop => 3,
            Genre::Rock => 4,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Genre::Classic => "Clássica",
            Genre::HipHop => "Hip-Hop",
            Genre::Electronic => "Eletrônica",
            Genre::Pop => "Pop",
            Genre::Rock => "Rock",
        }
    }

    pub fn from_number(code: i64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|g| g.code() == code)
            .ok_or(Error::UnknownGenre(code))
    }

    /// Map a GTZAN genre name (case-insensitive). Genres outside the
    /// taxonomy (blues, country, ...) map to `None`.
    pub fn from_gtzan_genre(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        GTZAN_NAMES
            .iter()
            .find(|(gtzan, _)| *gtzan == name)
            .map(|(_, genre)| *genre)
    }

    pub fn from_gtzan_code(code: i64) -> Option<Self> {
        GTZAN_CODES
            .iter()
            .find(|(gtzan, _)| *gtzan == code)
            .map(|(_, genre)| *genre)
    }

    pub fn is_gtzan_genre(name: &str) -> bool {
        Self::from_gtzan_genre(name).is_some()
    }

    pub fn is_gtzan_code(code: i64) -> bool {
        Self::from_gtzan_code(code).is_some()
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_number(genre.code()).unwrap(), genre);
        }
        assert_eq!(Genre::from_number(5).unwrap_err(), Error::UnknownGenre(5));
    }

    #[test]
    fn gtzan_names_remap_onto_taxonomy() {
        assert_eq!(Genre::from_gtzan_genre("classical"), Some(Genre::Classic));
        assert_eq!(Genre::from_gtzan_genre("HipHop"), Some(Genre::HipHop));
        assert_eq!(Genre::from_gtzan_genre("rock"), Some(Genre::Rock));
        assert_eq!(Genre::from_gtzan_genre("blues"), None);
        assert!(!Genre::is_gtzan_genre("metal"));
    }

    #[test]
    fn gtzan_codes_remap_onto_taxonomy() {
        assert_eq!(Genre::from_gtzan_code(1).map(Genre::code), Some(0));
        assert_eq!(Genre::from_gtzan_code(4).map(Genre::code), Some(1));
        assert_eq!(Genre::from_gtzan_code(7).map(Genre::code), Some(3));
        assert_eq!(Genre::from_gtzan_code(9).map(Genre::code), Some(4));
        assert!(!Genre::is_gtzan_code(0));
    }
}
