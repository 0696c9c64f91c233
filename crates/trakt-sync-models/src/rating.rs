use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::imdb_id::ImdbId;
use crate::media::MediaKind;

/// One row of the IMDb ratings export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RatingEntry {
    pub id: ImdbId,
    pub kind: MediaKind,
    pub rating: u8, // 1-10, same scale on both sides
    pub rated_on: NaiveDate,
}

/// A rating as currently stored on Trakt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteRating {
    pub id: ImdbId,
    pub kind: MediaKind,
    pub rating: u8,
    pub rated_at: DateTime<Utc>,
}

/// Parse an integer rating in `1..=10`.
pub fn parse_rating(raw: &str) -> Result<u8, InputError> {
    match raw.trim().parse::<u8>() {
        Ok(value) if (1..=10).contains(&value) => Ok(value),
        _ => Err(InputError::InvalidRating(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rating_bounds() {
        assert_eq!(parse_rating("1"), Ok(1));
        assert_eq!(parse_rating(" 10 "), Ok(10));
        assert!(parse_rating("0").is_err());
        assert!(parse_rating("11").is_err());
        assert!(parse_rating("7.5").is_err());
        assert!(parse_rating("").is_err());
    }
}
