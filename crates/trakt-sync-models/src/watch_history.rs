use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::imdb_id::ImdbId;
use crate::media::MediaKind;
use crate::rating::RatingEntry;

/// A title the user has watched according to IMDb
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: ImdbId,
    pub kind: MediaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_on: Option<NaiveDate>, // No date means "watched at some point"
}

impl From<&RatingEntry> for HistoryEntry {
    fn from(rating: &RatingEntry) -> Self {
        Self {
            id: rating.id.clone(),
            kind: rating.kind,
            watched_on: Some(rating.rated_on),
        }
    }
}
