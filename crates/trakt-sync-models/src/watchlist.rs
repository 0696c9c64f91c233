use serde::{Deserialize, Serialize};

use crate::imdb_id::ImdbId;
use crate::media::MediaKind;

/// One row of the IMDb watchlist export
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchlistEntry {
    pub id: ImdbId,
    pub kind: MediaKind,
}

impl WatchlistEntry {
    pub fn new(id: ImdbId, kind: MediaKind) -> Self {
        Self { id, kind }
    }
}
