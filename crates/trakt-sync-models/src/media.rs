use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::InputError;

/// Kind of title on the IMDb side, and the bucket it lands in on Trakt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
    Episode,
}

impl MediaKind {
    pub const ALL: [MediaKind; 3] = [MediaKind::Movie, MediaKind::Show, MediaKind::Episode];

    /// Map an IMDb export `Title Type` label.
    pub fn from_title_type(title_type: &str) -> Result<Self, InputError> {
        match title_type.trim() {
            "Movie" | "TV Movie" | "TV Special" | "TV Short" | "Short" | "Video" => Ok(MediaKind::Movie),
            "TV Series" | "TV Mini Series" => Ok(MediaKind::Show),
            "TV Episode" => Ok(MediaKind::Episode),
            other => Err(InputError::UnknownTitleType(other.to_string())),
        }
    }

    /// Key used in Trakt bulk payloads and `/sync/*/<type>` paths
    pub fn plural(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movies",
            MediaKind::Show => "shows",
            MediaKind::Episode => "episodes",
        }
    }

    /// Value of the `type` query parameter on `/search`
    pub fn search_type(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
            MediaKind::Episode => "episode",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.search_type())
    }
}
