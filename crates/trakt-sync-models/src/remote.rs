use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::imdb_id::ImdbId;
use crate::media::MediaKind;
use crate::rating::RemoteRating;

#[derive(Debug, Default, Deserialize)]
struct TraktIds {
    #[serde(default)]
    imdb: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TraktMedia {
    #[serde(default)]
    ids: TraktIds,
}

impl TraktMedia {
    fn imdb_id(&self) -> Option<ImdbId> {
        self.ids.imdb.as_deref().and_then(|raw| ImdbId::parse(raw).ok())
    }
}

// Trakt list items carry a `type` string naming which sibling field holds the payload
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum TaggedItem {
    Movie {
        movie: TraktMedia,
    },
    Show {
        show: TraktMedia,
    },
    Season {
        season: TraktMedia,
    },
    Episode {
        episode: TraktMedia,
        #[serde(default)]
        show: Option<TraktMedia>,
    },
}

/// One item of a Trakt list snapshot (watchlist, history, ratings, watching).
///
/// The `type` dispatch happens once, at decode time. Every variant keeps only
/// the IMDb id of its own payload; episodes also remember their show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RemoteItem {
    Movie { id: Option<ImdbId> },
    Show { id: Option<ImdbId> },
    Season { id: Option<ImdbId> },
    Episode { id: Option<ImdbId>, show: Option<ImdbId> },
}

impl From<TaggedItem> for RemoteItem {
    fn from(item: TaggedItem) -> Self {
        match item {
            TaggedItem::Movie { movie } => RemoteItem::Movie { id: movie.imdb_id() },
            TaggedItem::Show { show } => RemoteItem::Show { id: show.imdb_id() },
            TaggedItem::Season { season } => RemoteItem::Season { id: season.imdb_id() },
            TaggedItem::Episode { episode, show } => RemoteItem::Episode {
                id: episode.imdb_id(),
                show: show.and_then(|s| s.imdb_id()),
            },
        }
    }
}

impl RemoteItem {
    /// Decode a raw Trakt item. Unknown `type` values (people, lists) yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value::<TaggedItem>(value).ok().map(RemoteItem::from)
    }

    pub fn imdb_id(&self) -> Option<&ImdbId> {
        match self {
            RemoteItem::Movie { id }
            | RemoteItem::Show { id }
            | RemoteItem::Season { id }
            | RemoteItem::Episode { id, .. } => id.as_ref(),
        }
    }

    /// Seasons have no IMDb-side counterpart
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self {
            RemoteItem::Movie { .. } => Some(MediaKind::Movie),
            RemoteItem::Show { .. } => Some(MediaKind::Show),
            RemoteItem::Season { .. } => None,
            RemoteItem::Episode { .. } => Some(MediaKind::Episode),
        }
    }

    pub fn parent_show(&self) -> Option<&ImdbId> {
        match self {
            RemoteItem::Episode { show, .. } => show.as_ref(),
            _ => None,
        }
    }

    /// `(id, kind)` when both resolve
    pub fn resolved(&self) -> Option<(ImdbId, MediaKind)> {
        Some((self.imdb_id()?.clone(), self.media_kind()?))
    }
}

#[derive(Debug, Deserialize)]
struct RatingFields {
    rating: u8,
    rated_at: DateTime<Utc>,
}

impl RemoteRating {
    /// Decode one `/sync/ratings` item. Items without a resolvable id are dropped.
    pub fn from_value(value: Value) -> Option<Self> {
        let fields: RatingFields = serde_json::from_value(value.clone()).ok()?;
        let (id, kind) = RemoteItem::from_value(value)?.resolved()?;
        Some(RemoteRating {
            id,
            kind,
            rating: fields.rating,
            rated_at: fields.rated_at,
        })
    }
}

/// What the account is playing right now
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchingStatus {
    pub kind: MediaKind,
    pub id: ImdbId,
}

impl WatchingStatus {
    /// Decode a `/users/me/watching` body
    pub fn from_value(value: Value) -> Option<Self> {
        let (id, kind) = RemoteItem::from_value(value)?.resolved()?;
        Some(Self { kind, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_movie_item() {
        let item = RemoteItem::from_value(json!({
            "rank": 1,
            "listed_at": "2024-01-01T00:00:00.000Z",
            "type": "movie",
            "movie": {"title": "The Matrix", "year": 1999, "ids": {"trakt": 481, "imdb": "tt0133093"}}
        }))
        .unwrap();

        assert_eq!(item.media_kind(), Some(MediaKind::Movie));
        assert_eq!(item.imdb_id().unwrap().as_str(), "tt0133093");
    }

    #[test]
    fn test_decode_episode_keeps_show() {
        let item = RemoteItem::from_value(json!({
            "type": "episode",
            "episode": {"season": 1, "number": 1, "ids": {"imdb": "tt1480055"}},
            "show": {"title": "Game of Thrones", "ids": {"imdb": "tt0944947"}}
        }))
        .unwrap();

        assert_eq!(item.imdb_id().unwrap().as_str(), "tt1480055");
        assert_eq!(item.parent_show().unwrap().as_str(), "tt0944947");
    }

    #[test]
    fn test_decode_season_has_no_kind() {
        let item = RemoteItem::from_value(json!({
            "type": "season",
            "season": {"number": 1, "ids": {"trakt": 1}},
            "show": {"ids": {"imdb": "tt0944947"}}
        }))
        .unwrap();

        assert_eq!(item.media_kind(), None);
        assert_eq!(item.imdb_id(), None);
        assert!(item.resolved().is_none());
    }

    #[test]
    fn test_decode_unresolvable_items() {
        assert!(RemoteItem::from_value(json!({"type": "person", "person": {}})).is_none());
        assert!(RemoteItem::from_value(json!({"listed_at": "2024-01-01"})).is_none());

        let missing_id = RemoteItem::from_value(json!({
            "type": "show",
            "show": {"ids": {"trakt": 1, "imdb": null}}
        }))
        .unwrap();
        assert!(missing_id.resolved().is_none());
    }

    #[test]
    fn test_decode_remote_rating() {
        let rating = RemoteRating::from_value(json!({
            "rated_at": "2023-05-04T12:00:00.000Z",
            "rating": 7,
            "type": "movie",
            "movie": {"ids": {"imdb": "tt0111161"}}
        }))
        .unwrap();

        assert_eq!(rating.id.as_str(), "tt0111161");
        assert_eq!(rating.kind, MediaKind::Movie);
        assert_eq!(rating.rating, 7);
    }

    #[test]
    fn test_decode_watching_status() {
        let status = WatchingStatus::from_value(json!({
            "expires_at": "2024-01-01T01:00:00.000Z",
            "action": "scrobble",
            "type": "movie",
            "movie": {"ids": {"imdb": "tt0133093"}}
        }))
        .unwrap();

        assert_eq!(status.kind, MediaKind::Movie);
        assert_eq!(status.id.as_str(), "tt0133093");
    }
}
