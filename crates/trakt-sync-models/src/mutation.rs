use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;

use crate::imdb_id::ImdbId;
use crate::media::MediaKind;

/// Trakt accepts second-precision UTC timestamps with a `Z` suffix.
pub fn format_timestamp(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

fn serialize_timestamp<S: Serializer>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(ts) => serializer.serialize_str(&format_timestamp(ts)),
        None => serializer.serialize_none(),
    }
}

/// Identifier sets partitioned by kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KindSets {
    pub movies: HashSet<ImdbId>,
    pub shows: HashSet<ImdbId>,
    pub episodes: HashSet<ImdbId>,
}

impl KindSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: MediaKind) -> &HashSet<ImdbId> {
        match kind {
            MediaKind::Movie => &self.movies,
            MediaKind::Show => &self.shows,
            MediaKind::Episode => &self.episodes,
        }
    }

    fn get_mut(&mut self, kind: MediaKind) -> &mut HashSet<ImdbId> {
        match kind {
            MediaKind::Movie => &mut self.movies,
            MediaKind::Show => &mut self.shows,
            MediaKind::Episode => &mut self.episodes,
        }
    }

    pub fn insert(&mut self, kind: MediaKind, id: ImdbId) -> bool {
        self.get_mut(kind).insert(id)
    }

    pub fn contains(&self, kind: MediaKind, id: &ImdbId) -> bool {
        self.get(kind).contains(id)
    }

    /// Remove `id` from whichever kinds hold it
    pub fn remove(&mut self, id: &ImdbId) -> bool {
        let mut removed = false;
        for kind in MediaKind::ALL {
            removed |= self.get_mut(kind).remove(id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.movies.len() + self.shows.len() + self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Per-kind `self - other`
    pub fn difference(&self, other: &KindSets) -> KindSets {
        let mut out = KindSets::new();
        for kind in MediaKind::ALL {
            out.get_mut(kind)
                .extend(self.get(kind).difference(other.get(kind)).cloned());
        }
        out
    }

    pub fn iter(&self) -> impl Iterator<Item = (MediaKind, &ImdbId)> + '_ {
        MediaKind::ALL
            .into_iter()
            .flat_map(move |kind| self.get(kind).iter().map(move |id| (kind, id)))
    }

    /// Id-only batch, sorted so payloads are stable between runs
    pub fn to_batch(&self) -> MutationBatch {
        let mut batch = MutationBatch::default();
        for kind in MediaKind::ALL {
            let mut ids: Vec<&ImdbId> = self.get(kind).iter().collect();
            ids.sort();
            for id in ids {
                batch.push(kind, BatchItem::new(id.clone()));
            }
        }
        batch
    }
}

impl FromIterator<(MediaKind, ImdbId)> for KindSets {
    fn from_iter<I: IntoIterator<Item = (MediaKind, ImdbId)>>(iter: I) -> Self {
        let mut sets = KindSets::new();
        for (kind, id) in iter {
            sets.insert(kind, id);
        }
        sets
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchIds {
    pub imdb: ImdbId,
}

/// One element of a bulk sync payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchItem {
    pub ids: BatchIds,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "serialize_timestamp")]
    pub rated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "serialize_timestamp")]
    pub watched_at: Option<DateTime<Utc>>,
}

impl BatchItem {
    pub fn new(id: ImdbId) -> Self {
        Self {
            ids: BatchIds { imdb: id },
            rating: None,
            rated_at: None,
            watched_at: None,
        }
    }

    pub fn rated(id: ImdbId, rating: u8, rated_at: DateTime<Utc>) -> Self {
        Self {
            rating: Some(rating),
            rated_at: Some(rated_at),
            ..Self::new(id)
        }
    }

    pub fn watched(id: ImdbId, watched_at: Option<DateTime<Utc>>) -> Self {
        Self {
            watched_at,
            ..Self::new(id)
        }
    }

    pub fn id(&self) -> &ImdbId {
        &self.ids.imdb
    }
}

/// Body of a bulk `/sync/*` POST
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MutationBatch {
    #[serde(default)]
    pub movies: Vec<BatchItem>,
    #[serde(default)]
    pub shows: Vec<BatchItem>,
    #[serde(default)]
    pub episodes: Vec<BatchItem>,
}

impl MutationBatch {
    pub fn push(&mut self, kind: MediaKind, item: BatchItem) {
        match kind {
            MediaKind::Movie => self.movies.push(item),
            MediaKind::Show => self.shows.push(item),
            MediaKind::Episode => self.episodes.push(item),
        }
    }

    pub fn items(&self, kind: MediaKind) -> &[BatchItem] {
        match kind {
            MediaKind::Movie => &self.movies,
            MediaKind::Show => &self.shows,
            MediaKind::Episode => &self.episodes,
        }
    }

    pub fn len(&self) -> usize {
        self.movies.len() + self.shows.len() + self.episodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn counts(&self) -> KindCounts {
        KindCounts {
            movies: self.movies.len() as u32,
            shows: self.shows.len() as u32,
            seasons: 0,
            episodes: self.episodes.len() as u32,
        }
    }
}

/// Per-kind tally as returned by the bulk endpoints
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KindCounts {
    #[serde(default)]
    pub movies: u32,
    #[serde(default)]
    pub shows: u32,
    #[serde(default)]
    pub seasons: u32,
    #[serde(default)]
    pub episodes: u32,
}

impl KindCounts {
    pub fn total(&self) -> u32 {
        self.movies + self.shows + self.seasons + self.episodes
    }

    /// Non-zero entries as `(label, count)`
    pub fn non_zero(&self) -> Vec<(&'static str, u32)> {
        [
            ("movies", self.movies),
            ("shows", self.shows),
            ("seasons", self.seasons),
            ("episodes", self.episodes),
        ]
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotFoundIds {
    #[serde(default)]
    pub imdb: Option<String>,
    #[serde(default)]
    pub trakt: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotFoundItem {
    #[serde(default)]
    pub ids: NotFoundIds,
}

impl NotFoundItem {
    pub fn label(&self) -> String {
        match (&self.ids.imdb, self.ids.trakt) {
            (Some(imdb), _) => imdb.clone(),
            (None, Some(trakt)) => format!("trakt:{}", trakt),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotFound {
    #[serde(default)]
    pub movies: Vec<NotFoundItem>,
    #[serde(default)]
    pub shows: Vec<NotFoundItem>,
    #[serde(default)]
    pub seasons: Vec<NotFoundItem>,
    #[serde(default)]
    pub episodes: Vec<NotFoundItem>,
}

impl NotFound {
    /// `(kind label, item)` for every entry
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &NotFoundItem)> + '_ {
        self.movies
            .iter()
            .map(|i| ("movie", i))
            .chain(self.shows.iter().map(|i| ("show", i)))
            .chain(self.seasons.iter().map(|i| ("season", i)))
            .chain(self.episodes.iter().map(|i| ("episode", i)))
    }
}

/// Tallies returned by `/sync/watchlist`, `/sync/watchlist/remove`,
/// `/sync/ratings` and `/sync/history`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncResponse {
    #[serde(default)]
    pub added: Option<KindCounts>,
    #[serde(default)]
    pub existing: Option<KindCounts>,
    #[serde(default)]
    pub deleted: Option<KindCounts>,
    #[serde(default)]
    pub not_found: NotFound,
}
