// In-memory Trakt account for engine tests

use async_trait::async_trait;
use std::collections::HashSet;
use trakt_sync_models::{
    ImdbId, KindCounts, MediaKind, MutationBatch, NotFound, NotFoundItem, RemoteItem, RemoteRating, SyncResponse,
    WatchingStatus,
};
use trakt_sync_sources::{TraktService, TransportError};

use crate::apply::MutationKind;

#[derive(Default)]
pub(crate) struct FakeTrakt {
    pub watchlist: Vec<RemoteItem>,
    pub ratings: Vec<RemoteRating>,
    pub history: Vec<RemoteItem>,
    pub watching: Option<WatchingStatus>,
    /// Ids Trakt does not know: `exists` says no and mutations report them not found
    pub unknown: HashSet<ImdbId>,
    /// Endpoint name that answers with a 500
    pub fail_on: Option<&'static str>,
    pub calls: Vec<&'static str>,
    pub posts: Vec<(MutationKind, MutationBatch)>,
}

impl FakeTrakt {
    fn call(&mut self, name: &'static str) -> Result<(), TransportError> {
        self.calls.push(name);
        if self.fail_on == Some(name) {
            return Err(TransportError::Status {
                method: "GET".to_string(),
                url: format!("https://api.trakt.tv/{}", name),
                status: 500,
                body: "boom".to_string(),
            });
        }
        Ok(())
    }

    fn respond(&mut self, mutation: MutationKind, batch: &MutationBatch) -> SyncResponse {
        self.posts.push((mutation, batch.clone()));

        let mut counts = KindCounts::default();
        let mut not_found = NotFound::default();
        for kind in MediaKind::ALL {
            for item in batch.items(kind) {
                let missing = NotFoundItem {
                    ids: trakt_sync_models::mutation::NotFoundIds {
                        imdb: Some(item.id().to_string()),
                        trakt: None,
                    },
                };
                match (kind, self.unknown.contains(item.id())) {
                    (MediaKind::Movie, true) => not_found.movies.push(missing),
                    (MediaKind::Show, true) => not_found.shows.push(missing),
                    (MediaKind::Episode, true) => not_found.episodes.push(missing),
                    (MediaKind::Movie, false) => counts.movies += 1,
                    (MediaKind::Show, false) => counts.shows += 1,
                    (MediaKind::Episode, false) => counts.episodes += 1,
                }
            }
        }

        let mut response = SyncResponse {
            not_found,
            ..SyncResponse::default()
        };
        if mutation == MutationKind::WatchlistRemove {
            response.deleted = Some(counts);
        } else {
            response.added = Some(counts);
        }
        response
    }

    pub fn posted(&self, mutation: MutationKind) -> Option<&MutationBatch> {
        self.posts.iter().find(|(m, _)| *m == mutation).map(|(_, batch)| batch)
    }
}

#[async_trait]
impl TraktService for FakeTrakt {
    async fn watchlist(&mut self) -> Result<Vec<RemoteItem>, TransportError> {
        self.call("watchlist")?;
        Ok(self.watchlist.clone())
    }

    async fn ratings(&mut self, _kind: Option<MediaKind>) -> Result<Vec<RemoteRating>, TransportError> {
        self.call("ratings")?;
        Ok(self.ratings.clone())
    }

    async fn history(&mut self, _kind: Option<MediaKind>) -> Result<Vec<RemoteItem>, TransportError> {
        self.call("history")?;
        Ok(self.history.clone())
    }

    async fn watching(&mut self) -> Result<Option<WatchingStatus>, TransportError> {
        self.call("watching")?;
        Ok(self.watching.clone())
    }

    async fn exists(&mut self, id: &ImdbId, _kind: MediaKind) -> Result<bool, TransportError> {
        self.call("exists")?;
        Ok(!self.unknown.contains(id))
    }

    async fn add_to_watchlist(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
        self.call("add_to_watchlist")?;
        Ok(self.respond(MutationKind::WatchlistAdd, batch))
    }

    async fn remove_from_watchlist(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
        self.call("remove_from_watchlist")?;
        Ok(self.respond(MutationKind::WatchlistRemove, batch))
    }

    async fn add_ratings(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
        self.call("add_ratings")?;
        Ok(self.respond(MutationKind::RatingsAdd, batch))
    }

    async fn add_history(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
        self.call("add_history")?;
        Ok(self.respond(MutationKind::HistoryAdd, batch))
    }
}
