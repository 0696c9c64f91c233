use async_trait::async_trait;
use trakt_sync_models::{ImdbId, MediaKind, MutationBatch, RemoteItem, RemoteRating, SyncResponse, WatchingStatus};

use crate::error::TransportError;

/// Everything the sync engine needs from a Trakt account.
///
/// Methods take `&mut self` so a run can never have two requests in flight.
#[async_trait]
pub trait TraktService: Send {
    // Snapshots
    async fn watchlist(&mut self) -> Result<Vec<RemoteItem>, TransportError>;
    async fn ratings(&mut self, kind: Option<MediaKind>) -> Result<Vec<RemoteRating>, TransportError>;
    async fn history(&mut self, kind: Option<MediaKind>) -> Result<Vec<RemoteItem>, TransportError>;

    /// `None` when nothing is playing
    async fn watching(&mut self) -> Result<Option<WatchingStatus>, TransportError>;

    /// Whether Trakt knows a title with this IMDb id and kind
    async fn exists(&mut self, id: &ImdbId, kind: MediaKind) -> Result<bool, TransportError>;

    // Bulk mutations
    async fn add_to_watchlist(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError>;
    async fn remove_from_watchlist(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError>;
    async fn add_ratings(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError>;
    async fn add_history(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError>;
}
