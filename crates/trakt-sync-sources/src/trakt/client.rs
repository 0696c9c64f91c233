use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use trakt_sync_models::{ImdbId, MediaKind, MutationBatch, RemoteItem, RemoteRating, SyncResponse, WatchingStatus};

use crate::error::TransportError;
use crate::traits::TraktService;
use crate::trakt::api::{self, ListOptions};
use crate::trakt::http::{TraktCredentials, TraktHttp};
use crate::trakt::pacing::{PacingStrategy, RateLimiter, TokioClock};
use crate::trakt::pagination::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone)]
pub struct TraktClientOptions {
    pub base_url: String,
    pub pacing: PacingStrategy,
    pub timeout: Option<Duration>,
    pub page_size: u32,
    pub paginate: bool,
}

impl Default for TraktClientOptions {
    fn default() -> Self {
        Self {
            base_url: crate::trakt::http::DEFAULT_BASE_URL.to_string(),
            pacing: PacingStrategy::default(),
            timeout: Some(Duration::from_secs(30)),
            page_size: DEFAULT_PAGE_SIZE,
            paginate: true,
        }
    }
}

pub struct TraktClient {
    http: TraktHttp,
    list: ListOptions,
}

impl TraktClient {
    pub fn new(credentials: TraktCredentials, options: TraktClientOptions) -> Result<Self, TransportError> {
        let limiter = RateLimiter::new(options.pacing, Arc::new(TokioClock));
        let http = TraktHttp::new(options.base_url, credentials, options.timeout, limiter)?;
        info!(base_url = http.base_url(), pacing = ?options.pacing, "Trakt client ready");
        Ok(Self::from_http(
            http,
            ListOptions {
                page_size: options.page_size,
                paginate: options.paginate,
            },
        ))
    }

    /// Wrap an already configured transport
    pub fn from_http(http: TraktHttp, list: ListOptions) -> Self {
        Self { http, list }
    }
}

#[async_trait]
impl TraktService for TraktClient {
    async fn watchlist(&mut self) -> Result<Vec<RemoteItem>, TransportError> {
        let items = api::get_watchlist(&mut self.http, self.list).await?;
        debug!(count = items.len(), "Fetched Trakt watchlist");
        Ok(items)
    }

    async fn ratings(&mut self, kind: Option<MediaKind>) -> Result<Vec<RemoteRating>, TransportError> {
        let ratings = api::get_ratings(&mut self.http, kind, self.list).await?;
        debug!(count = ratings.len(), "Fetched Trakt ratings");
        Ok(ratings)
    }

    async fn history(&mut self, kind: Option<MediaKind>) -> Result<Vec<RemoteItem>, TransportError> {
        let items = api::get_history(&mut self.http, kind, self.list).await?;
        debug!(count = items.len(), "Fetched Trakt history");
        Ok(items)
    }

    async fn watching(&mut self) -> Result<Option<WatchingStatus>, TransportError> {
        api::get_watching(&mut self.http).await
    }

    async fn exists(&mut self, id: &ImdbId, kind: MediaKind) -> Result<bool, TransportError> {
        api::search_imdb(&mut self.http, id, kind).await
    }

    async fn add_to_watchlist(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
        api::add_to_watchlist(&mut self.http, batch).await
    }

    async fn remove_from_watchlist(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
        api::remove_from_watchlist(&mut self.http, batch).await
    }

    async fn add_ratings(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
        api::add_ratings(&mut self.http, batch).await
    }

    async fn add_history(&mut self, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
        api::add_history(&mut self.http, batch).await
    }
}
