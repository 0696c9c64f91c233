use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};
use trakt_sync_models::{ImdbId, MediaKind, MutationBatch, RemoteItem, RemoteRating, SyncResponse, WatchingStatus};

use crate::error::TransportError;
use crate::trakt::http::TraktHttp;
use crate::trakt::pagination::Paginator;

pub const WATCHLIST_PATH: &str = "/sync/watchlist";
pub const WATCHLIST_REMOVE_PATH: &str = "/sync/watchlist/remove";
pub const RATINGS_PATH: &str = "/sync/ratings";
pub const HISTORY_PATH: &str = "/sync/history";
pub const WATCHING_PATH: &str = "/users/me/watching";

/// How list endpoints are read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: u32,
    pub paginate: bool,
}

fn kind_path(base: &str, kind: Option<MediaKind>) -> String {
    match kind {
        Some(kind) => format!("{}/{}", base, kind.plural()),
        None => base.to_string(),
    }
}

fn search_path(id: &ImdbId) -> String {
    format!("/search/imdb/{}", urlencoding::encode(id.as_str()))
}

async fn fetch_list(http: &mut TraktHttp, path: &str, options: ListOptions) -> Result<Vec<Value>, TransportError> {
    let paginator = if options.paginate {
        Paginator::new(http, Method::GET, path, options.page_size)
    } else {
        Paginator::unpaginated(http, Method::GET, path)
    };
    paginator.collect_all().await
}

fn decode_items(path: &str, values: Vec<Value>) -> Vec<RemoteItem> {
    let total = values.len();
    let items: Vec<RemoteItem> = values.into_iter().filter_map(RemoteItem::from_value).collect();
    if items.len() < total {
        debug!(path, dropped = total - items.len(), "Skipped items of unsupported type");
    }
    items
}

/// Fetch the full watchlist
pub async fn get_watchlist(http: &mut TraktHttp, options: ListOptions) -> Result<Vec<RemoteItem>, TransportError> {
    let values = fetch_list(http, WATCHLIST_PATH, options).await?;
    Ok(decode_items(WATCHLIST_PATH, values))
}

/// Fetch ratings, optionally restricted to one kind
pub async fn get_ratings(
    http: &mut TraktHttp,
    kind: Option<MediaKind>,
    options: ListOptions,
) -> Result<Vec<RemoteRating>, TransportError> {
    let path = kind_path(RATINGS_PATH, kind);
    let values = fetch_list(http, &path, options).await?;
    Ok(values.into_iter().filter_map(RemoteRating::from_value).collect())
}

/// Fetch watch history, optionally restricted to one kind
pub async fn get_history(
    http: &mut TraktHttp,
    kind: Option<MediaKind>,
    options: ListOptions,
) -> Result<Vec<RemoteItem>, TransportError> {
    let path = kind_path(HISTORY_PATH, kind);
    let values = fetch_list(http, &path, options).await?;
    Ok(decode_items(&path, values))
}

/// What the account is playing right now. 204 means nothing.
pub async fn get_watching(http: &mut TraktHttp) -> Result<Option<WatchingStatus>, TransportError> {
    let response = http.get(WATCHING_PATH, &[]).await?;
    if response.is_no_content() {
        return Ok(None);
    }

    let value: Value = response.json()?;
    let status = WatchingStatus::from_value(value);
    if status.is_none() {
        warn!("Could not identify the title currently being watched");
    }
    Ok(status)
}

/// Look an IMDb id up on Trakt, restricted to one kind
pub async fn search_imdb(http: &mut TraktHttp, id: &ImdbId, kind: MediaKind) -> Result<bool, TransportError> {
    let response = http
        .get(&search_path(id), &[("type", kind.search_type().to_string())])
        .await?;
    if response.is_no_content() {
        return Ok(false);
    }

    let results: Vec<Value> = response.json()?;
    Ok(!results.is_empty())
}

async fn post_batch(http: &mut TraktHttp, path: &str, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
    let response = http.post(path, batch).await?;
    if response.is_no_content() {
        return Ok(SyncResponse::default());
    }
    response.json()
}

pub async fn add_to_watchlist(http: &mut TraktHttp, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
    post_batch(http, WATCHLIST_PATH, batch).await
}

pub async fn remove_from_watchlist(http: &mut TraktHttp, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
    post_batch(http, WATCHLIST_REMOVE_PATH, batch).await
}

pub async fn add_ratings(http: &mut TraktHttp, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
    post_batch(http, RATINGS_PATH, batch).await
}

pub async fn add_history(http: &mut TraktHttp, batch: &MutationBatch) -> Result<SyncResponse, TransportError> {
    post_batch(http, HISTORY_PATH, batch).await
}
