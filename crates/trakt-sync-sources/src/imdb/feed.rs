use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use trakt_sync_models::{HistoryEntry, RatingEntry, WatchlistEntry};

use crate::error::FeedError;
use crate::imdb::parser::{self, TitleTypePolicy};

/// Where an IMDb export comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedSource {
    Url(String),
    Path(PathBuf),
}

impl FeedSource {
    /// `http(s)://` locations are downloaded, anything else is a local path
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            FeedSource::Url(raw.to_string())
        } else {
            FeedSource::Path(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for FeedSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedSource::Url(url) => f.write_str(url),
            FeedSource::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Downloads or reads IMDb exports and decodes them
#[derive(Debug, Clone)]
pub struct FeedReader {
    client: reqwest::Client,
    policy: TitleTypePolicy,
}

impl FeedReader {
    pub fn new(policy: TitleTypePolicy, timeout: Option<Duration>) -> Result<Self, FeedError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(FeedError::Client)?;
        Ok(Self { client, policy })
    }

    /// Raw body of a feed. URLs get a plain unauthenticated GET.
    pub async fn fetch(&self, source: &FeedSource) -> Result<Vec<u8>, FeedError> {
        match source {
            FeedSource::Path(path) => {
                tracing::debug!(path = %path.display(), "Reading feed from disk");
                Ok(tokio::fs::read(path).await?)
            }
            FeedSource::Url(url) => {
                tracing::debug!(url = %url, "Downloading feed");
                let fetch_error = |reason: String| FeedError::Fetch {
                    url: url.clone(),
                    reason,
                };

                let response = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| fetch_error(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(fetch_error(format!("HTTP {}", status)));
                }
                let body = response.bytes().await.map_err(|e| fetch_error(e.to_string()))?;
                tracing::debug!(url = %url, bytes = body.len(), "Downloaded feed");
                Ok(body.to_vec())
            }
        }
    }

    pub async fn watchlist(&self, source: &FeedSource) -> Result<Vec<WatchlistEntry>, FeedError> {
        let body = self.fetch(source).await?;
        parser::parse_watchlist(body.as_slice(), self.policy)
    }

    pub async fn ratings(&self, source: &FeedSource) -> Result<Vec<RatingEntry>, FeedError> {
        let body = self.fetch(source).await?;
        parser::parse_ratings(body.as_slice(), self.policy)
    }

    pub async fn history(&self, source: &FeedSource) -> Result<Vec<HistoryEntry>, FeedError> {
        let body = self.fetch(source).await?;
        parser::parse_history(body.as_slice(), self.policy)
    }
}
