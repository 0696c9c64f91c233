use thiserror::Error;
use trakt_sync_models::InputError;

/// Failure talking to the Trakt API. Aborts the sync command in flight.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("{method} {url} failed: {source}")]
    Network {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    /// HTTP status for `Status` errors
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Problems with an IMDb export feed. All of them are input-validation
/// failures: the run stops before anything is sent to Trakt.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("row {row}: {source}")]
    Input {
        row: usize,
        #[source]
        source: InputError,
    },

    #[error("missing required column '{column}' (available: {available:?})")]
    MissingColumn { column: String, available: Vec<String> },

    #[error("row {row}: failed to parse date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate { row: usize, value: String },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read feed: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to download feed {url}: {reason}")]
    Fetch { url: String, reason: String },
}
