use serde::Serialize;
use std::fmt;
use tracing::{info, warn};
use trakt_sync_models::{KindCounts, MediaKind, MutationBatch, SyncResponse};
use trakt_sync_sources::{TraktService, TransportError};

/// The four bulk endpoints a sync can call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MutationKind {
    WatchlistAdd,
    WatchlistRemove,
    RatingsAdd,
    HistoryAdd,
}

impl MutationKind {
    fn verb(&self) -> &'static str {
        match self {
            MutationKind::WatchlistRemove => "remove",
            _ => "add",
        }
    }

    fn target(&self) -> &'static str {
        match self {
            MutationKind::WatchlistAdd => "to watchlist",
            MutationKind::WatchlistRemove => "from watchlist",
            MutationKind::RatingsAdd => "to ratings",
            MutationKind::HistoryAdd => "to history",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.verb(), self.target())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplyMode {
    #[default]
    Live,
    DryRun,
}

/// Result of one bulk call, or of the call a dry run skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationSummary {
    pub mutation: MutationKind,
    pub submitted: KindCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added: Option<KindCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing: Option<KindCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<KindCounts>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub not_found: Vec<String>,
    pub dry_run: bool,
}

impl MutationSummary {
    fn empty(mutation: MutationKind, dry_run: bool) -> Self {
        Self {
            mutation,
            submitted: KindCounts::default(),
            added: None,
            existing: None,
            deleted: None,
            not_found: Vec::new(),
            dry_run,
        }
    }

    /// Entries Trakt reports as changed (added for adds, deleted for removals)
    pub fn applied(&self) -> u32 {
        match self.mutation {
            MutationKind::WatchlistRemove => self.deleted.map(|c| c.total()).unwrap_or(0),
            _ => self.added.map(|c| c.total()).unwrap_or(0),
        }
    }
}

async fn send<S: TraktService + ?Sized>(
    service: &mut S,
    mutation: MutationKind,
    batch: &MutationBatch,
) -> Result<SyncResponse, TransportError> {
    match mutation {
        MutationKind::WatchlistAdd => service.add_to_watchlist(batch).await,
        MutationKind::WatchlistRemove => service.remove_from_watchlist(batch).await,
        MutationKind::RatingsAdd => service.add_ratings(batch).await,
        MutationKind::HistoryAdd => service.add_history(batch).await,
    }
}

fn log_tally(mutation: MutationKind, label: &str, counts: Option<KindCounts>) {
    if let Some(counts) = counts {
        for (kind, count) in counts.non_zero() {
            info!(mutation = %mutation, "{} {} {}", count, kind, label);
        }
    }
}

/// Submit `batch` through the endpoint for `mutation`.
///
/// An empty batch is never sent. In dry-run mode nothing is sent either; the
/// would-be submission is logged per kind instead.
pub async fn apply<S: TraktService + ?Sized>(
    service: &mut S,
    mutation: MutationKind,
    batch: &MutationBatch,
    mode: ApplyMode,
) -> Result<MutationSummary, TransportError> {
    let dry_run = mode == ApplyMode::DryRun;
    if batch.is_empty() {
        return Ok(MutationSummary::empty(mutation, dry_run));
    }

    let mut summary = MutationSummary {
        submitted: batch.counts(),
        ..MutationSummary::empty(mutation, dry_run)
    };

    if dry_run {
        for kind in MediaKind::ALL {
            let count = batch.items(kind).len();
            if count > 0 {
                info!(
                    "[dry-run] would {} {} {} {}",
                    mutation.verb(),
                    count,
                    kind.plural(),
                    mutation.target()
                );
            }
        }
        return Ok(summary);
    }

    info!(mutation = %mutation, items = batch.len(), "Submitting batch");
    let response = send(service, mutation, batch).await?;

    log_tally(mutation, "added", response.added);
    log_tally(mutation, "already present", response.existing);
    log_tally(mutation, "deleted", response.deleted);
    for (kind, item) in response.not_found.entries() {
        warn!(mutation = %mutation, kind, imdb_id = %item.label(), "Trakt could not find item");
    }

    summary.added = response.added;
    summary.existing = response.existing;
    summary.deleted = response.deleted;
    summary.not_found = response.not_found.entries().map(|(_, item)| item.label()).collect();
    Ok(summary)
}
