pub mod apply;
pub mod diff;
pub mod reconcile;
pub mod sync;

#[cfg(test)]
mod testing;

pub use apply::{apply, ApplyMode, MutationKind, MutationSummary};
pub use reconcile::{effective_timestamp, HistoryPlan, PendingMutations, RatingsPlan, WatchlistPlan};
pub use sync::{
    load_feeds, DomainReport, FeedSources, LocalFeeds, SyncDomain, SyncError, SyncOptions, SyncReport, SyncRunner,
};
