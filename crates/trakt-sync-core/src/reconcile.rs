//! Turns a local feed plus a Trakt snapshot into the mutations that would
//! make Trakt match the feed.
//!
//! Plans are plain data. Watching exclusion and the existence check operate
//! on any plan through [`PendingMutations`].

use chrono::{DateTime, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use trakt_sync_models::{
    BatchItem, HistoryEntry, ImdbId, KindSets, MediaKind, MutationBatch, RatingEntry, RemoteItem, RemoteRating,
    WatchingStatus, WatchlistEntry,
};
use trakt_sync_sources::{TraktService, TransportError};

use crate::diff::{classify_ratings, diff_sets, remote_only_ratings, remote_sets, RatingChange};

/// Timestamp sent for something that happened on `date`: the last second of
/// that day in `tz`, but never later than `now`.
pub fn effective_timestamp_in<Tz: TimeZone>(date: NaiveDate, now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let end_of_day = date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default());
    let local = tz
        .from_local_datetime(&end_of_day)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&end_of_day));
    local.min(now)
}

/// [`effective_timestamp_in`] for the machine's local timezone
pub fn effective_timestamp(date: NaiveDate, now: DateTime<Utc>) -> DateTime<Utc> {
    effective_timestamp_in(date, now, &Local)
}

/// A plan whose pending ids can be withdrawn before anything is sent
pub trait PendingMutations {
    /// Withdraw `id` from every add and remove set. Returns whether it was pending.
    fn withdraw(&mut self, id: &ImdbId) -> bool;

    /// Withdraw `id` from the add sets only
    fn withdraw_add(&mut self, id: &ImdbId) -> bool;

    /// Pending adds whose title may be unknown to Trakt, sorted by id
    fn unverified_adds(&self) -> Vec<(ImdbId, MediaKind)>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchlistPlan {
    pub add: KindSets,
    pub remove: KindSets,
}

impl WatchlistPlan {
    pub fn add_batch(&self) -> MutationBatch {
        self.add.to_batch()
    }

    pub fn remove_batch(&self) -> MutationBatch {
        self.remove.to_batch()
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }
}

fn sorted_pairs(sets: &KindSets) -> Vec<(ImdbId, MediaKind)> {
    let mut pairs: Vec<(ImdbId, MediaKind)> = sets.iter().map(|(kind, id)| (id.clone(), kind)).collect();
    pairs.sort();
    pairs
}

impl PendingMutations for WatchlistPlan {
    fn withdraw(&mut self, id: &ImdbId) -> bool {
        let added = self.add.remove(id);
        let removed = self.remove.remove(id);
        added || removed
    }

    fn withdraw_add(&mut self, id: &ImdbId) -> bool {
        self.add.remove(id)
    }

    fn unverified_adds(&self) -> Vec<(ImdbId, MediaKind)> {
        sorted_pairs(&self.add)
    }
}

/// One rating about to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatedItem {
    pub kind: MediaKind,
    pub rating: u8,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RatingsPlan {
    /// Not rated on Trakt yet
    pub new: HashMap<ImdbId, RatedItem>,
    /// Rated on Trakt with a different value
    pub updated: HashMap<ImdbId, RatedItem>,
    pub unchanged: usize,
    /// Rated on Trakt only; reported, never removed
    pub remote_only: KindSets,
}

fn rated_batch<'a>(items: impl Iterator<Item = (&'a ImdbId, &'a RatedItem)>) -> MutationBatch {
    let mut sorted: Vec<_> = items.collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let mut batch = MutationBatch::default();
    for (id, item) in sorted {
        batch.push(item.kind, BatchItem::rated(id.clone(), item.rating, item.rated_at));
    }
    batch
}

impl RatingsPlan {
    /// New and updated ratings go out through the same endpoint
    pub fn batch(&self) -> MutationBatch {
        rated_batch(self.new.iter().chain(self.updated.iter()))
    }

    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.updated.is_empty()
    }
}

impl PendingMutations for RatingsPlan {
    fn withdraw(&mut self, id: &ImdbId) -> bool {
        self.withdraw_add(id)
    }

    fn withdraw_add(&mut self, id: &ImdbId) -> bool {
        let new = self.new.remove(id).is_some();
        let updated = self.updated.remove(id).is_some();
        new || updated
    }

    fn unverified_adds(&self) -> Vec<(ImdbId, MediaKind)> {
        // updated ratings already exist on Trakt
        let mut pairs: Vec<(ImdbId, MediaKind)> = self.new.iter().map(|(id, item)| (id.clone(), item.kind)).collect();
        pairs.sort();
        pairs
    }
}

/// One history entry about to be submitted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchedItem {
    pub kind: MediaKind,
    pub watched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryPlan {
    pub add: HashMap<ImdbId, WatchedItem>,
    /// Watched on Trakt only; reported, never removed
    pub remote_only: KindSets,
}

impl HistoryPlan {
    pub fn batch(&self) -> MutationBatch {
        let mut sorted: Vec<_> = self.add.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let mut batch = MutationBatch::default();
        for (id, item) in sorted {
            batch.push(item.kind, BatchItem::watched(id.clone(), item.watched_at));
        }
        batch
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty()
    }
}

impl PendingMutations for HistoryPlan {
    fn withdraw(&mut self, id: &ImdbId) -> bool {
        self.withdraw_add(id)
    }

    fn withdraw_add(&mut self, id: &ImdbId) -> bool {
        self.add.remove(id).is_some()
    }

    fn unverified_adds(&self) -> Vec<(ImdbId, MediaKind)> {
        let mut pairs: Vec<(ImdbId, MediaKind)> = self.add.iter().map(|(id, item)| (id.clone(), item.kind)).collect();
        pairs.sort();
        pairs
    }
}

pub fn reconcile_watchlist(local: &[WatchlistEntry], remote: &[RemoteItem]) -> WatchlistPlan {
    let local_sets: KindSets = local.iter().map(|e| (e.kind, e.id.clone())).collect();
    let remote_sets = remote_sets(remote, false);
    let diff = diff_sets(&local_sets, &remote_sets);

    WatchlistPlan {
        add: diff.to_add,
        remove: diff.to_remove,
    }
}

pub fn reconcile_ratings(local: &[RatingEntry], remote: &[RemoteRating], now: DateTime<Utc>) -> RatingsPlan {
    let mut plan = RatingsPlan {
        remote_only: remote_only_ratings(local, remote),
        ..RatingsPlan::default()
    };

    for (entry, change) in classify_ratings(local, remote) {
        let item = RatedItem {
            kind: entry.kind,
            rating: entry.rating,
            rated_at: effective_timestamp(entry.rated_on, now),
        };
        match change {
            RatingChange::New => {
                plan.new.insert(entry.id.clone(), item);
            }
            RatingChange::Updated { previous } => {
                debug!(imdb_id = %entry.id, previous, rating = entry.rating, "Rating changed");
                plan.updated.insert(entry.id.clone(), item);
            }
            RatingChange::Unchanged => plan.unchanged += 1,
        }
    }

    plan
}

/// Titles present locally but absent from Trakt history.
///
/// Watching an episode counts as having the show in history.
pub fn reconcile_history(local: &[HistoryEntry], remote: &[RemoteItem], now: DateTime<Utc>) -> HistoryPlan {
    let local_sets: KindSets = local.iter().map(|e| (e.kind, e.id.clone())).collect();
    let remote_sets = remote_sets(remote, true);
    let diff = diff_sets(&local_sets, &remote_sets);

    let mut add = HashMap::new();
    for entry in local {
        if !diff.to_add.contains(entry.kind, &entry.id) {
            continue;
        }
        let watched_at = entry.watched_on.map(|date| effective_timestamp(date, now));
        // Keep the earliest date when the feed lists a title twice
        add.entry(entry.id.clone())
            .and_modify(|existing: &mut WatchedItem| {
                if let Some(at) = watched_at {
                    existing.watched_at = Some(existing.watched_at.map_or(at, |prev| prev.min(at)));
                }
            })
            .or_insert(WatchedItem {
                kind: entry.kind,
                watched_at,
            });
    }

    HistoryPlan {
        add,
        remote_only: diff.to_remove,
    }
}

/// Withdraw whatever is playing right now from the plan. Returns how many
/// pending entries were withdrawn (0 or 1).
pub fn exclude_watching<P: PendingMutations>(plan: &mut P, watching: Option<&WatchingStatus>) -> usize {
    let Some(status) = watching else {
        return 0;
    };
    if plan.withdraw(&status.id) {
        warn!(imdb_id = %status.id, kind = %status.kind, "Currently watching, leaving it untouched this run");
        1
    } else {
        0
    }
}

/// Look up every unverified add and drop the ones Trakt does not know.
/// Returns the number of dropped ids.
pub async fn filter_unknown<S, P>(service: &mut S, plan: &mut P) -> Result<usize, TransportError>
where
    S: TraktService + ?Sized,
    P: PendingMutations,
{
    let mut dropped = 0;
    for (id, kind) in plan.unverified_adds() {
        if !service.exists(&id, kind).await? {
            warn!(imdb_id = %id, kind = %kind, "Not found on Trakt, skipping");
            plan.withdraw_add(&id);
            dropped += 1;
        }
    }
    Ok(dropped)
}

/// Report ids that only exist on Trakt. They are never removed.
pub fn log_remote_only(domain: &str, remote_only: &KindSets) {
    if remote_only.is_empty() {
        return;
    }
    info!(domain, count = remote_only.len(), "Entries on Trakt with no IMDb counterpart");
    for (kind, id) in remote_only.iter() {
        debug!(domain, imdb_id = %id, kind = %kind, "Only on Trakt");
    }
}
