// Set arithmetic between the IMDb side and a Trakt snapshot

use std::collections::HashMap;
use tracing::debug;
use trakt_sync_models::{ImdbId, KindSets, MediaKind, RatingEntry, RemoteItem, RemoteRating};

/// Outcome of comparing two kind-partitioned sets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetDiff {
    /// Local but not remote
    pub to_add: KindSets,
    /// Remote but not local
    pub to_remove: KindSets,
}

/// `local − remote` and `remote − local`, kind by kind
pub fn diff_sets(local: &KindSets, remote: &KindSets) -> SetDiff {
    let diff = SetDiff {
        to_add: local.difference(remote),
        to_remove: remote.difference(local),
    };
    debug!(
        local = local.len(),
        remote = remote.len(),
        to_add = diff.to_add.len(),
        to_remove = diff.to_remove.len(),
        "diff_sets"
    );
    diff
}

/// Existing remote ids by kind.
///
/// Items without a resolvable id are dropped and seasons never land in a set.
/// With `include_parent_shows`, an episode also marks its show as present.
pub fn remote_sets(items: &[RemoteItem], include_parent_shows: bool) -> KindSets {
    let mut sets = KindSets::new();
    let mut unresolved = 0usize;

    for item in items {
        match item.resolved() {
            Some((id, kind)) => {
                sets.insert(kind, id);
            }
            None => unresolved += 1,
        }
        if include_parent_shows {
            if let Some(show) = item.parent_show() {
                sets.insert(MediaKind::Show, show.clone());
            }
        }
    }

    if unresolved > 0 {
        debug!(unresolved, "Remote items without a usable IMDb id were ignored");
    }
    sets
}

/// How a local rating relates to what Trakt holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingChange {
    /// No remote rating for this title
    New,
    /// Remote rating differs; carries the remote value
    Updated { previous: u8 },
    Unchanged,
}

/// Classify every local rating against the remote ratings.
///
/// A title rated more than once locally keeps its last row.
pub fn classify_ratings<'a>(
    local: &'a [RatingEntry],
    remote: &[RemoteRating],
) -> Vec<(&'a RatingEntry, RatingChange)> {
    let remote_by_id: HashMap<(MediaKind, &ImdbId), u8> =
        remote.iter().map(|r| ((r.kind, &r.id), r.rating)).collect();

    let mut latest: HashMap<(MediaKind, &ImdbId), &RatingEntry> = HashMap::new();
    for entry in local {
        latest.insert((entry.kind, &entry.id), entry);
    }

    let mut classified: Vec<(&RatingEntry, RatingChange)> = latest
        .into_values()
        .map(|entry| {
            let change = match remote_by_id.get(&(entry.kind, &entry.id)) {
                None => RatingChange::New,
                Some(&previous) if previous != entry.rating => RatingChange::Updated { previous },
                Some(_) => RatingChange::Unchanged,
            };
            (entry, change)
        })
        .collect();
    classified.sort_by(|a, b| a.0.id.cmp(&b.0.id));
    classified
}

/// Remote ratings with no local counterpart
pub fn remote_only_ratings(local: &[RatingEntry], remote: &[RemoteRating]) -> KindSets {
    let local_sets: KindSets = local.iter().map(|e| (e.kind, e.id.clone())).collect();
    let remote_sets: KindSets = remote.iter().map(|r| (r.kind, r.id.clone())).collect();
    remote_sets.difference(&local_sets)
}
