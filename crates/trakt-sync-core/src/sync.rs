use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{info, warn};
use trakt_sync_models::{HistoryEntry, RatingEntry, WatchlistEntry};
use trakt_sync_sources::{FeedError, FeedReader, FeedSource, TraktService, TransportError};

use crate::apply::{apply, ApplyMode, MutationKind, MutationSummary};
use crate::reconcile::{
    exclude_watching, filter_unknown, log_remote_only, reconcile_history, reconcile_ratings, reconcile_watchlist,
    PendingMutations,
};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("invalid IMDb feed: {0}")]
    Feed(#[from] FeedError),

    #[error("Trakt request failed: {0}")]
    Transport(#[from] TransportError),
}

/// What a run synchronizes. Runs always go in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDomain {
    Watchlist,
    Ratings,
    History,
}

impl SyncDomain {
    pub const ALL: [SyncDomain; 3] = [SyncDomain::Watchlist, SyncDomain::Ratings, SyncDomain::History];

    pub fn as_str(&self) -> &'static str {
        match self {
            SyncDomain::Watchlist => "watchlist",
            SyncDomain::Ratings => "ratings",
            SyncDomain::History => "history",
        }
    }
}

impl fmt::Display for SyncDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    pub dry_run: bool,
    /// Look up titles not yet on Trakt and drop the unknown ones
    pub check_existence: bool,
    /// Remove watchlist entries that are no longer on the IMDb watchlist
    pub remove_from_watchlist: bool,
    /// Every rated title also goes into history, watched on its rating date
    pub mark_rated_as_watched: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            check_existence: true,
            remove_from_watchlist: true,
            mark_rated_as_watched: false,
        }
    }
}

/// Feed locations per domain
#[derive(Debug, Clone, Default)]
pub struct FeedSources {
    pub watchlist: Option<FeedSource>,
    pub ratings: Option<FeedSource>,
    pub history: Option<FeedSource>,
}

/// Parsed IMDb side of a run
#[derive(Debug, Clone, Default)]
pub struct LocalFeeds {
    pub watchlist: Option<Vec<WatchlistEntry>>,
    pub ratings: Option<Vec<RatingEntry>>,
    pub history: Option<Vec<HistoryEntry>>,
}

/// Download and parse every feed the requested domains need.
///
/// Runs before any Trakt call so a bad feed aborts with nothing applied.
pub async fn load_feeds(
    reader: &FeedReader,
    sources: &FeedSources,
    domains: &[SyncDomain],
    options: &SyncOptions,
) -> Result<LocalFeeds, SyncError> {
    let wants = |domain: SyncDomain| domains.contains(&domain);
    let mut feeds = LocalFeeds::default();

    if wants(SyncDomain::Watchlist) {
        if let Some(source) = &sources.watchlist {
            info!(source = %source, "Loading IMDb watchlist");
            feeds.watchlist = Some(reader.watchlist(source).await?);
        }
    }

    let ratings_needed = wants(SyncDomain::Ratings) || (wants(SyncDomain::History) && options.mark_rated_as_watched);
    if ratings_needed {
        if let Some(source) = &sources.ratings {
            info!(source = %source, "Loading IMDb ratings");
            feeds.ratings = Some(reader.ratings(source).await?);
        }
    }

    if wants(SyncDomain::History) {
        if let Some(source) = &sources.history {
            info!(source = %source, "Loading IMDb history");
            feeds.history = Some(reader.history(source).await?);
        }
    }

    Ok(feeds)
}

/// Outcome of one domain
#[derive(Debug, Clone, Serialize)]
pub struct DomainReport {
    pub domain: SyncDomain,
    pub local: usize,
    pub remote: usize,
    pub excluded_watching: usize,
    pub unknown: usize,
    pub unchanged: usize,
    pub remote_only: usize,
    pub mutations: Vec<MutationSummary>,
}

impl DomainReport {
    fn new(domain: SyncDomain) -> Self {
        Self {
            domain,
            local: 0,
            remote: 0,
            excluded_watching: 0,
            unknown: 0,
            unchanged: 0,
            remote_only: 0,
            mutations: Vec::new(),
        }
    }

    pub fn submitted(&self) -> u32 {
        self.mutations.iter().map(|m| m.submitted.total()).sum()
    }

    pub fn applied(&self) -> u32 {
        self.mutations.iter().map(|m| m.applied()).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    pub domains: Vec<DomainReport>,
}

impl SyncReport {
    pub fn submitted(&self) -> u32 {
        self.domains.iter().map(|d| d.submitted()).sum()
    }

    pub fn applied(&self) -> u32 {
        self.domains.iter().map(|d| d.applied()).sum()
    }

    pub fn not_found(&self) -> usize {
        self.domains
            .iter()
            .flat_map(|d| d.mutations.iter())
            .map(|m| m.not_found.len())
            .sum()
    }
}

/// Runs watchlist, ratings and history syncs against one Trakt account
pub struct SyncRunner<S: TraktService> {
    service: S,
    options: SyncOptions,
    now: Option<DateTime<Utc>>,
}

impl<S: TraktService> SyncRunner<S> {
    pub fn new(service: S, options: SyncOptions) -> Self {
        Self {
            service,
            options,
            now: None,
        }
    }

    /// Pin the clock used to cap timestamps
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    fn mode(&self) -> ApplyMode {
        if self.options.dry_run {
            ApplyMode::DryRun
        } else {
            ApplyMode::Live
        }
    }

    /// Sync the requested domains in order. Domains without local data are
    /// skipped; the first transport failure aborts the run.
    pub async fn run(&mut self, feeds: &LocalFeeds, domains: &[SyncDomain]) -> Result<SyncReport, SyncError> {
        let now = self.now.unwrap_or_else(Utc::now);
        let mut report = SyncReport {
            dry_run: self.options.dry_run,
            domains: Vec::new(),
        };
        if self.options.dry_run {
            info!("Dry run: no changes will be sent to Trakt");
        }

        for domain in SyncDomain::ALL.into_iter().filter(|d| domains.contains(d)) {
            let domain_report = match domain {
                SyncDomain::Watchlist => match &feeds.watchlist {
                    Some(local) => Some(self.sync_watchlist(local).await?),
                    None => None,
                },
                SyncDomain::Ratings => match &feeds.ratings {
                    Some(local) => Some(self.sync_ratings(local, now).await?),
                    None => None,
                },
                SyncDomain::History => {
                    let mut local = feeds.history.clone().unwrap_or_default();
                    if self.options.mark_rated_as_watched {
                        if let Some(ratings) = &feeds.ratings {
                            local.extend(ratings.iter().map(HistoryEntry::from));
                        }
                    }
                    if feeds.history.is_none() && local.is_empty() {
                        None
                    } else {
                        Some(self.sync_history(&local, now).await?)
                    }
                }
            };

            match domain_report {
                Some(domain_report) => {
                    info!(
                        domain = %domain,
                        submitted = domain_report.submitted(),
                        applied = domain_report.applied(),
                        "Domain sync finished"
                    );
                    report.domains.push(domain_report);
                }
                None => warn!(domain = %domain, "No IMDb feed configured, skipping"),
            }
        }

        Ok(report)
    }

    /// Watching exclusion and existence filtering, shared by every domain
    async fn prune<P: PendingMutations>(&mut self, plan: &mut P, report: &mut DomainReport) -> Result<(), SyncError> {
        let watching = self.service.watching().await?;
        report.excluded_watching = exclude_watching(plan, watching.as_ref());
        if self.options.check_existence {
            report.unknown = filter_unknown(&mut self.service, plan).await?;
        }
        Ok(())
    }

    async fn sync_watchlist(&mut self, local: &[WatchlistEntry]) -> Result<DomainReport, SyncError> {
        let mut report = DomainReport::new(SyncDomain::Watchlist);
        let remote = self.service.watchlist().await?;
        report.local = local.len();
        report.remote = remote.len();

        let mut plan = reconcile_watchlist(local, &remote);
        if !self.options.remove_from_watchlist && !plan.remove.is_empty() {
            info!(count = plan.remove.len(), "Watchlist removal disabled, keeping entries missing from IMDb");
            report.remote_only = plan.remove.len();
            plan.remove = Default::default();
        }
        self.prune(&mut plan, &mut report).await?;

        let mode = self.mode();
        report
            .mutations
            .push(apply(&mut self.service, MutationKind::WatchlistAdd, &plan.add_batch(), mode).await?);
        report
            .mutations
            .push(apply(&mut self.service, MutationKind::WatchlistRemove, &plan.remove_batch(), mode).await?);
        Ok(report)
    }

    async fn sync_ratings(&mut self, local: &[RatingEntry], now: DateTime<Utc>) -> Result<DomainReport, SyncError> {
        let mut report = DomainReport::new(SyncDomain::Ratings);
        let remote = self.service.ratings(None).await?;
        report.local = local.len();
        report.remote = remote.len();

        let mut plan = reconcile_ratings(local, &remote, now);
        report.unchanged = plan.unchanged;
        report.remote_only = plan.remote_only.len();
        log_remote_only("ratings", &plan.remote_only);
        info!(new = plan.new.len(), updated = plan.updated.len(), unchanged = plan.unchanged, "Ratings compared");
        self.prune(&mut plan, &mut report).await?;

        let mode = self.mode();
        report
            .mutations
            .push(apply(&mut self.service, MutationKind::RatingsAdd, &plan.batch(), mode).await?);
        Ok(report)
    }

    async fn sync_history(&mut self, local: &[HistoryEntry], now: DateTime<Utc>) -> Result<DomainReport, SyncError> {
        let mut report = DomainReport::new(SyncDomain::History);
        let remote = self.service.history(None).await?;
        report.local = local.len();
        report.remote = remote.len();

        let mut plan = reconcile_history(local, &remote, now);
        report.remote_only = plan.remote_only.len();
        log_remote_only("history", &plan.remote_only);
        self.prune(&mut plan, &mut report).await?;

        let mode = self.mode();
        report
            .mutations
            .push(apply(&mut self.service, MutationKind::HistoryAdd, &plan.batch(), mode).await?);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeTrakt;
    use chrono::{NaiveDate, TimeZone};
    use std::io::Write;
    use tempfile::NamedTempFile;
    use trakt_sync_models::{ImdbId, MediaKind, RemoteItem, RemoteRating, WatchingStatus};
    use trakt_sync_sources::TitleTypePolicy;

    fn id(raw: &str) -> ImdbId {
        ImdbId::parse(raw).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn options() -> SyncOptions {
        SyncOptions {
            check_existence: false,
            ..SyncOptions::default()
        }
    }

    fn watchlist_feed(ids: &[(&str, MediaKind)]) -> LocalFeeds {
        LocalFeeds {
            watchlist: Some(ids.iter().map(|(raw, kind)| WatchlistEntry::new(id(raw), *kind)).collect()),
            ..LocalFeeds::default()
        }
    }

    fn rating(raw: &str, value: u8) -> RatingEntry {
        RatingEntry {
            id: id(raw),
            kind: MediaKind::Movie,
            rating: value,
            rated_on: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_watchlist_end_to_end_single_post() {
        let trakt = FakeTrakt::default();
        let feeds = watchlist_feed(&[("tt0133093", MediaKind::Movie)]);

        let mut runner = SyncRunner::new(trakt, options()).with_now(now());
        let report = runner.run(&feeds, &[SyncDomain::Watchlist]).await.unwrap();

        let trakt = runner.service();
        assert_eq!(trakt.posts.len(), 1);
        let body = serde_json::to_string(trakt.posted(MutationKind::WatchlistAdd).unwrap()).unwrap();
        assert_eq!(body, r#"{"movies":[{"ids":{"imdb":"tt0133093"}}],"shows":[],"episodes":[]}"#);
        assert_eq!(report.applied(), 1);
    }

    #[tokio::test]
    async fn test_watchlist_removes_stale_entries() {
        let trakt = FakeTrakt {
            watchlist: vec![RemoteItem::Movie { id: Some(id("tt0111161")) }],
            ..FakeTrakt::default()
        };
        let feeds = watchlist_feed(&[]);

        let mut runner = SyncRunner::new(trakt, options()).with_now(now());
        runner.run(&feeds, &[SyncDomain::Watchlist]).await.unwrap();

        let removed = runner.service().posted(MutationKind::WatchlistRemove).unwrap();
        assert_eq!(removed.movies[0].id(), &id("tt0111161"));
        assert!(runner.service().posted(MutationKind::WatchlistAdd).is_none());
    }

    #[tokio::test]
    async fn test_watchlist_removal_can_be_disabled() {
        let trakt = FakeTrakt {
            watchlist: vec![RemoteItem::Movie { id: Some(id("tt0111161")) }],
            ..FakeTrakt::default()
        };
        let feeds = watchlist_feed(&[]);
        let opts = SyncOptions {
            remove_from_watchlist: false,
            ..options()
        };

        let mut runner = SyncRunner::new(trakt, opts).with_now(now());
        let report = runner.run(&feeds, &[SyncDomain::Watchlist]).await.unwrap();

        assert!(runner.service().posts.is_empty());
        assert_eq!(report.domains[0].remote_only, 1);
    }

    #[tokio::test]
    async fn test_watching_title_is_left_alone() {
        let trakt = FakeTrakt {
            watching: Some(WatchingStatus {
                kind: MediaKind::Movie,
                id: id("tt0133093"),
            }),
            ..FakeTrakt::default()
        };
        let feeds = watchlist_feed(&[("tt0133093", MediaKind::Movie), ("tt0944947", MediaKind::Show)]);

        let mut runner = SyncRunner::new(trakt, options()).with_now(now());
        let report = runner.run(&feeds, &[SyncDomain::Watchlist]).await.unwrap();

        let added = runner.service().posted(MutationKind::WatchlistAdd).unwrap();
        assert!(added.movies.is_empty());
        assert_eq!(added.shows.len(), 1);
        assert_eq!(report.domains[0].excluded_watching, 1);
    }

    #[tokio::test]
    async fn test_existence_check_drops_unknown_titles() {
        let mut trakt = FakeTrakt::default();
        trakt.unknown.insert(id("tt9999999"));
        let feeds = watchlist_feed(&[("tt0133093", MediaKind::Movie), ("tt9999999", MediaKind::Movie)]);
        let opts = SyncOptions {
            check_existence: true,
            ..options()
        };

        let mut runner = SyncRunner::new(trakt, opts).with_now(now());
        let report = runner.run(&feeds, &[SyncDomain::Watchlist]).await.unwrap();

        let added = runner.service().posted(MutationKind::WatchlistAdd).unwrap();
        assert_eq!(added.movies.len(), 1);
        assert_eq!(added.movies[0].id(), &id("tt0133093"));
        assert_eq!(report.domains[0].unknown, 1);
        assert_eq!(runner.service().calls.iter().filter(|c| **c == "exists").count(), 2);
    }

    #[tokio::test]
    async fn test_dry_run_sends_nothing() {
        let trakt = FakeTrakt {
            watchlist: vec![RemoteItem::Movie { id: Some(id("tt0111161")) }],
            ..FakeTrakt::default()
        };
        let feeds = LocalFeeds {
            ratings: Some(vec![rating("tt0133093", 9)]),
            ..watchlist_feed(&[("tt0133093", MediaKind::Movie)])
        };
        let opts = SyncOptions {
            dry_run: true,
            ..options()
        };

        let mut runner = SyncRunner::new(trakt, opts).with_now(now());
        let report = runner
            .run(&feeds, &[SyncDomain::Watchlist, SyncDomain::Ratings])
            .await
            .unwrap();

        assert!(runner.service().posts.is_empty());
        assert!(report.dry_run);
        assert_eq!(report.submitted(), 3);
        assert_eq!(report.applied(), 0);
    }

    #[tokio::test]
    async fn test_ratings_submit_new_and_changed_only() {
        let trakt = FakeTrakt {
            ratings: vec![
                RemoteRating {
                    id: id("tt0000002"),
                    kind: MediaKind::Movie,
                    rating: 5,
                    rated_at: now(),
                },
                RemoteRating {
                    id: id("tt0000003"),
                    kind: MediaKind::Movie,
                    rating: 9,
                    rated_at: now(),
                },
            ],
            ..FakeTrakt::default()
        };
        let feeds = LocalFeeds {
            ratings: Some(vec![rating("tt0000001", 8), rating("tt0000002", 7), rating("tt0000003", 9)]),
            ..LocalFeeds::default()
        };

        let mut runner = SyncRunner::new(trakt, options()).with_now(now());
        let report = runner.run(&feeds, &[SyncDomain::Ratings]).await.unwrap();

        let sent = runner.service().posted(MutationKind::RatingsAdd).unwrap();
        let ids: Vec<&str> = sent.movies.iter().map(|item| item.id().as_str()).collect();
        assert_eq!(ids, vec!["tt0000001", "tt0000002"]);
        assert_eq!(report.domains[0].unchanged, 1);
    }

    #[tokio::test]
    async fn test_mark_rated_as_watched_feeds_history() {
        let trakt = FakeTrakt::default();
        let feeds = LocalFeeds {
            ratings: Some(vec![rating("tt0133093", 9)]),
            ..LocalFeeds::default()
        };
        let opts = SyncOptions {
            mark_rated_as_watched: true,
            ..options()
        };

        let mut runner = SyncRunner::new(trakt, opts).with_now(now());
        runner.run(&feeds, &[SyncDomain::History]).await.unwrap();

        let history = runner.service().posted(MutationKind::HistoryAdd).unwrap();
        assert_eq!(history.movies.len(), 1);
        assert!(history.movies[0].watched_at.is_some());
    }

    #[tokio::test]
    async fn test_domains_run_in_order() {
        let trakt = FakeTrakt::default();
        let feeds = LocalFeeds {
            watchlist: Some(Vec::new()),
            ratings: Some(Vec::new()),
            history: Some(Vec::new()),
        };

        let mut runner = SyncRunner::new(trakt, options()).with_now(now());
        runner
            .run(&feeds, &[SyncDomain::History, SyncDomain::Watchlist, SyncDomain::Ratings])
            .await
            .unwrap();

        let snapshots: Vec<&str> = runner
            .service()
            .calls
            .iter()
            .copied()
            .filter(|c| matches!(*c, "watchlist" | "ratings" | "history"))
            .collect();
        assert_eq!(snapshots, vec!["watchlist", "ratings", "history"]);
    }

    #[tokio::test]
    async fn test_transport_failure_aborts_run() {
        let trakt = FakeTrakt {
            fail_on: Some("ratings"),
            ..FakeTrakt::default()
        };
        let feeds = LocalFeeds {
            watchlist: Some(Vec::new()),
            ratings: Some(vec![rating("tt0133093", 9)]),
            history: Some(Vec::new()),
        };

        let mut runner = SyncRunner::new(trakt, options()).with_now(now());
        let err = runner.run(&feeds, &SyncDomain::ALL).await.unwrap_err();

        assert!(matches!(err, SyncError::Transport(ref e) if e.status() == Some(500)));
        assert!(!runner.service().calls.contains(&"history"));
    }

    #[tokio::test]
    async fn test_bad_feed_fails_before_any_remote_call() {
        let mut good = NamedTempFile::new().unwrap();
        writeln!(good, "Const,Title Type\ntt0133093,Movie").unwrap();
        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "Const,Title Type,Your Rating,Date Rated\ntt0133093,Movie,42,2020-01-01").unwrap();

        let reader = FeedReader::new(TitleTypePolicy::Lenient, None).unwrap();
        let sources = FeedSources {
            watchlist: Some(FeedSource::Path(good.path().to_path_buf())),
            ratings: Some(FeedSource::Path(bad.path().to_path_buf())),
            history: None,
        };

        let err = load_feeds(&reader, &sources, &SyncDomain::ALL, &SyncOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Feed(FeedError::Input { .. })));
    }

    #[tokio::test]
    async fn test_load_feeds_only_reads_requested_domains() {
        let mut watchlist = NamedTempFile::new().unwrap();
        writeln!(watchlist, "Const,Title Type\ntt0133093,Movie").unwrap();

        let reader = FeedReader::new(TitleTypePolicy::Lenient, None).unwrap();
        let sources = FeedSources {
            watchlist: Some(FeedSource::Path(watchlist.path().to_path_buf())),
            ratings: Some(FeedSource::parse("/nonexistent/ratings.csv")),
            history: None,
        };

        let feeds = load_feeds(&reader, &sources, &[SyncDomain::Watchlist], &SyncOptions::default())
            .await
            .unwrap();
        assert_eq!(feeds.watchlist.unwrap().len(), 1);
        assert!(feeds.ratings.is_none());
    }
}
