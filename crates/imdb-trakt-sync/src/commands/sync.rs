use super::effective_config;
use crate::output::Output;
use crate::SyncArgs;
use color_eyre::Result;
use std::path::Path;
use std::time::Duration;
use trakt_sync_config::{Config, FeedKind, PacingMode, PathManager, TitleTypes};
use trakt_sync_core::{load_feeds, FeedSources, SyncDomain, SyncOptions, SyncRunner};
use trakt_sync_sources::{
    FeedReader, FeedSource, PacingStrategy, TitleTypePolicy, TraktClient, TraktClientOptions, TraktCredentials,
};

fn feed_kind(domain: SyncDomain) -> FeedKind {
    match domain {
        SyncDomain::Watchlist => FeedKind::Watchlist,
        SyncDomain::Ratings => FeedKind::Ratings,
        SyncDomain::History => FeedKind::History,
    }
}

/// Explicit flags win; `--all` means every domain; no flag means every
/// domain the configuration has a feed for.
fn requested_domains(args: &SyncArgs, config: &Config) -> Vec<SyncDomain> {
    if args.all {
        return SyncDomain::ALL.to_vec();
    }

    let explicit: Vec<SyncDomain> = SyncDomain::ALL
        .into_iter()
        .filter(|domain| match domain {
            SyncDomain::Watchlist => args.watchlist,
            SyncDomain::Ratings => args.ratings,
            SyncDomain::History => args.history,
        })
        .collect();
    if !explicit.is_empty() {
        return explicit;
    }

    SyncDomain::ALL
        .into_iter()
        .filter(|domain| {
            config.feed_url(feed_kind(*domain)).is_some()
                || (*domain == SyncDomain::History
                    && config.sync.mark_rated_as_watched
                    && config.feed_url(FeedKind::Ratings).is_some())
        })
        .collect()
}

fn feed_sources(config: &Config) -> FeedSources {
    FeedSources {
        watchlist: config.feed_url(FeedKind::Watchlist).map(FeedSource::parse),
        ratings: config.feed_url(FeedKind::Ratings).map(FeedSource::parse),
        history: config.feed_url(FeedKind::History).map(FeedSource::parse),
    }
}

fn sync_options(config: &Config) -> SyncOptions {
    SyncOptions {
        dry_run: config.sync.dry_run,
        check_existence: config.sync.check_existence,
        remove_from_watchlist: config.sync.remove_from_watchlist,
        mark_rated_as_watched: config.sync.mark_rated_as_watched,
    }
}

fn client_options(config: &Config) -> TraktClientOptions {
    let pacing = match config.trakt.pacing {
        PacingMode::FixedInterval => PacingStrategy::FixedInterval {
            min_interval: Duration::from_millis(config.trakt.min_interval_ms),
        },
        PacingMode::HeaderDriven => PacingStrategy::HeaderDriven,
    };

    TraktClientOptions {
        base_url: config.trakt.base_url.clone(),
        pacing,
        timeout: Some(Duration::from_secs(config.trakt.timeout_secs)),
        page_size: config.trakt.page_size,
        paginate: config.trakt.paginate,
    }
}

fn title_policy(config: &Config) -> TitleTypePolicy {
    match config.imdb.title_types {
        TitleTypes::Lenient => TitleTypePolicy::Lenient,
        TitleTypes::Strict => TitleTypePolicy::Strict,
    }
}

pub async fn run_sync(args: SyncArgs, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config = effective_config(&args.settings, config_path, &PathManager::default())?;

    let domains = requested_domains(&args, &config);
    if domains.is_empty() {
        return Err(color_eyre::eyre::eyre!(
            "No IMDb feed configured. Set IMDB_WATCHLIST_URL, IMDB_RATINGS_URL or IMDB_HISTORY_URL (or the [imdb] section of the config file)"
        ));
    }
    let kinds: Vec<FeedKind> = domains.iter().copied().map(feed_kind).collect();
    config
        .validate(&kinds)
        .map_err(|e| color_eyre::eyre::eyre!("Configuration validation failed: {}", e))?;

    let options = sync_options(&config);
    let client_options = client_options(&config);
    tracing::info!(
        domains = ?domains,
        dry_run = options.dry_run,
        pacing = %config.trakt.pacing,
        "Starting sync"
    );

    let reader = FeedReader::new(title_policy(&config), client_options.timeout)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create IMDb feed reader: {}", e))?;
    let feeds = load_feeds(&reader, &feed_sources(&config), &domains, &options)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load IMDb feeds: {}", e))?;

    let credentials = TraktCredentials {
        client_id: config.trakt.client_id.clone(),
        access_token: config.trakt.access_token.clone(),
    };
    let client = TraktClient::new(credentials, client_options)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create Trakt client: {}", e))?;

    let mut runner = SyncRunner::new(client, options);
    let report = runner
        .run(&feeds, &domains)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Sync operation failed: {}", e))?;

    output.sync_report(&report);
    Ok(())
}
