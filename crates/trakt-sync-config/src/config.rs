use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::paths::PathManager;

pub const DEFAULT_BASE_URL: &str = "https://api.trakt.tv";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub trakt: TraktConfig,
    pub imdb: ImdbConfig,
    pub sync: SyncConfig,
}

/// How requests to Trakt are spaced out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacingMode {
    #[default]
    FixedInterval,
    HeaderDriven,
}

impl FromStr for PacingMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed-interval" | "fixed" => Ok(PacingMode::FixedInterval),
            "header-driven" | "header" => Ok(PacingMode::HeaderDriven),
            other => Err(anyhow!("unknown pacing mode '{}' (expected fixed-interval or header-driven)", other)),
        }
    }
}

impl fmt::Display for PacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacingMode::FixedInterval => f.write_str("fixed-interval"),
            PacingMode::HeaderDriven => f.write_str("header-driven"),
        }
    }
}

/// Handling of IMDb title types with no Trakt counterpart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TitleTypes {
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraktConfig {
    pub client_id: String,
    pub access_token: String,
    pub base_url: String,
    pub pacing: PacingMode,
    pub min_interval_ms: u64,
    pub page_size: u32,
    pub paginate: bool,
    pub timeout_secs: u64,
}

impl Default for TraktConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            access_token: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            pacing: PacingMode::default(),
            min_interval_ms: 3000,
            page_size: 100,
            paginate: true,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImdbConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchlist_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratings_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_url: Option<String>,
    pub title_types: TitleTypes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub dry_run: bool,
    pub check_existence: bool,
    pub remove_from_watchlist: bool,
    pub mark_rated_as_watched: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            check_existence: true,
            remove_from_watchlist: true,
            mark_rated_as_watched: false,
        }
    }
}

/// The three IMDb exports a sync can read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Watchlist,
    Ratings,
    History,
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedKind::Watchlist => f.write_str("watchlist"),
            FeedKind::Ratings => f.write_str("ratings"),
            FeedKind::History => f.write_str("history"),
        }
    }
}

/// Values given on the command line or through the environment. `None`
/// leaves the file/default value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub client_id: Option<String>,
    pub access_token: Option<String>,
    pub pacing: Option<PacingMode>,
    pub watchlist_url: Option<String>,
    pub ratings_url: Option<String>,
    pub history_url: Option<String>,
    pub dry_run: Option<bool>,
    pub strict_title_types: Option<bool>,
    pub check_existence: Option<bool>,
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => String::new(),
        1..=8 => "********".to_string(),
        _ => format!("{}********", secret.chars().take(4).collect::<String>()),
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Defaults, then the explicit file (which must exist) or the default
    /// file when present.
    pub fn load(explicit: Option<&Path>, paths: &PathManager) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            tracing::debug!(path = %path.display(), "Loading config");
            return Self::load_from_file(path);
        }

        let default_path = paths.config_file();
        if default_path.exists() {
            tracing::debug!(path = %default_path.display(), "Loading config");
            Self::load_from_file(&default_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(client_id) = overrides.client_id {
            self.trakt.client_id = client_id;
        }
        if let Some(access_token) = overrides.access_token {
            self.trakt.access_token = access_token;
        }
        if let Some(pacing) = overrides.pacing {
            self.trakt.pacing = pacing;
        }
        if overrides.watchlist_url.is_some() {
            self.imdb.watchlist_url = overrides.watchlist_url;
        }
        if overrides.ratings_url.is_some() {
            self.imdb.ratings_url = overrides.ratings_url;
        }
        if overrides.history_url.is_some() {
            self.imdb.history_url = overrides.history_url;
        }
        if let Some(true) = overrides.strict_title_types {
            self.imdb.title_types = TitleTypes::Strict;
        }
        if let Some(dry_run) = overrides.dry_run {
            self.sync.dry_run |= dry_run;
        }
        if let Some(check_existence) = overrides.check_existence {
            self.sync.check_existence = check_existence;
        }
    }

    pub fn feed_url(&self, kind: FeedKind) -> Option<&str> {
        let url = match kind {
            FeedKind::Watchlist => &self.imdb.watchlist_url,
            FeedKind::Ratings => &self.imdb.ratings_url,
            FeedKind::History => &self.imdb.history_url,
        };
        url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Check credentials and limits, plus a feed for every requested kind.
    pub fn validate(&self, requested: &[FeedKind]) -> anyhow::Result<()> {
        if self.trakt.client_id.trim().is_empty() {
            return Err(anyhow!("Trakt client_id is not configured (set TRAKT_CLIENT_ID or [trakt].client_id)"));
        }
        if self.trakt.access_token.trim().is_empty() {
            return Err(anyhow!(
                "Trakt access_token is not configured (set TRAKT_ACCESS_TOKEN or [trakt].access_token)"
            ));
        }
        if self.trakt.page_size == 0 {
            return Err(anyhow!("page_size must be greater than zero"));
        }
        if self.trakt.pacing == PacingMode::FixedInterval && self.trakt.min_interval_ms == 0 {
            return Err(anyhow!("min_interval_ms must be greater than zero for fixed-interval pacing"));
        }

        for kind in requested {
            let satisfied = self.feed_url(*kind).is_some()
                || (*kind == FeedKind::History
                    && self.sync.mark_rated_as_watched
                    && self.feed_url(FeedKind::Ratings).is_some());
            if !satisfied {
                return Err(anyhow!("IMDb {} feed is not configured", kind));
            }
        }

        Ok(())
    }

    /// Copy safe to print
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        copy.trakt.client_id = mask(&self.trakt.client_id);
        copy.trakt.access_token = mask(&self.trakt.access_token);
        copy
    }
}
