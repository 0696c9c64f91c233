use crate::SettingsArgs;
use color_eyre::Result;
use std::path::Path;
use trakt_sync_config::{Config, ConfigOverrides, PacingMode, PathManager};

pub mod config;
pub mod csv2json;
pub mod sync;

fn overrides_from(settings: &SettingsArgs) -> Result<ConfigOverrides> {
    let pacing = settings
        .pacing
        .as_deref()
        .map(str::parse::<PacingMode>)
        .transpose()
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    Ok(ConfigOverrides {
        client_id: settings.client_id.clone(),
        access_token: settings.access_token.clone(),
        pacing,
        watchlist_url: settings.imdb_watchlist_url.clone(),
        ratings_url: settings.imdb_ratings_url.clone(),
        history_url: settings.imdb_history_url.clone(),
        dry_run: settings.dry_run.then_some(true),
        strict_title_types: settings.strict_title_types.then_some(true),
        check_existence: settings.no_existence_check.then_some(false),
    })
}

/// File (or defaults) with flag and environment overrides on top
pub(crate) fn effective_config(
    settings: &SettingsArgs,
    config_path: Option<&Path>,
    paths: &PathManager,
) -> Result<Config> {
    let source = config_path.map(Path::to_path_buf).unwrap_or_else(|| paths.config_file());
    let mut config = Config::load(config_path, paths)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {:#}", source.display(), e))?;
    config.apply_overrides(overrides_from(settings)?);
    Ok(config)
}
