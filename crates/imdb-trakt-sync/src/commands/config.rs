use super::effective_config;
use crate::output::{Output, OutputFormat};
use crate::{ConfigCommands, SettingsArgs};
use color_eyre::Result;
use owo_colors::OwoColorize;
use std::path::Path;
use trakt_sync_config::{Config, PathManager};

pub fn run_config(cmd: ConfigCommands, config_path: Option<&Path>, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full, settings } => show_config(full, &settings, config_path, output),
    }
}

/// The configuration a sync with the same flags would run with
fn shown_config(
    full: bool,
    settings: &SettingsArgs,
    config_path: Option<&Path>,
    paths: &PathManager,
) -> Result<Config> {
    let config = effective_config(settings, config_path, paths)?;
    Ok(if full { config } else { config.masked() })
}

fn show_config(full: bool, settings: &SettingsArgs, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let source = config_path.map(Path::to_path_buf).unwrap_or_else(|| paths.config_file());
    let shown = shown_config(full, settings, config_path, &paths)?;

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }
            if source.exists() {
                output.println(format!("{} {}", "Config file:".bold(), source.display()));
            } else {
                output.warn(format!("No config file at {}, showing defaults", source.display()));
            }
            output.println("");
            output.println(
                toml::to_string_pretty(&shown)
                    .map_err(|e| color_eyre::eyre::eyre!("Failed to render config: {}", e))?,
            );
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let value = serde_json::json!({
                "path": source.display().to_string(),
                "exists": source.exists(),
                "config": shown,
            });
            output.json(&value);
        }
    }

    Ok(())
}
