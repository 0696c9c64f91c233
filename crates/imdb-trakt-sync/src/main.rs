use clap::{ArgAction, Args, Parser, Subcommand};
use commands::{config, csv2json, sync};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "imdb-trakt-sync")]
#[command(about = "Mirror IMDb watchlist, ratings and history exports into a Trakt account")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    /// Config file to read instead of the per-user default
    #[arg(long, global = true, value_name = "PATH", env = "IMDB_TRAKT_SYNC_CONFIG")]
    config: Option<PathBuf>,

    /// Also write logs to this file (rotated daily)
    #[arg(long, global = true, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Push IMDb lists to Trakt (one-shot)
    #[command(long_about = "Read the IMDb CSV exports and bring the Trakt watchlist, ratings and watch history in line with them. Without a domain flag every domain that has a configured feed is synced.")]
    Sync(SyncArgs),

    /// Convert a CSV table to a JSON array of objects
    #[command(long_about = "Read a CSV table from stdin (or --input) and print a JSON array with one header->value object per row.")]
    Csv2json {
        /// CSV file to read instead of stdin
        #[arg(long, value_name = "PATH")]
        input: Option<PathBuf>,
    },

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        cmd: Option<ConfigCommands>,
    },
}

#[derive(Args, Debug, Clone, Default)]
pub struct SyncArgs {
    /// Sync the watchlist
    #[arg(long, action = ArgAction::SetTrue)]
    pub watchlist: bool,

    /// Sync ratings
    #[arg(long, action = ArgAction::SetTrue)]
    pub ratings: bool,

    /// Sync watch history
    #[arg(long, action = ArgAction::SetTrue)]
    pub history: bool,

    /// Sync every domain (each one needs a feed)
    #[arg(long, action = ArgAction::SetTrue, conflicts_with_all = ["watchlist", "ratings", "history"])]
    pub all: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Overrides for the config file, shared by every command that resolves
/// the effective configuration
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Compute and log the changes without sending them
    #[arg(
        long,
        env = "DRY_RUN",
        action = ArgAction::SetTrue,
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub dry_run: bool,

    /// Fail on IMDb title types Trakt cannot store instead of skipping them
    #[arg(long, action = ArgAction::SetTrue)]
    pub strict_title_types: bool,

    /// Do not look up pending titles on Trakt before submitting
    #[arg(long, action = ArgAction::SetTrue)]
    pub no_existence_check: bool,

    /// Request pacing: fixed-interval or header-driven
    #[arg(long, env = "TRAKT_PACING", value_name = "MODE")]
    pub pacing: Option<String>,

    #[arg(long, env = "TRAKT_CLIENT_ID", hide_env_values = true)]
    pub client_id: Option<String>,

    #[arg(long, env = "TRAKT_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// IMDb watchlist export (URL or local file)
    #[arg(long, env = "IMDB_WATCHLIST_URL")]
    pub imdb_watchlist_url: Option<String>,

    /// IMDb ratings export (URL or local file)
    #[arg(long, env = "IMDB_RATINGS_URL")]
    pub imdb_ratings_url: Option<String>,

    /// IMDb check-in list export (URL or local file)
    #[arg(long, env = "IMDB_HISTORY_URL")]
    pub imdb_history_url: Option<String>,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show {
        /// Print secrets unmasked
        #[arg(long)]
        full: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },
}

/// `VERBOSE=true` (or a number) counts as `-v` when no flag was given
fn verbose_level(flag: u8) -> u8 {
    if flag > 0 {
        return flag;
    }
    match std::env::var("VERBOSE") {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "" | "0" | "false" | "no" | "off" => 0,
            "true" | "yes" | "on" => 1,
            other => other.parse().unwrap_or(1),
        },
        Err(_) => 0,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    logging::init_logging_with_file(verbose_level(cli.verbose), cli.quiet, cli.log_file.clone())
        .map_err(|e| color_eyre::eyre::eyre!("{}", e))?;

    let output = output::Output::new(cli.output, cli.quiet);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sync(args) => sync::run_sync(args, config_path, &output).await,
        Commands::Csv2json { input } => csv2json::run_csv2json(input.as_deref(), &output),
        Commands::Config { cmd } => {
            let cmd = cmd.unwrap_or(ConfigCommands::Show {
                full: false,
                settings: SettingsArgs::default(),
            });
            config::run_config(cmd, config_path, &output)
        }
    }
}
