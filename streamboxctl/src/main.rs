use std::path::PathBuf;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use streambox_config::{Config, ConfigLoader};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "streamboxctl", version)]
#[command(about = "Run scrape sessions and manage StreamBox watch progress")]
struct Cli {
    /// Path to a streambox.toml configuration file
    #[arg(long, global = true, env = "STREAMBOX_CONFIG")]
    config: Option<PathBuf>,

    /// Path to a .env file (defaults to ./.env when present)
    #[arg(long, global = true)]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scrape stream sources for a title and print each event as JSON
    Scrape(ScrapeArgs),
    /// Inspect or update per-series watch progress
    #[command(subcommand)]
    Progress(ProgressCommand),
    /// Enrich a base episode list with extended-episode stills
    Episodes(EpisodesArgs),
}

#[derive(ClapArgs, Debug, Clone)]
struct ScrapeArgs {
    /// Title id handed to the worker (e.g. an IMDb id)
    title_id: String,

    /// Season number (series only)
    #[arg(long)]
    season: Option<u32>,

    /// Episode number (requires --season)
    #[arg(long, requires = "season")]
    episode: Option<u32>,

    /// Cancel the session after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum ProgressCommand {
    /// Print the cursor for a series, creating the default if unseen
    Get {
        series_id: String,
    },
    /// Move a series' cursor to another season
    SetSeason {
        series_id: String,
        season: u32,
    },
}

#[derive(ClapArgs, Debug, Clone)]
struct EpisodesArgs {
    /// TMDB id of the show
    #[arg(long)]
    tmdb_id: String,

    /// Season number
    #[arg(long)]
    season: u32,

    /// JSON file holding the base episode list
    #[arg(long, value_name = "FILE")]
    base: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = load_config(&cli)?;
    debug!(source = ?config.source, "configuration loaded");

    match cli.command {
        Command::Scrape(args) => commands::scrape(&config, args).await,
        Command::Progress(ProgressCommand::Get { series_id }) => {
            commands::progress_get(&config, &series_id).await
        }
        Command::Progress(ProgressCommand::SetSeason { series_id, season }) => {
            commands::progress_set_season(&config, &series_id, season).await
        }
        Command::Episodes(args) => commands::episodes(&config, args).await,
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut loader = ConfigLoader::new();
    if let Some(path) = &cli.config {
        loader = loader.with_config_path(path);
    }
    if let Some(path) = &cli.env_file {
        loader = loader.with_env_file(path);
    }
    loader.load().context("failed to load configuration")
}
