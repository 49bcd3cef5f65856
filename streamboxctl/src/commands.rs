use std::{
    io::{self, Write},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, bail};
use futures::StreamExt;
use streambox_config::Config;
use streambox_core::{
    CaptainWatchClient, JsonFileBackend, ScrapeOrchestrator, StreamBox,
    WatchProgressStore, merge_episodes, providers::overlay_or_empty,
};
use streambox_model::{EpisodeRecord, ScrapeEvent, ScrapeRequest};
use tracing::{info, warn};

use crate::{EpisodesArgs, ScrapeArgs};

/// Write `text` and a newline to stdout. Returns `false` once the reader has
/// gone away.
fn write_stdout(text: &str) -> anyhow::Result<bool> {
    let mut out = io::stdout().lock();
    match writeln!(out, "{text}").and_then(|()| out.flush()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
            info!("stdout closed");
            Ok(false)
        }
        Err(err) => Err(err).context("failed to write to stdout"),
    }
}

fn overlay_client(config: &Config) -> anyhow::Result<CaptainWatchClient> {
    CaptainWatchClient::new(
        config.overlay.endpoint.clone(),
        config.overlay.timeout,
    )
    .context("failed to build overlay client")
}

async fn open(config: &Config) -> anyhow::Result<StreamBox> {
    let series_path = config.storage.series_path();
    let progress =
        WatchProgressStore::open(JsonFileBackend::new(&series_path))
            .await
            .with_context(|| {
                format!(
                    "failed to open watch progress at {}",
                    series_path.display()
                )
            })?;
    let overlay = overlay_client(config)?;

    Ok(StreamBox::new(
        ScrapeOrchestrator::new(config.worker_config()),
        progress,
        Arc::new(overlay),
    ))
}

pub async fn scrape(config: &Config, args: ScrapeArgs) -> anyhow::Result<()> {
    let request = ScrapeRequest::new(args.title_id, args.season, args.episode)
        .context("invalid scrape request")?;
    let app = open(config).await?;

    let mut session = app
        .start_scrape(request)
        .await
        .context("failed to start scrape")?;
    info!(session = %session.id(), request = %session.request(), "scraping");

    let cancel = session.cancellation_token();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() {
                        info!("interrupted, cancelling scrape");
                        cancel.cancel();
                    }
                }
            }
        }
    });
    if let Some(secs) = args.timeout {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                    warn!(secs, "scrape timed out");
                    cancel.cancel();
                }
            }
        });
    }

    let mut violation = None;
    while let Some(event) = session.next().await {
        if !write_stdout(&serde_json::to_string(&event)?)? {
            session.cancel();
            break;
        }
        if let ScrapeEvent::UnknownEvent(raw) = event {
            violation = Some(raw);
        }
    }
    app.shutdown().await;

    if let Some(raw) = violation {
        bail!("scrape worker sent an unrecognised message: {raw}");
    }
    Ok(())
}

pub async fn progress_get(
    config: &Config,
    series_id: &str,
) -> anyhow::Result<()> {
    let app = open(config).await?;
    let progress = app.watch_progress(series_id).await?;
    write_stdout(&serde_json::to_string(&progress)?)?;
    Ok(())
}

pub async fn progress_set_season(
    config: &Config,
    series_id: &str,
    season: u32,
) -> anyhow::Result<()> {
    let app = open(config).await?;
    let progress = app.advance_season(series_id, season).await?;
    write_stdout(&serde_json::to_string(&progress)?)?;
    Ok(())
}

pub async fn episodes(
    config: &Config,
    args: EpisodesArgs,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read(&args.base).await.with_context(|| {
        format!("failed to read {}", args.base.display())
    })?;
    let base: Vec<EpisodeRecord> = serde_json::from_slice(&raw)
        .with_context(|| {
            format!("{} is not an episode list", args.base.display())
        })?;

    let overlay = overlay_client(config)?;
    let stills = overlay_or_empty(&overlay, &args.tmdb_id, args.season).await;
    let episodes = merge_episodes(base, stills.as_deref());
    write_stdout(&serde_json::to_string_pretty(&episodes)?)?;
    Ok(())
}
