//! Extended-episode overlay: per-episode stills keyed by TMDB show id and
//! season number.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use streambox_model::EpisodeStill;
use tracing::{debug, warn};
use url::Url;

use super::ProviderError;

pub const DEFAULT_OVERLAY_ENDPOINT: &str =
    "https://www.captainwatch.com/tvapi/episodes";

/// Outcome of an overlay lookup that reached the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayResponse {
    Episodes(Vec<EpisodeStill>),
    /// The provider answered with a non-200 status.
    Unavailable(StatusCode),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OverlayProvider: Send + Sync {
    async fn episode_stills(
        &self,
        tmdb_id: &str,
        season: u32,
    ) -> Result<OverlayResponse, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct OverlayBody {
    #[serde(default)]
    episodes: Vec<EpisodeStill>,
}

/// Parse a 200 response body. A body without an `episodes` array is an empty
/// overlay.
pub fn parse_overlay_body(
    body: &str,
) -> Result<Vec<EpisodeStill>, ProviderError> {
    serde_json::from_str::<OverlayBody>(body)
        .map(|body| body.episodes)
        .map_err(|err| ProviderError::ParseError(err.to_string()))
}

pub struct CaptainWatchClient {
    http: reqwest::Client,
    endpoint: Url,
}

impl fmt::Debug for CaptainWatchClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptainWatchClient")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

impl CaptainWatchClient {
    pub fn new(
        endpoint: Url,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl OverlayProvider for CaptainWatchClient {
    async fn episode_stills(
        &self,
        tmdb_id: &str,
        season: u32,
    ) -> Result<OverlayResponse, ProviderError> {
        let season = season.to_string();
        let response = self
            .http
            .post(self.endpoint.clone())
            .form(&[("movieId", tmdb_id), ("seasonNumber", season.as_str())])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Ok(OverlayResponse::Unavailable(status));
        }

        let body = response.text().await?;
        parse_overlay_body(&body).map(OverlayResponse::Episodes)
    }
}

/// Best-effort overlay lookup. Every failure is logged and reported as "no
/// overlay".
pub async fn overlay_or_empty<P>(
    provider: &P,
    tmdb_id: &str,
    season: u32,
) -> Option<Vec<EpisodeStill>>
where
    P: OverlayProvider + ?Sized,
{
    match provider.episode_stills(tmdb_id, season).await {
        Ok(OverlayResponse::Episodes(stills)) => {
            debug!(tmdb_id, season, stills = stills.len(), "overlay fetched");
            Some(stills)
        }
        Ok(OverlayResponse::Unavailable(status)) => {
            debug!(tmdb_id, season, %status, "overlay unavailable");
            None
        }
        Err(err) => {
            warn!(tmdb_id, season, error = %err, "overlay lookup failed");
            None
        }
    }
}
