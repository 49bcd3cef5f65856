//! Scrape session types exchanged between the orchestrator, its workers and
//! subscribers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, Result};

/// Identity of one scrape session (one worker from spawn to termination).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Parameters of one scrape. Season and episode are absent for movies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScrapeRequest {
    title_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    season: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    episode: Option<u32>,
}

impl ScrapeRequest {
    /// Validates and builds a request.
    ///
    /// The title id must be non-empty, and an episode can only be given
    /// together with a season since the worker receives them positionally.
    pub fn new(
        title_id: impl Into<String>,
        season: Option<u32>,
        episode: Option<u32>,
    ) -> Result<Self> {
        let title_id = title_id.into().trim().to_string();
        if title_id.is_empty() {
            return Err(ModelError::EmptyTitleId);
        }
        if season.is_none() && episode.is_some() {
            return Err(ModelError::EpisodeWithoutSeason);
        }

        Ok(Self {
            title_id,
            season,
            episode,
        })
    }

    pub fn movie(title_id: impl Into<String>) -> Result<Self> {
        Self::new(title_id, None, None)
    }

    pub fn for_episode(
        title_id: impl Into<String>,
        season: u32,
        episode: u32,
    ) -> Result<Self> {
        Self::new(title_id, Some(season), Some(episode))
    }

    pub fn title_id(&self) -> &str {
        &self.title_id
    }

    pub fn season(&self) -> Option<u32> {
        self.season
    }

    pub fn episode(&self) -> Option<u32> {
        self.episode
    }

    pub fn is_movie(&self) -> bool {
        self.season.is_none()
    }

    /// Ordered positional worker parameters: `[title_id, season?, episode?]`.
    /// Absent values are omitted rather than passed as empty strings.
    pub fn worker_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(3);
        args.push(self.title_id.clone());
        args.extend(self.season.map(|season| season.to_string()));
        args.extend(self.episode.map(|episode| episode.to_string()));
        args
    }
}

impl fmt::Display for ScrapeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.season, self.episode) {
            (Some(season), Some(episode)) => {
                write!(f, "{} S{:02}E{:02}", self.title_id, season, episode)
            }
            (Some(season), None) => {
                write!(f, "{} S{:02}", self.title_id, season)
            }
            _ => f.write_str(&self.title_id),
        }
    }
}

/// Event relayed from a worker to the session subscriber.
///
/// `Finished` and `UnknownEvent` are terminal: nothing follows them on the
/// same session stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ScrapeEvent {
    /// A playable stream source, forwarded verbatim from the worker.
    #[serde(rename = "stream")]
    StreamFound(serde_json::Value),
    /// The worker reported completion.
    Finished,
    /// The worker broke protocol; carries the raw offending message.
    UnknownEvent(String),
}

impl ScrapeEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ScrapeEvent::StreamFound(_))
    }
}

/// Lifecycle of a worker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    Spawning,
    Running,
    Finishing,
    Terminated,
}

impl WorkerState {
    pub fn is_live(&self) -> bool {
        !matches!(self, WorkerState::Terminated)
    }
}
