//! Catalog records consumed by the browse and show-details flows.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{EpisodeRecord, WatchProgress};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-type filter of a catalog search.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    #[default]
    All,
    Movie,
    Show,
}

impl SearchFilter {
    pub fn kind(self) -> Option<MediaKind> {
        match self {
            SearchFilter::All => None,
            SearchFilter::Movie => Some(MediaKind::Movie),
            SearchFilter::Show => Some(MediaKind::Show),
        }
    }
}

/// Unrecognised filter values search everything.
impl From<&str> for SearchFilter {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "movie" => SearchFilter::Movie,
            "show" => SearchFilter::Show,
            _ => SearchFilter::All,
        }
    }
}

/// One entry of a search result, a related-media list or a home row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: String,
    pub kind: MediaKind,
    pub title: String,
    #[serde(default)]
    pub release_year: Option<u32>,
    #[serde(default)]
    pub poster: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub characters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub release_year: Option<u32>,
    #[serde(default)]
    pub age_rating: Option<String>,
    #[serde(default)]
    pub synopsis: Option<String>,
}

/// A movie together with its cast and related titles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieView {
    pub movie: MovieDetails,
    pub imdb_id: String,
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub related: Vec<MediaSummary>,
}

/// Rows of the landing screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomeFeed {
    pub trending_movies: Vec<MediaSummary>,
    pub popular_movies: Vec<MediaSummary>,
    pub popular_shows: Vec<MediaSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub id: String,
    pub season_number: u32,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowDetails {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tmdb_id: Option<String>,
    #[serde(default)]
    pub seasons: Vec<SeasonSummary>,
}

impl ShowDetails {
    pub fn season(&self, season_number: u32) -> Option<&SeasonSummary> {
        self.seasons
            .iter()
            .find(|season| season.season_number == season_number)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDetails {
    pub id: String,
    pub show_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub season_number: u32,
    #[serde(default)]
    pub episodes: Vec<EpisodeRecord>,
}

/// Result of loading a show together with one season's enriched episodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowEpisodes {
    pub show: ShowDetails,
    pub season_number: u32,
    #[serde(default)]
    pub season_title: Option<String>,
    pub progress: WatchProgress,
    pub episodes: Vec<EpisodeRecord>,
    #[serde(default)]
    pub related: Vec<MediaSummary>,
}
