//! Core data model definitions shared across StreamBox crates.
#![allow(missing_docs)]

pub mod catalog;
pub mod episode;
pub mod error;
pub mod scrape;
pub mod watch;

// Intentionally curated re-exports for downstream consumers.
pub use catalog::{
    CastMember, HomeFeed, MediaKind, MediaSummary, MovieDetails, MovieView,
    SearchFilter, SeasonDetails, SeasonSummary, ShowDetails, ShowEpisodes,
};
pub use episode::{EpisodeRecord, EpisodeStill};
pub use error::{ModelError, Result as ModelResult};
pub use scrape::{ScrapeEvent, ScrapeRequest, SessionId, WorkerState};
pub use watch::{SeriesRecord, WatchCursor, WatchProgress};
