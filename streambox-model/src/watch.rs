use serde::{Deserialize, Serialize};

/// Season/episode pointer persisted per series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchCursor {
    pub season: u32,
    pub episode: u32,
}

impl Default for WatchCursor {
    fn default() -> Self {
        Self {
            season: 1,
            episode: 1,
        }
    }
}

/// On-disk record stored under a series key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub last_watched: WatchCursor,
}

/// Watch progress for one series, as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchProgress {
    pub series_id: String,
    pub season: u32,
    pub episode: u32,
}

impl WatchProgress {
    pub fn from_record(
        series_id: impl Into<String>,
        record: &SeriesRecord,
    ) -> Self {
        Self {
            series_id: series_id.into(),
            season: record.last_watched.season,
            episode: record.last_watched.episode,
        }
    }

    pub fn cursor(&self) -> WatchCursor {
        WatchCursor {
            season: self.season,
            episode: self.episode,
        }
    }
}
