//! Watch progress tracking.
//!
//! Each series has a single cursor (`last_watched.season` /
//! `last_watched.episode`) persisted in one keyed document. A cursor is
//! created with the default `{season: 1, episode: 1}` the first time a series
//! is looked at, and its season is overwritten whenever a different season of
//! the series is opened.
//!
//! Every mutation is persisted before it becomes visible: if the durable write
//! fails the in-memory copy is rolled back and the caller gets the error.

mod backend;

pub use backend::{
    JsonFileBackend, MemoryBackend, ProgressBackend, ProgressDocument,
};

use streambox_model::{SeriesRecord, WatchProgress};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::StoreError;

/// Keyed, persistent series cursor store.
#[derive(Debug)]
pub struct WatchProgressStore<B = JsonFileBackend> {
    backend: B,
    // Held across the durable write so read-modify-write sequences never
    // interleave.
    document: Mutex<ProgressDocument>,
}

impl<B: ProgressBackend> WatchProgressStore<B> {
    /// Load the persisted document, initializing an empty one if needed.
    pub async fn open(backend: B) -> Result<Self, StoreError> {
        let document = backend.load().await?;
        debug!(series = document.len(), "watch progress store opened");

        Ok(Self {
            backend,
            document: Mutex::new(document),
        })
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Stored cursor for `series_id`, creating and persisting the default
    /// when none exists yet.
    pub async fn get(
        &self,
        series_id: &str,
    ) -> Result<WatchProgress, StoreError> {
        self.update(series_id, |_| {}).await
    }

    /// Overwrite the season of `series_id`'s cursor. The episode is left as
    /// it was.
    pub async fn set_season(
        &self,
        series_id: &str,
        season: u32,
    ) -> Result<WatchProgress, StoreError> {
        self.update(series_id, |record| record.last_watched.season = season)
            .await
    }

    /// Number of series with a stored cursor.
    pub async fn len(&self) -> usize {
        self.document.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.document.lock().await.is_empty()
    }

    async fn update<F>(
        &self,
        series_id: &str,
        mutate: F,
    ) -> Result<WatchProgress, StoreError>
    where
        F: FnOnce(&mut SeriesRecord),
    {
        let mut document = self.document.lock().await;

        let previous = document.get(series_id).cloned();
        let mut record = previous.clone().unwrap_or_default();
        mutate(&mut record);

        if previous.as_ref() == Some(&record) {
            return Ok(WatchProgress::from_record(series_id, &record));
        }

        document.insert(series_id.to_string(), record.clone());
        if let Err(err) = self.backend.persist(&document).await {
            warn!(series_id, error = %err, "failed to persist watch progress");
            match previous {
                Some(previous) => {
                    document.insert(series_id.to_string(), previous);
                }
                None => {
                    document.remove(series_id);
                }
            }
            return Err(err);
        }

        debug!(
            series_id,
            season = record.last_watched.season,
            episode = record.last_watched.episode,
            "watch progress persisted"
        );
        Ok(WatchProgress::from_record(series_id, &record))
    }
}
