use std::sync::Arc;

use streambox_model::{
    EpisodeRecord, EpisodeStill, HomeFeed, MediaSummary, MovieView,
    ScrapeRequest, SearchFilter, ShowEpisodes, WatchProgress,
};

use crate::{
    browse::BrowseService,
    details::{DetailsError, ShowDetailsService, ShowQuery},
    error::{Result, StoreError},
    merge,
    progress::{JsonFileBackend, ProgressBackend, WatchProgressStore},
    providers::{CatalogProvider, OverlayProvider, overlay_or_empty},
    scrape::{ScrapeOrchestrator, ScrapeSession, SessionInfo},
};

/// Everything the embedding application talks to.
pub struct StreamBox<B = JsonFileBackend> {
    scraper: ScrapeOrchestrator,
    progress: Arc<WatchProgressStore<B>>,
    overlay: Arc<dyn OverlayProvider>,
    details: Option<ShowDetailsService<B>>,
    browse: Option<BrowseService>,
}

impl<B> std::fmt::Debug for StreamBox<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamBox")
            .field("scraper", &self.scraper)
            .field("has_catalog", &self.details.is_some())
            .finish_non_exhaustive()
    }
}

impl<B: ProgressBackend> StreamBox<B> {
    pub fn new(
        scraper: ScrapeOrchestrator,
        progress: WatchProgressStore<B>,
        overlay: Arc<dyn OverlayProvider>,
    ) -> Self {
        Self {
            scraper,
            progress: Arc::new(progress),
            overlay,
            details: None,
            browse: None,
        }
    }

    /// Enable the catalog-backed operations ([`StreamBox::show_episodes`],
    /// [`StreamBox::search_media`], [`StreamBox::movie_details`] and
    /// [`StreamBox::home_feed`]).
    pub fn with_catalog(mut self, catalog: Arc<dyn CatalogProvider>) -> Self {
        self.details = Some(ShowDetailsService::new(
            Arc::clone(&catalog),
            Arc::clone(&self.overlay),
            Arc::clone(&self.progress),
        ));
        self.browse = Some(BrowseService::new(catalog));
        self
    }

    pub fn scraper(&self) -> &ScrapeOrchestrator {
        &self.scraper
    }

    pub fn progress(&self) -> &WatchProgressStore<B> {
        &self.progress
    }

    /// Start a scrape, superseding whichever one is running.
    pub async fn start_scrape(
        &self,
        request: ScrapeRequest,
    ) -> Result<ScrapeSession> {
        self.scraper.start_scrape(request).await
    }

    pub async fn current_scrape(&self) -> Option<SessionInfo> {
        self.scraper.current().await
    }

    pub async fn watch_progress(
        &self,
        series_id: &str,
    ) -> Result<WatchProgress, StoreError> {
        self.progress.get(series_id).await
    }

    pub async fn advance_season(
        &self,
        series_id: &str,
        season: u32,
    ) -> Result<WatchProgress, StoreError> {
        self.progress.set_season(series_id, season).await
    }

    pub fn merge_episodes(
        &self,
        base: Vec<EpisodeRecord>,
        overlay: Option<&[EpisodeStill]>,
    ) -> Vec<EpisodeRecord> {
        merge::merge_episodes(base, overlay)
    }

    /// Fetch the overlay for `(tmdb_id, season)` and merge it into `base`.
    /// Overlay failures leave `base` untouched.
    pub async fn enrich_episodes(
        &self,
        base: Vec<EpisodeRecord>,
        tmdb_id: &str,
        season: u32,
    ) -> Vec<EpisodeRecord> {
        let overlay =
            overlay_or_empty(self.overlay.as_ref(), tmdb_id, season).await;
        merge::merge_episodes(base, overlay.as_deref())
    }

    pub async fn show_episodes(
        &self,
        query: ShowQuery,
    ) -> Result<ShowEpisodes, DetailsError> {
        let details =
            self.details.as_ref().ok_or(DetailsError::CatalogUnavailable)?;
        details.load(query).await
    }

    pub async fn search_media(
        &self,
        query: &str,
        filter: SearchFilter,
    ) -> Result<Vec<MediaSummary>, DetailsError> {
        Ok(self.browse()?.search(query, filter).await?)
    }

    pub async fn movie_details(
        &self,
        movie_id: &str,
    ) -> Result<MovieView, DetailsError> {
        self.browse()?.movie_details(movie_id).await
    }

    pub async fn home_feed(&self) -> Result<HomeFeed, DetailsError> {
        Ok(self.browse()?.home_feed().await?)
    }

    pub async fn shutdown(&self) {
        self.scraper.shutdown().await;
    }

    fn browse(&self) -> Result<&BrowseService, DetailsError> {
        self.browse.as_ref().ok_or(DetailsError::CatalogUnavailable)
    }
}
