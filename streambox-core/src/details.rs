//! Show details flow: catalog metadata, the series' watch cursor and the
//! episode overlay combined into one view of a season.

use std::{fmt, sync::Arc};

use streambox_model::{MediaKind, SeasonDetails, ShowDetails, ShowEpisodes};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    error::StoreError,
    merge::merge_episodes,
    progress::{JsonFileBackend, ProgressBackend, WatchProgressStore},
    providers::{
        CatalogProvider, OverlayProvider, ProviderError, overlay_or_empty,
        related_or_empty,
    },
};

#[derive(Debug, Error)]
pub enum DetailsError {
    #[error("catalog lookup failed: {0}")]
    Upstream(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{media_id} has no IMDb id")]
    MissingExternalId { media_id: String },

    #[error("show {show_id} has no seasons")]
    NoSeasons { show_id: String },

    #[error("no catalog provider configured")]
    CatalogUnavailable,
}

/// Which season of a show to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowQuery {
    /// Open a show at the season its watch cursor points to.
    Initial { show_id: String },
    /// Open a specific season and move the show's cursor there.
    Season { season_id: String },
}

pub struct ShowDetailsService<B = JsonFileBackend> {
    catalog: Arc<dyn CatalogProvider>,
    overlay: Arc<dyn OverlayProvider>,
    progress: Arc<WatchProgressStore<B>>,
}

impl<B> fmt::Debug for ShowDetailsService<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShowDetailsService").finish_non_exhaustive()
    }
}

impl<B: ProgressBackend> ShowDetailsService<B> {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        overlay: Arc<dyn OverlayProvider>,
        progress: Arc<WatchProgressStore<B>>,
    ) -> Self {
        Self {
            catalog,
            overlay,
            progress,
        }
    }

    pub async fn load(
        &self,
        query: ShowQuery,
    ) -> Result<ShowEpisodes, DetailsError> {
        let (show, season, progress) = match query {
            ShowQuery::Initial { show_id } => {
                let show = self.catalog.show_details(&show_id).await?;
                let imdb_id = imdb_id(&show)?;
                let progress = self.progress.get(imdb_id).await?;
                let season_id = resume_season(&show, progress.season)?;
                let season = self.catalog.season_details(&season_id).await?;
                (show, season, progress)
            }
            ShowQuery::Season { season_id } => {
                let season = self.catalog.season_details(&season_id).await?;
                let show =
                    self.catalog.show_details(&season.show_id).await?;
                let imdb_id = imdb_id(&show)?;
                let progress = self
                    .progress
                    .set_season(imdb_id, season.season_number)
                    .await?;
                (show, season, progress)
            }
        };

        let overlay = match show.tmdb_id.as_deref() {
            Some(tmdb_id) => {
                overlay_or_empty(
                    self.overlay.as_ref(),
                    tmdb_id,
                    season.season_number,
                )
                .await
            }
            None => {
                debug!(show_id = %show.id, "no TMDB id, skipping overlay");
                None
            }
        };

        let SeasonDetails {
            title: season_title,
            season_number,
            episodes,
            ..
        } = season;
        let episodes = merge_episodes(episodes, overlay.as_deref());
        let related = related_or_empty(
            self.catalog.as_ref(),
            &show.id,
            MediaKind::Show,
        )
        .await;

        info!(
            show_id = %show.id,
            season = season_number,
            episodes = episodes.len(),
            "show details loaded"
        );

        Ok(ShowEpisodes {
            show,
            season_number,
            season_title,
            progress,
            episodes,
            related,
        })
    }
}

fn imdb_id(show: &ShowDetails) -> Result<&str, DetailsError> {
    required_imdb_id(show.imdb_id.as_deref(), &show.id)
}

pub(crate) fn required_imdb_id<'a>(
    imdb_id: Option<&'a str>,
    media_id: &str,
) -> Result<&'a str, DetailsError> {
    imdb_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DetailsError::MissingExternalId {
            media_id: media_id.to_string(),
        })
}

/// Catalog id of the season matching the stored cursor.
fn resume_season(
    show: &ShowDetails,
    season_number: u32,
) -> Result<String, DetailsError> {
    if let Some(season) = show.season(season_number) {
        return Ok(season.id.clone());
    }

    let first = show.seasons.first().ok_or_else(|| {
        DetailsError::NoSeasons {
            show_id: show.id.clone(),
        }
    })?;
    warn!(
        show_id = %show.id,
        stored = season_number,
        fallback = first.season_number,
        "stored season no longer exists"
    );
    Ok(first.id.clone())
}

#[cfg(test)]
mod tests {
    use streambox_model::{
        EpisodeRecord, EpisodeStill, MediaSummary, SeasonSummary,
    };

    use super::*;
    use crate::{
        progress::MemoryBackend,
        providers::{
            OverlayResponse, catalog::MockCatalogProvider,
            overlay::MockOverlayProvider,
        },
    };

    fn show(seasons: &[u32]) -> ShowDetails {
        ShowDetails {
            id: "show-1".into(),
            title: "Example".into(),
            imdb_id: Some("tt0944947".into()),
            tmdb_id: Some("1399".into()),
            seasons: seasons
                .iter()
                .map(|n| SeasonSummary {
                    id: format!("season-{n}"),
                    season_number: *n,
                    title: Some(format!("Season {n}")),
                })
                .collect(),
        }
    }

    fn season(n: u32) -> SeasonDetails {
        SeasonDetails {
            id: format!("season-{n}"),
            show_id: "show-1".into(),
            title: Some(format!("Season {n}")),
            season_number: n,
            episodes: vec![
                EpisodeRecord::new("Pilot", 1),
                EpisodeRecord::new("Two", 2),
            ],
        }
    }

    fn catalog(seasons: &'static [u32]) -> MockCatalogProvider {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_show_details()
            .returning(move |_| Ok(show(seasons)));
        catalog.expect_season_details().returning(|id| {
            let n = id.trim_start_matches("season-").parse().map_err(
                |_| ProviderError::ParseError(format!("bad season id {id}")),
            )?;
            Ok(season(n))
        });
        catalog.expect_related_media().returning(|id, kind| {
            Ok(vec![MediaSummary {
                id: format!("{id}-related"),
                kind,
                title: "Related".into(),
                release_year: None,
                poster: None,
            }])
        });
        catalog
    }

    fn overlay() -> MockOverlayProvider {
        let mut overlay = MockOverlayProvider::new();
        overlay.expect_episode_stills().returning(|_, _| {
            Ok(OverlayResponse::Episodes(vec![EpisodeStill {
                episode_number: 1,
                still: Some("s1.jpg".into()),
            }]))
        });
        overlay
    }

    async fn service(
        catalog: MockCatalogProvider,
        overlay: MockOverlayProvider,
    ) -> (
        ShowDetailsService<MemoryBackend>,
        Arc<WatchProgressStore<MemoryBackend>>,
    ) {
        let store = Arc::new(
            WatchProgressStore::open(MemoryBackend::new()).await.unwrap(),
        );
        let service = ShowDetailsService::new(
            Arc::new(catalog),
            Arc::new(overlay),
            Arc::clone(&store),
        );
        (service, store)
    }

    #[tokio::test]
    async fn initial_load_opens_stored_season() {
        let (service, store) = service(catalog(&[1, 2, 3]), overlay()).await;
        store.set_season("tt0944947", 2).await.unwrap();

        let loaded = service
            .load(ShowQuery::Initial {
                show_id: "show-1".into(),
            })
            .await
            .unwrap();

        assert_eq!(loaded.season_number, 2);
        assert_eq!(loaded.season_title.as_deref(), Some("Season 2"));
        assert_eq!(loaded.progress.season, 2);
        assert_eq!(loaded.episodes[0].screenshot.as_deref(), Some("s1.jpg"));
        assert_eq!(loaded.episodes[1].screenshot, None);
    }

    #[tokio::test]
    async fn initial_load_falls_back_to_first_season() {
        let (service, store) = service(catalog(&[1, 2]), overlay()).await;
        store.set_season("tt0944947", 7).await.unwrap();

        let loaded = service
            .load(ShowQuery::Initial {
                show_id: "show-1".into(),
            })
            .await
            .unwrap();

        assert_eq!(loaded.season_number, 1);
        assert_eq!(loaded.progress.season, 7);
    }

    #[tokio::test]
    async fn season_load_moves_cursor() {
        let (service, store) = service(catalog(&[1, 2, 3]), overlay()).await;

        let loaded = service
            .load(ShowQuery::Season {
                season_id: "season-3".into(),
            })
            .await
            .unwrap();

        assert_eq!(loaded.season_number, 3);
        assert_eq!((loaded.progress.season, loaded.progress.episode), (3, 1));
        assert_eq!(store.get("tt0944947").await.unwrap().season, 3);
    }

    #[tokio::test]
    async fn overlay_failure_keeps_base_episodes() {
        let mut overlay = MockOverlayProvider::new();
        overlay
            .expect_episode_stills()
            .returning(|_, _| Err(ProviderError::ParseError("down".into())));
        let (service, _) = service(catalog(&[1]), overlay).await;

        let loaded = service
            .load(ShowQuery::Initial {
                show_id: "show-1".into(),
            })
            .await
            .unwrap();

        assert_eq!(loaded.episodes, season(1).episodes);
    }

    #[tokio::test]
    async fn missing_imdb_id_is_an_error() {
        let mut catalog = MockCatalogProvider::new();
        catalog.expect_show_details().returning(|_| {
            Ok(ShowDetails {
                imdb_id: None,
                ..show(&[1])
            })
        });
        let (service, store) = service(catalog, overlay()).await;

        let err = service
            .load(ShowQuery::Initial {
                show_id: "show-1".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DetailsError::MissingExternalId { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn catalog_failure_propagates() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_season_details()
            .returning(|_| Err(ProviderError::ParseError("gone".into())));
        let (service, _) = service(catalog, overlay()).await;

        let err = service
            .load(ShowQuery::Season {
                season_id: "season-9".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DetailsError::Upstream(ProviderError::ParseError(_))
        ));
    }

    #[tokio::test]
    async fn related_shows_are_attached() {
        let (service, _) = service(catalog(&[1]), overlay()).await;

        let loaded = service
            .load(ShowQuery::Initial {
                show_id: "show-1".into(),
            })
            .await
            .unwrap();

        assert_eq!(loaded.related.len(), 1);
        assert_eq!(loaded.related[0].id, "show-1-related");
        assert_eq!(loaded.related[0].kind, MediaKind::Show);
    }

    #[tokio::test]
    async fn related_failure_leaves_list_empty() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_show_details()
            .returning(|_| Ok(show(&[1])));
        catalog.expect_season_details().returning(|_| Ok(season(1)));
        catalog
            .expect_related_media()
            .times(1)
            .returning(|_, _| Err(ProviderError::ParseError("down".into())));
        let (service, _) = service(catalog, overlay()).await;

        let loaded = service
            .load(ShowQuery::Initial {
                show_id: "show-1".into(),
            })
            .await
            .unwrap();

        assert!(loaded.related.is_empty());
        assert_eq!(loaded.episodes.len(), 2);
    }
}
