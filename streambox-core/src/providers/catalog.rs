use async_trait::async_trait;
use streambox_model::{
    CastMember, MediaKind, MediaSummary, MovieDetails, SeasonDetails,
    ShowDetails,
};
use tracing::warn;

use super::ProviderError;

/// Movie, show and season metadata source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn show_details(
        &self,
        show_id: &str,
    ) -> Result<ShowDetails, ProviderError>;

    async fn season_details(
        &self,
        season_id: &str,
    ) -> Result<SeasonDetails, ProviderError>;

    async fn movie_details(
        &self,
        movie_id: &str,
    ) -> Result<MovieDetails, ProviderError>;

    /// Cast list keyed by IMDb id.
    async fn movie_cast(
        &self,
        imdb_id: &str,
    ) -> Result<Vec<CastMember>, ProviderError>;

    async fn related_media(
        &self,
        id: &str,
        kind: MediaKind,
    ) -> Result<Vec<MediaSummary>, ProviderError>;

    async fn search_all(
        &self,
        query: &str,
    ) -> Result<Vec<MediaSummary>, ProviderError>;

    async fn search_movies(
        &self,
        query: &str,
    ) -> Result<Vec<MediaSummary>, ProviderError>;

    async fn search_shows(
        &self,
        query: &str,
    ) -> Result<Vec<MediaSummary>, ProviderError>;

    async fn trending_movies(
        &self,
    ) -> Result<Vec<MediaSummary>, ProviderError>;

    async fn popular(
        &self,
        kind: MediaKind,
    ) -> Result<Vec<MediaSummary>, ProviderError>;
}

/// Best-effort related-media lookup. Failures are logged and yield an empty
/// list.
pub async fn related_or_empty<P>(
    catalog: &P,
    id: &str,
    kind: MediaKind,
) -> Vec<MediaSummary>
where
    P: CatalogProvider + ?Sized,
{
    match catalog.related_media(id, kind).await {
        Ok(related) => related,
        Err(err) => {
            warn!(
                id,
                %kind,
                error = %err,
                "related media lookup failed"
            );
            Vec::new()
        }
    }
}
