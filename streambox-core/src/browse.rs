//! Catalog browsing: search, movie details and the home feed.

use std::{fmt, sync::Arc};

use streambox_model::{
    HomeFeed, MediaKind, MediaSummary, MovieView, SearchFilter,
};
use tracing::{debug, info};

use crate::{
    details::{DetailsError, required_imdb_id},
    providers::{CatalogProvider, ProviderError, related_or_empty},
};

pub struct BrowseService {
    catalog: Arc<dyn CatalogProvider>,
}

impl fmt::Debug for BrowseService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowseService").finish_non_exhaustive()
    }
}

impl BrowseService {
    pub fn new(catalog: Arc<dyn CatalogProvider>) -> Self {
        Self { catalog }
    }

    pub async fn search(
        &self,
        query: &str,
        filter: SearchFilter,
    ) -> Result<Vec<MediaSummary>, ProviderError> {
        let results = match filter {
            SearchFilter::All => self.catalog.search_all(query).await?,
            SearchFilter::Movie => self.catalog.search_movies(query).await?,
            SearchFilter::Show => self.catalog.search_shows(query).await?,
        };
        debug!(query, ?filter, results = results.len(), "catalog searched");
        Ok(results)
    }

    /// Load a movie with its cast and related titles. The cast is looked up
    /// by IMDb id, so a movie without one cannot be opened.
    pub async fn movie_details(
        &self,
        movie_id: &str,
    ) -> Result<MovieView, DetailsError> {
        let movie = self.catalog.movie_details(movie_id).await?;
        let imdb_id =
            required_imdb_id(movie.imdb_id.as_deref(), &movie.id)?.to_string();
        let cast = self.catalog.movie_cast(&imdb_id).await?;
        let related = related_or_empty(
            self.catalog.as_ref(),
            movie_id,
            MediaKind::Movie,
        )
        .await;

        info!(
            movie_id,
            %imdb_id,
            cast = cast.len(),
            related = related.len(),
            "movie details loaded"
        );

        Ok(MovieView {
            movie,
            imdb_id,
            cast,
            related,
        })
    }

    /// Trending movies plus the popular movie and show rows. Any failing row
    /// fails the whole feed.
    pub async fn home_feed(&self) -> Result<HomeFeed, ProviderError> {
        let (trending_movies, popular_movies, popular_shows) =
            tokio::try_join!(
                self.catalog.trending_movies(),
                self.catalog.popular(MediaKind::Movie),
                self.catalog.popular(MediaKind::Show),
            )?;

        Ok(HomeFeed {
            trending_movies,
            popular_movies,
            popular_shows,
        })
    }
}
