//! # StreamBox Core
//!
//! Session orchestration and watch-progress tracking for a streaming-media
//! client.
//!
//! ## Overview
//!
//! - **Scrape sessions**: [`ScrapeOrchestrator`] runs at most one external
//!   scrape worker at a time and relays its stream sources to the caller as a
//!   [`ScrapeSession`]. Starting a new scrape supersedes the previous one.
//! - **Watch progress**: [`WatchProgressStore`] keeps one durable
//!   season/episode cursor per series.
//! - **Episode enrichment**: [`merge_episodes`] overlays extended-episode
//!   stills onto a base episode list; [`CaptainWatchClient`] fetches them.
//! - **Show details**: [`ShowDetailsService`] combines catalog metadata, the
//!   cursor and the overlay into a single season view.
//! - **Browsing**: [`BrowseService`] runs filtered catalog searches, loads
//!   movie details and assembles the home feed.
//!
//! [`StreamBox`] bundles all of the above for an embedding application.
//!
//! ## Example
//!
//! ```no_run
//! use futures::StreamExt;
//! use streambox_core::{ScrapeOrchestrator, WorkerConfig};
//! use streambox_model::ScrapeRequest;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let scraper = ScrapeOrchestrator::new(
//!     WorkerConfig::new("node").with_args(["scrape.js"]),
//! );
//! let mut session = scraper
//!     .start_scrape(ScrapeRequest::for_episode("tt0944947", 1, 2)?)
//!     .await?;
//! while let Some(event) = session.next().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![allow(missing_docs)]

pub mod app;
pub mod browse;
pub mod details;
pub mod error;
pub mod merge;
pub mod progress;
pub mod providers;
pub mod scrape;

pub use app::StreamBox;
pub use browse::BrowseService;
pub use details::{DetailsError, ShowDetailsService, ShowQuery};
pub use error::{Result, ScrapeError, StoreError};
pub use merge::merge_episodes;
pub use progress::{
    JsonFileBackend, MemoryBackend, ProgressBackend, ProgressDocument,
    WatchProgressStore,
};
pub use providers::{
    CaptainWatchClient, CatalogProvider, OverlayProvider, OverlayResponse,
    ProviderError,
};
pub use scrape::{
    ScrapeOrchestrator, ScrapeSession, ScrapeWorkerHandle, SessionInfo,
    WorkerConfig,
};
