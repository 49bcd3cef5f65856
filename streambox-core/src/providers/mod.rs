pub mod catalog;
pub mod overlay;

pub use catalog::{CatalogProvider, related_or_empty};
pub use overlay::{
    CaptainWatchClient, DEFAULT_OVERLAY_ENDPOINT, OverlayProvider,
    OverlayResponse, overlay_or_empty, parse_overlay_body,
};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}
