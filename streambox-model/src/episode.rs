use serde::{Deserialize, Serialize};

/// One episode of a season as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub title: String,
    pub episode_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl EpisodeRecord {
    pub fn new(title: impl Into<String>, episode_number: u32) -> Self {
        Self {
            title: title.into(),
            episode_number,
            screenshot: None,
        }
    }
}

/// Overlay entry from the extended-episode provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EpisodeStill {
    pub episode_number: u32,
    #[serde(default)]
    pub still: Option<String>,
}

impl EpisodeStill {
    /// The still URL, if one is present and non-empty.
    pub fn usable_still(&self) -> Option<&str> {
        self.still
            .as_deref()
            .filter(|still| !still.trim().is_empty())
    }
}
