use std::fmt::{self, Display};

/// Errors produced by model constructors and validation routines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    EmptyTitleId,
    EpisodeWithoutSeason,
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::EmptyTitleId => {
                write!(f, "scrape request has an empty title id")
            }
            ModelError::EpisodeWithoutSeason => {
                write!(f, "scrape request names an episode but no season")
            }
        }
    }
}

impl std::error::Error for ModelError {}

pub type Result<T> = std::result::Result<T, ModelError>;
