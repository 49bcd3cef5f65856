use std::path::PathBuf;

use streambox_model::ModelError;
use thiserror::Error;

/// Failures starting a scrape session. Protocol violations are not errors
/// here: they arrive on the session stream as a terminal event.
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("invalid scrape request: {0}")]
    InvalidRequest(#[from] ModelError),

    #[error("failed to spawn scrape worker {program}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("scrape worker spawned without a stdout pipe")]
    MissingStdout,

    #[error("scrape orchestrator is shut down")]
    ShutDown,
}

/// Failures of the durable watch-progress store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("progress store I/O error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("progress store at {path} is corrupt")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("progress store backend error: {0}")]
    Backend(String),
}

pub type Result<T, E = ScrapeError> = std::result::Result<T, E>;
