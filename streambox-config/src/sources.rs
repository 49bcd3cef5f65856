use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::util::{non_empty, parse_csv};

/// Raw configuration as defined in a TOML file.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct FileConfig {
    #[serde(default)]
    pub worker: FileWorkerConfig,
    #[serde(default)]
    pub storage: FileStorageConfig,
    #[serde(default)]
    pub overlay: FileOverlayConfig,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileWorkerConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub program: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_buffer: Option<usize>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileStorageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_file: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct FileOverlayConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Environment-derived configuration values.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub config_path: Option<PathBuf>,
    pub worker_program: Option<PathBuf>,
    pub worker_args: Option<Vec<String>>,
    pub worker_dir: Option<PathBuf>,
    pub event_buffer: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub overlay_endpoint: Option<String>,
    pub overlay_timeout_secs: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            config_path: non_empty(&lookup, "STREAMBOX_CONFIG")
                .map(PathBuf::from),
            worker_program: non_empty(&lookup, "STREAMBOX_WORKER_PROGRAM")
                .map(PathBuf::from),
            worker_args: non_empty(&lookup, "STREAMBOX_WORKER_ARGS")
                .map(|raw| parse_csv(&raw)),
            worker_dir: non_empty(&lookup, "STREAMBOX_WORKER_DIR")
                .map(PathBuf::from),
            event_buffer: non_empty(&lookup, "STREAMBOX_EVENT_BUFFER"),
            data_dir: non_empty(&lookup, "STREAMBOX_DATA_DIR")
                .map(PathBuf::from),
            overlay_endpoint: non_empty(&lookup, "STREAMBOX_OVERLAY_ENDPOINT"),
            overlay_timeout_secs: non_empty(
                &lookup,
                "STREAMBOX_OVERLAY_TIMEOUT_SECS",
            ),
        }
    }
}
