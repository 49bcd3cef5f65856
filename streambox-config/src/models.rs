use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use streambox_core::WorkerConfig;
use url::Url;

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub worker: WorkerSettings,
    pub storage: StorageSettings,
    pub overlay: OverlaySettings,
    /// TOML file the configuration was read from, if any.
    pub source: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub event_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub data_dir: PathBuf,
    pub series_file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlaySettings {
    pub endpoint: Url,
    pub timeout: Duration,
}

impl Config {
    pub fn worker_config(&self) -> WorkerConfig {
        let mut config = WorkerConfig::new(&self.worker.program)
            .with_args(self.worker.args.iter().cloned())
            .with_event_buffer(self.worker.event_buffer);
        if let Some(dir) = &self.worker.working_dir {
            config = config.with_working_dir(dir);
        }
        config
    }
}

impl StorageSettings {
    /// Location of the watch-progress document.
    pub fn series_path(&self) -> PathBuf {
        self.data_dir.join(&self.series_file)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}
