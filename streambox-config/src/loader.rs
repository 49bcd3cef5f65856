use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use streambox_core::providers::DEFAULT_OVERLAY_ENDPOINT;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::{
    models::{Config, OverlaySettings, StorageSettings, WorkerSettings},
    sources::{EnvConfig, FileConfig},
};

const DEFAULT_CONFIG_FILE: &str = "streambox.toml";
const DEFAULT_WORKER_PROGRAM: &str = "node";
const DEFAULT_WORKER_SCRIPT: &str = "scrape.js";
const DEFAULT_EVENT_BUFFER: usize = 64;
const DEFAULT_SERIES_FILE: &str = "series-data.json";
const DEFAULT_OVERLAY_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("config file {path} does not exist")]
    MissingConfig { path: PathBuf },
    #[error("failed to read config file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidNumber { name: &'static str, value: String },
    #[error("worker program must not be empty")]
    EmptyWorkerProgram,
    #[error("worker event buffer must be at least 1")]
    ZeroEventBuffer,
    #[error("invalid overlay endpoint '{url}'")]
    InvalidOverlayUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("overlay endpoint '{url}' must use http or https")]
    UnsupportedOverlayScheme { url: String },
    #[error(transparent)]
    EnvFile(#[from] dotenvy::Error),
}

#[derive(Debug, Default, Clone)]
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_env_file<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.env_file = Some(path.into());
        self
    }

    /// Load `.env`, read the environment and the TOML file, and resolve the
    /// final configuration.
    pub fn load(&self) -> Result<Config, ConfigLoadError> {
        let env_file_loaded = match &self.env_file {
            Some(path) => dotenvy::from_path(path).map(|_| true).or_else(
                |err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                },
            )?,
            None => {
                dotenvy::dotenv().map(|_| true).or_else(|err| match err {
                    dotenvy::Error::Io(_) => Ok(false),
                    _ => Err(err),
                })?
            }
        };
        debug!(env_file_loaded, "environment gathered");

        let env = EnvConfig::gather();
        let (file, source) = self.load_file_config(&env)?;
        compose(file, env, source)
    }

    fn load_file_config(
        &self,
        env: &EnvConfig,
    ) -> Result<(Option<FileConfig>, Option<PathBuf>), ConfigLoadError> {
        let (path, explicit) =
            match (&self.config_path, &env.config_path) {
                (Some(path), _) | (None, Some(path)) => (path.clone(), true),
                (None, None) => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
            };

        if !path.exists() {
            if explicit {
                return Err(ConfigLoadError::MissingConfig { path });
            }
            return Ok((None, None));
        }

        let file = read_file_config(&path)?;
        Ok((Some(file), Some(path)))
    }
}

pub fn read_file_config(path: &Path) -> Result<FileConfig, ConfigLoadError> {
    let contents =
        fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    toml::from_str(&contents).map_err(|source| ConfigLoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Merge the sources. Environment values win over file values, which win
/// over the built-in defaults.
pub fn compose(
    file: Option<FileConfig>,
    env: EnvConfig,
    source: Option<PathBuf>,
) -> Result<Config, ConfigLoadError> {
    let FileConfig {
        worker: file_worker,
        storage: file_storage,
        overlay: file_overlay,
    } = file.unwrap_or_default();

    let program = env
        .worker_program
        .or(file_worker.program)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKER_PROGRAM));
    if program.as_os_str().is_empty() {
        return Err(ConfigLoadError::EmptyWorkerProgram);
    }

    let event_buffer = match env.event_buffer {
        Some(raw) => parse_number("STREAMBOX_EVENT_BUFFER", &raw)?,
        None => file_worker.event_buffer.unwrap_or(DEFAULT_EVENT_BUFFER),
    };
    if event_buffer == 0 {
        return Err(ConfigLoadError::ZeroEventBuffer);
    }

    let worker = WorkerSettings {
        program,
        args: env
            .worker_args
            .or(file_worker.args)
            .unwrap_or_else(|| vec![DEFAULT_WORKER_SCRIPT.to_string()]),
        working_dir: env.worker_dir.or(file_worker.working_dir),
        event_buffer,
    };

    let storage = StorageSettings {
        data_dir: env
            .data_dir
            .or(file_storage.data_dir)
            .unwrap_or_else(default_data_dir),
        series_file: file_storage
            .series_file
            .unwrap_or_else(|| DEFAULT_SERIES_FILE.to_string()),
    };

    let raw_endpoint = env
        .overlay_endpoint
        .or(file_overlay.endpoint)
        .unwrap_or_else(|| DEFAULT_OVERLAY_ENDPOINT.to_string());
    let timeout_secs = match env.overlay_timeout_secs {
        Some(raw) => parse_number("STREAMBOX_OVERLAY_TIMEOUT_SECS", &raw)?,
        None => file_overlay
            .timeout_secs
            .unwrap_or(DEFAULT_OVERLAY_TIMEOUT_SECS),
    };
    let overlay = OverlaySettings {
        endpoint: parse_endpoint(&raw_endpoint)?,
        timeout: Duration::from_secs(timeout_secs),
    };

    Ok(Config {
        worker,
        storage,
        overlay,
        source,
    })
}

fn parse_number<T: std::str::FromStr>(
    name: &'static str,
    raw: &str,
) -> Result<T, ConfigLoadError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigLoadError::InvalidNumber {
            name,
            value: raw.to_string(),
        })
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigLoadError> {
    let url =
        Url::parse(raw).map_err(|source| ConfigLoadError::InvalidOverlayUrl {
            url: raw.to_string(),
            source,
        })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(ConfigLoadError::UnsupportedOverlayScheme {
            url: raw.to_string(),
        }),
    }
}

fn default_data_dir() -> PathBuf {
    match dirs::data_dir() {
        Some(dir) => dir.join("streambox"),
        None => {
            warn!("no platform data directory, using ./.streambox");
            PathBuf::from(".streambox")
        }
    }
}
