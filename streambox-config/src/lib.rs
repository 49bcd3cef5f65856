//! Layered StreamBox configuration: built-in defaults, a TOML file, a `.env`
//! file and the process environment, in increasing order of precedence.
#![allow(missing_docs)]

pub mod loader;
pub mod models;
pub mod sources;
mod util;

pub use loader::{ConfigLoadError, ConfigLoader, compose, read_file_config};
pub use models::{Config, OverlaySettings, StorageSettings, WorkerSettings};
pub use sources::{EnvConfig, FileConfig};
