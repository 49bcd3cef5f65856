use std::{
    collections::BTreeMap,
    fmt,
    io::Write,
    path::{Path, PathBuf},
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use streambox_model::SeriesRecord;
use tracing::{debug, info};

use crate::error::StoreError;

/// Whole persisted document: series id -> record.
pub type ProgressDocument = BTreeMap<String, SeriesRecord>;

/// Durable storage for the progress document. The document is always read
/// and written whole.
#[async_trait]
pub trait ProgressBackend: Send + Sync + fmt::Debug {
    async fn load(&self) -> Result<ProgressDocument, StoreError>;

    async fn persist(
        &self,
        document: &ProgressDocument,
    ) -> Result<(), StoreError>;
}

/// JSON file backend. Writes go to a temp file in the same directory which
/// is then renamed over the target, so readers only ever see whole documents.
#[derive(Debug, Clone)]
pub struct JsonFileBackend {
    path: PathBuf,
}

impl JsonFileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl ProgressBackend for JsonFileBackend {
    async fn load(&self) -> Result<ProgressDocument, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => {
                debug!(path = %self.path.display(), "progress file is empty");
                Ok(ProgressDocument::new())
            }
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| {
                StoreError::Corrupt {
                    path: self.path.clone(),
                    source,
                }
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    path = %self.path.display(),
                    "initializing empty progress file"
                );
                let document = ProgressDocument::new();
                self.persist(&document).await?;
                Ok(document)
            }
            Err(err) => Err(self.io_error(err)),
        }
    }

    async fn persist(
        &self,
        document: &ProgressDocument,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|err| {
            StoreError::Backend(format!("failed to encode progress: {err}"))
        })?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &bytes))
            .await
            .map_err(|err| {
                StoreError::Backend(format!("progress writer panicked: {err}"))
            })?
            .map_err(|err| self.io_error(err))
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|err| err.error)?;
    Ok(())
}

/// In-memory backend. Useful for ephemeral sessions and for exercising
/// persistence failures.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: Mutex<ProgressDocument>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(document: ProgressDocument) -> Self {
        Self {
            document: Mutex::new(document),
            ..Self::default()
        }
    }

    /// Make every subsequent `persist` fail until switched off again.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Copy of the durable document as of the last successful write.
    pub fn snapshot(&self) -> ProgressDocument {
        self.document
            .lock()
            .map(|document| document.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProgressBackend for MemoryBackend {
    async fn load(&self) -> Result<ProgressDocument, StoreError> {
        self.document
            .lock()
            .map(|document| document.clone())
            .map_err(|_| StoreError::Backend("memory backend poisoned".into()))
    }

    async fn persist(
        &self,
        document: &ProgressDocument,
    ) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected write failure".into()));
        }

        let mut guard = self.document.lock().map_err(|_| {
            StoreError::Backend("memory backend poisoned".into())
        })?;
        *guard = document.clone();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
