//! Persisted rotation cursor

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage::write_atomic;

/// Cursor value meaning "nothing selected yet"
pub const UNINITIALIZED: i64 = -1;

/// Storage for the last selected index
///
/// `read` never fails: a missing, empty, negative or non-numeric value is
/// reported as [`UNINITIALIZED`].
#[async_trait]
pub trait RotationStateStore: Send + Sync {
    async fn read(&self) -> i64;

    async fn write(&self, index: usize) -> Result<()>;
}

/// Interpret stored cursor text
pub fn parse_state(text: &str) -> i64 {
    let text = text.trim();
    if text.is_empty() {
        return UNINITIALIZED;
    }

    match text.parse::<i64>() {
        Ok(value) if value >= 0 => value,
        Ok(_) => UNINITIALIZED,
        Err(_) => {
            warn!("Rotation state {:?} is not a number, starting over", text);
            UNINITIALIZED
        }
    }
}

/// Cursor stored as decimal text in a file
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader never observes a partially written value.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the state file holding `-1` if it does not exist yet
    ///
    /// Returns whether the file was created.
    pub async fn initialize(&self) -> Result<bool> {
        if tokio::fs::try_exists(&self.path).await? {
            return Ok(false);
        }

        write_atomic(&self.path, UNINITIALIZED.to_string().as_bytes()).await?;
        info!("Initialized rotation state at {}", self.path.display());
        Ok(true)
    }
}

#[async_trait]
impl RotationStateStore for FileStateStore {
    async fn read(&self) -> i64 {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => parse_state(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Rotation state {} absent", self.path.display());
                UNINITIALIZED
            }
            Err(e) => {
                warn!(
                    "Failed to read rotation state {}: {}",
                    self.path.display(),
                    e
                );
                UNINITIALIZED
            }
        }
    }

    async fn write(&self, index: usize) -> Result<()> {
        write_atomic(&self.path, index.to_string().as_bytes()).await
    }
}

/// Cursor kept in memory, holding the raw text as a file would
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    raw: Mutex<Option<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    /// Current stored text, `None` if never written
    pub fn raw(&self) -> Option<String> {
        self.raw.lock().clone()
    }
}

#[async_trait]
impl RotationStateStore for MemoryStateStore {
    async fn read(&self) -> i64 {
        self.raw
            .lock()
            .as_deref()
            .map(parse_state)
            .unwrap_or(UNINITIALIZED)
    }

    async fn write(&self, index: usize) -> Result<()> {
        *self.raw.lock() = Some(index.to_string());
        Ok(())
    }
}
