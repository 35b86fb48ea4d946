//! Durable storage for the cart between sessions.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use thiserror::Error;

use techmart_core::CartState;

/// Errors that can occur while loading or saving the cart.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid cart data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Somewhere a [`CartState`] survives restarts.
///
/// Calls are blocking; async callers run them on the blocking pool.
pub trait CartStorage: Send + Sync + 'static {
    /// The last saved cart, or `None` if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored data cannot be read or parsed.
    fn load(&self) -> Result<Option<CartState>, StorageError>;

    /// Replace the stored cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn save(&self, state: &CartState) -> Result<(), StorageError>;
}

// =============================================================================
// JSON file
// =============================================================================

/// Cart stored as pretty-printed JSON in a single file.
///
/// Writes go to a sibling temp file which is fsynced and renamed over the
/// target, so a crash mid-write leaves the previous cart intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map_or_else(|| OsString::from("cart.json"), OsString::from);
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CartStorage for JsonFileStorage {
    fn load(&self) -> Result<Option<CartState>, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, state: &CartState) -> Result<(), StorageError> {
        let json = serde_json::to_vec_pretty(state)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        let written = File::create(&temp).and_then(|mut file| {
            file.write_all(&json)?;
            file.sync_all()
        });

        if let Err(e) = written.and_then(|()| fs::rename(&temp, &self.path)) {
            let _ = fs::remove_file(&temp);
            return Err(e.into());
        }

        Ok(())
    }
}

// =============================================================================
// In-memory
// =============================================================================

/// Storage kept in memory. Counts saves and can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    state: Mutex<Option<CartState>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that already holds `state`.
    #[must_use]
    pub fn with_state(state: CartState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// Make every subsequent call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The currently stored cart.
    #[must_use]
    pub fn snapshot(&self) -> Option<CartState> {
        self.state.lock().ok().and_then(|guard| guard.clone())
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("memory storage set to fail".into()));
        }
        Ok(())
    }
}

impl CartStorage for MemoryStorage {
    fn load(&self) -> Result<Option<CartState>, StorageError> {
        self.check()?;
        let guard = self
            .state
            .lock()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        Ok(guard.clone())
    }

    fn save(&self, state: &CartState) -> Result<(), StorageError> {
        self.check()?;
        let mut guard = self
            .state
            .lock()
            .map_err(|_| StorageError::Unavailable("lock poisoned".into()))?;
        *guard = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
