#![forbid(unsafe_code)]

//! Display-settings persistence.
//!
//! Settings that should survive a session (window shape, scaling, clipping,
//! decimation, precompute policy) are captured from the viewport, stored as
//! JSON through a pluggable [`SettingsStorage`] backend, and re-applied on
//! the next launch.
//!
//! # Design invariants
//!
//! 1. Storage failures never panic; operations return `Result`.
//! 2. File writes use the write-then-rename pattern so a crash mid-save
//!    cannot corrupt an existing settings file.
//! 3. A missing or unreadable file loads as defaults, not an error the
//!    caller must special-case.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sigscope_core::{Clipping, Decimation, DownsampleMethod, ViewportState};
use sigscope_data::PrecomputePolicy;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from settings storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O failure during file operations.
    Io(io::Error),
    /// JSON encode/decode failure.
    Serialization(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Serialization(msg) => write!(f, "serialization error: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Serialization(_) => None,
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Persisted display settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Time window width in seconds.
    pub duration: f64,
    /// Visible channel count.
    pub n_channels: usize,
    /// Trace amplitude multiplier.
    pub scale_factor: f64,
    /// Out-of-range sample handling.
    pub clipping: Clipping,
    /// Decimation factor selection.
    pub decimation: Decimation,
    /// Decimation window reduction.
    pub downsample_method: DownsampleMethod,
    /// Subtract the visible-window mean per channel.
    pub remove_dc: bool,
    /// Wheel units per full window of horizontal scroll.
    pub scroll_sensitivity: f64,
    /// Whether the background precompute runs.
    pub precompute: PrecomputePolicy,
    /// Forced dark/light mode; `None` detects from the background.
    pub dark_mode: Option<bool>,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            duration: 10.0,
            n_channels: 20,
            scale_factor: 1.0,
            clipping: Clipping::default(),
            decimation: Decimation::default(),
            downsample_method: DownsampleMethod::default(),
            remove_dc: true,
            scroll_sensitivity: 100.0,
            precompute: PrecomputePolicy::default(),
            dark_mode: None,
        }
    }
}

impl DisplaySettings {
    /// Capture the persistable parts of a viewport.
    #[must_use]
    pub fn capture(viewport: &ViewportState, precompute: PrecomputePolicy) -> Self {
        Self {
            duration: viewport.duration,
            n_channels: viewport.n_channels,
            scale_factor: viewport.scale_factor,
            clipping: viewport.clipping,
            decimation: viewport.decimation,
            downsample_method: viewport.downsample_method,
            remove_dc: viewport.remove_dc,
            scroll_sensitivity: viewport.scroll_sensitivity,
            precompute,
            dark_mode: None,
        }
    }

    /// Apply the display parts onto a viewport. Window geometry (duration,
    /// channel count) is the caller's job, it must go through the clamped
    /// navigation path.
    pub fn apply(&self, viewport: &mut ViewportState) {
        viewport.scale_factor = self.scale_factor;
        viewport.clipping = self.clipping;
        viewport.decimation = self.decimation;
        viewport.downsample_method = self.downsample_method;
        viewport.remove_dc = self.remove_dc;
        viewport.scroll_sensitivity = self.scroll_sensitivity;
    }
}

// ---------------------------------------------------------------------------
// Storage backends
// ---------------------------------------------------------------------------

/// Pluggable settings storage.
pub trait SettingsStorage {
    /// Load settings; `None` when nothing was stored yet.
    fn load(&self) -> StorageResult<Option<DisplaySettings>>;
    /// Persist settings.
    fn save(&mut self, settings: &DisplaySettings) -> StorageResult<()>;
    /// Remove stored settings.
    fn clear(&mut self) -> StorageResult<()>;
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    stored: Option<DisplaySettings>,
}

impl SettingsStorage for MemoryStorage {
    fn load(&self) -> StorageResult<Option<DisplaySettings>> {
        Ok(self.stored.clone())
    }

    fn save(&mut self, settings: &DisplaySettings) -> StorageResult<()> {
        self.stored = Some(settings.clone());
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        self.stored = None;
        Ok(())
    }
}

/// JSON file storage with atomic writes.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Storage at an explicit path.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// The backing file path.
    #[must_use]
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SettingsStorage for FileStorage {
    fn load(&self) -> StorageResult<Option<DisplaySettings>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(settings) => Ok(Some(settings)),
            Err(e) => {
                // A corrupt file degrades to defaults instead of wedging
                // the session.
                tracing::warn!(path = %self.path.display(), error = %e, "unreadable settings file");
                Ok(None)
            }
        }
    }

    fn save(&mut self, settings: &DisplaySettings) -> StorageResult<()> {
        let json = serde_json::to_vec_pretty(settings)?;
        let tmp = self.path.with_extension("json.tmp");
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn clear(&mut self) -> StorageResult<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
