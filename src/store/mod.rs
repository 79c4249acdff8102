//! Persistent state and the import/export bundle format.
//!
//! # Responsibilities
//! - Load/save the full saved state (profiles, active profile, enabled
//!   flag, timer deadline) as JSON
//! - Export profiles to the portable bundle and merge imported bundles
//!
//! # Design Decisions
//! - Storage errors propagate; no automatic retry, the caller decides
//! - Import parses the whole payload before touching the store, so a
//!   malformed bundle leaves it unchanged
//! - Imported profiles overwrite same-named existing ones; the active
//!   profile only switches if the imported name exists after the merge

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::profile::{Profile, ProfileStore};

/// Everything the daemon persists between runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SavedState {
    #[serde(flatten)]
    pub store: ProfileStore,

    /// Whether injection is on.
    pub enabled: bool,

    /// Pending auto-disable deadline, absolute unix milliseconds.
    #[serde(rename = "timerDeadlineMs", skip_serializing_if = "Option::is_none")]
    pub timer_deadline_ms: Option<u64>,
}

impl Default for SavedState {
    fn default() -> Self {
        Self {
            store: ProfileStore::default(),
            enabled: false,
            timer_deadline_ms: None,
        }
    }
}

/// Errors from the persistent store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from bundle import.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("malformed import payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("import payload contains no profiles")]
    NoProfiles,
}

/// Persistence seam for the saved state.
pub trait ProfileStorage: Send + Sync {
    fn load(&self) -> Result<SavedState, StorageError>;
    fn save(&self, state: &SavedState) -> Result<(), StorageError>;
}

/// JSON file storage.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ProfileStorage for JsonFileStore {
    /// A missing file loads the default state (single "Default" profile,
    /// injection off).
    fn load(&self) -> Result<SavedState, StorageError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no saved state, starting from defaults");
            return Ok(SavedState::default());
        }
        let content = fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&content)?;
        Ok(state)
    }

    fn save(&self, state: &SavedState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// The portable bundle: profiles plus the active-profile name.
#[derive(Debug, Deserialize, Serialize)]
struct Bundle {
    profiles: std::collections::BTreeMap<String, Profile>,

    #[serde(rename = "activeProfile", default)]
    active_profile: Option<String>,
}

/// Serialize the store to the portable bundle (pretty JSON).
pub fn export_bundle(store: &ProfileStore) -> String {
    let bundle = Bundle {
        profiles: store.profiles.clone(),
        active_profile: Some(store.active_profile.clone()),
    };
    // Bundle contains only map/string/bool/enum values; serialization
    // cannot fail.
    serde_json::to_string_pretty(&bundle).unwrap_or_default()
}

/// Merge a bundle into the store.
pub fn import_bundle(store: &mut ProfileStore, payload: &str) -> Result<(), ImportError> {
    let bundle: Bundle = serde_json::from_str(payload)?;
    if bundle.profiles.is_empty() {
        return Err(ImportError::NoProfiles);
    }

    let imported = bundle.profiles.len();
    for (name, profile) in bundle.profiles {
        store.profiles.insert(name, profile);
    }
    if let Some(active) = bundle.active_profile {
        if store.profiles.contains_key(&active) {
            store.active_profile = active;
        }
    }

    info!(imported, "profiles imported");
    Ok(())
}
