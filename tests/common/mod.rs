//! Shared utilities for integration testing.

use std::sync::Arc;

use header_forge::engine::HeaderEngine;
use header_forge::intercept::memory::MemoryLayer;
use header_forge::profile::Profile;
use header_forge::store::{JsonFileStore, SavedState};

pub struct TestRig {
    pub engine: Arc<HeaderEngine>,
    pub layer: Arc<MemoryLayer>,
    pub storage: Arc<JsonFileStore>,
    // Held so the state file outlives the test body.
    _dir: tempfile::TempDir,
}

/// Start an engine over a fresh temp state file and an in-memory layer.
pub async fn start_engine() -> TestRig {
    start_engine_with_state(None).await
}

/// Start an engine with pre-seeded saved state.
pub async fn start_engine_with_state(seed: Option<SavedState>) -> TestRig {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(JsonFileStore::new(dir.path().join("state.json")));
    if let Some(state) = seed {
        use header_forge::store::ProfileStorage;
        storage.save(&state).unwrap();
    }

    let (layer, match_rx) = MemoryLayer::new(100);
    let layer = Arc::new(layer);

    let engine = HeaderEngine::start(storage.clone(), layer.clone(), match_rx)
        .await
        .unwrap();

    TestRig {
        engine,
        layer,
        storage,
        _dir: dir,
    }
}

/// A profile with one enabled `X-Debug: 1` override.
pub fn debug_profile() -> Profile {
    let mut profile = Profile::default();
    profile.upsert_header("X-Debug", "1");
    profile
}
