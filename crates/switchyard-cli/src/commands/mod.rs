pub mod plan;
pub mod scaling;
pub mod state;

use std::path::Path;

use anyhow::{Context, Result};
use switchyard_state::StateStore;

/// Open the state store, or an empty in-memory one if none exists yet so
/// read-only commands never create files.
pub fn open_state(path: &Path) -> Result<StateStore> {
    if path.exists() {
        StateStore::open(path).with_context(|| format!("failed to open state store {}", path.display()))
    } else {
        tracing::debug!(path = %path.display(), "no state store yet");
        Ok(StateStore::open_in_memory()?)
    }
}
