use std::path::Path;

use anyhow::{Result, bail};
use switchyard_state::StateStore;
use tracing::info;

use super::open_state;

pub fn show(state_path: &Path, container: &str) -> Result<()> {
    let state = open_state(state_path)?;
    let Some(snapshot) = state.load(container)? else {
        bail!("no deployment recorded for container '{container}'");
    };
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

pub fn forget(state_path: &Path, container: &str) -> Result<()> {
    if !state_path.exists() {
        bail!("no state store at {}", state_path.display());
    }
    let state = StateStore::open(state_path)?;
    if state.delete(container)? {
        info!(%container, "deployment record removed");
        println!("✓ Forgot {container}; the next deploy starts from scratch");
    } else {
        println!("No deployment recorded for {container}");
    }
    Ok(())
}
