use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use switchyard_core::hash::hash_directory;
use switchyard_core::{BackendType, ChangeSet, ProjectConfig};
use switchyard_rollout::{ChangeDetector, CutoverCoordinator};

use super::open_state;

#[derive(Debug, Serialize)]
pub struct PlanEntry {
    pub container: String,
    pub backend: BackendType,
    pub deploy: bool,
    pub changes: ChangeSet,
    /// Code of the configuration error the deployment would stop at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<&'static str>,
}

pub fn plan(config_path: &Path, state_path: &Path, force: bool, format: &str) -> Result<()> {
    let entries = compute(config_path, state_path, force)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => print!("{}", format_plan(&entries)),
    }
    Ok(())
}

/// The plan of every container, without contacting any provider.
pub fn compute(config_path: &Path, state_path: &Path, force: bool) -> Result<Vec<PlanEntry>> {
    let config = ProjectConfig::from_file(config_path)?;
    let root = config_path.parent().unwrap_or(Path::new("."));
    let state = open_state(state_path)?;

    let mut entries = Vec::new();
    for spec in config.container_specs()? {
        let src = root.join(&spec.src);
        let hash = hash_directory(&src).with_context(|| format!("failed to hash {}", src.display()))?;
        let previous = state.load(&spec.name)?;
        let changes = ChangeDetector::detect(&spec, previous.as_ref(), &hash);
        let blocked = CutoverCoordinator::precheck(&spec, &changes)
            .err()
            .map(|e| e.code());
        entries.push(PlanEntry {
            container: spec.name.clone(),
            backend: spec.compute.backend,
            deploy: changes.should_deploy(force),
            changes,
            blocked,
        });
    }
    Ok(entries)
}

fn format_plan(entries: &[PlanEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        let action = match (entry.blocked, entry.deploy) {
            (Some(code), _) => format!("blocked ({code})"),
            (None, true) => "deploy".to_string(),
            (None, false) => "unchanged".to_string(),
        };
        out.push_str(&format!("{:<20} {:<13} {}\n", entry.container, entry.backend.as_str(), action));

        let c = &entry.changes;
        for (flag, label) in [
            (c.code_changed, "source changed"),
            (c.backend_type_changed, "compute type changed"),
            (c.compute_config_changed, "compute configuration changed"),
            (c.routing_changed, "routing changed"),
            (c.images_missing, "images missing"),
        ] {
            if flag {
                out.push_str(&format!("  - {label}\n"));
            }
        }
    }
    out
}
