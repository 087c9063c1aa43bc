//! Per-container inputs shared by every deployment phase.

use std::collections::BTreeMap;
use std::path::PathBuf;

use switchyard_core::provider::NetworkAttachment;
use switchyard_core::{
    ChangeSet, ContainerSnapshot, ContainerSpec, DeploymentRecord, ProjectConfig, ProviderError,
};
use switchyard_health::CancelSignal;
use switchyard_state::StateStore;
use tracing::debug;

use crate::error::DeployError;

/// Saves the in-flight record next to the spec of the last completed
/// deployment, so an interrupted run leaves the previous spec in place.
pub struct Checkpointer<'a> {
    store: &'a StateStore,
    container: &'a str,
    applied_spec: Option<&'a ContainerSpec>,
}

impl<'a> Checkpointer<'a> {
    pub fn new(store: &'a StateStore, container: &'a str, applied_spec: Option<&'a ContainerSpec>) -> Self {
        Self {
            store,
            container,
            applied_spec,
        }
    }

    pub fn save(&self, record: &DeploymentRecord, phase: &str) -> Result<(), DeployError> {
        self.store.save(&ContainerSnapshot {
            name: self.container.to_string(),
            spec: self.applied_spec.cloned(),
            record: record.clone(),
        })?;
        debug!(container = %self.container, phase, "checkpoint saved");
        Ok(())
    }
}

pub struct DeployContext<'a> {
    pub project: &'a ProjectConfig,
    pub spec: &'a ContainerSpec,
    pub changes: ChangeSet,
    pub force: bool,
    pub source_dir: PathBuf,
    pub source_hash: String,
    /// Resolved health-check path, inferred from the path pattern if unset.
    pub health_check_path: String,
    /// Destination target group, known after routing is staged.
    pub target_group: Option<String>,
    pub checkpoint: Checkpointer<'a>,
    pub cancel: CancelSignal,
}

impl DeployContext<'_> {
    /// `<project>-<stage>-<container>`, the base name of every backend resource.
    pub fn resource_name(&self) -> String {
        format!("{}-{}", self.project.resource_name_base(), self.spec.name)
    }

    /// User environment plus the variables every backend receives.
    pub fn environment(&self) -> BTreeMap<String, String> {
        let mut env = self.spec.environment.clone();
        env.insert("SWITCHYARD_PROJECT".to_string(), self.project.project.name.clone());
        env.insert("SWITCHYARD_STAGE".to_string(), self.project.project.stage.clone());
        env.insert("SWITCHYARD_CONTAINER".to_string(), self.spec.name.clone());
        env.insert(
            "SWITCHYARD_COMPUTE_TYPE".to_string(),
            self.spec.compute.backend.as_str().to_string(),
        );
        env.insert(
            "SWITCHYARD_ROUTING_PATH".to_string(),
            self.spec.routing.path_pattern.clone(),
        );
        env
    }

    pub fn network(&self) -> NetworkAttachment {
        NetworkAttachment {
            subnets: self.project.deployment.subnets.clone(),
            security_groups: self.project.deployment.security_groups.clone(),
        }
    }

    pub fn container_port(&self) -> u16 {
        self.project.deployment.container_port
    }

    /// The staged target group. Strategies run only after staging.
    pub fn destination(&self) -> Result<&str, DeployError> {
        self.target_group.as_deref().ok_or_else(|| {
            ProviderError::NotFound {
                service: "load-balancer",
                resource: format!("target group for {}", self.spec.name),
            }
            .into()
        })
    }

    pub fn check_cancelled(&self) -> Result<(), DeployError> {
        if self.cancel.is_cancelled() {
            Err(DeployError::Cancelled)
        } else {
            Ok(())
        }
    }
}
