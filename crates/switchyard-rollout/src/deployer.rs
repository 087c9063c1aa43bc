//! Deployer: runs every container of a project through change detection
//! and, when needed, the cutover protocol.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use switchyard_core::hash::hash_directory;
use switchyard_core::provider::{
    ArtifactBuilder, AutoscalingClient, FunctionClient, LoadBalancerClient, OrchestrationClient,
    RoleProvisioner, TelemetryClient,
};
use switchyard_core::redact::redact_spec;
use switchyard_core::{
    BackendType, ChangeSet, ContainerSnapshot, ContainerSpec, DeploymentRecord, ProjectConfig,
    epoch_secs,
};
use switchyard_health::{CancelSignal, PollSettings};
use switchyard_state::StateStore;
use tracing::{error, info, warn};

use crate::artifacts::ArtifactPipeline;
use crate::change::ChangeDetector;
use crate::concurrency::{ConcurrencyCoordinator, DEFAULT_CONTAINER_CONCURRENCY};
use crate::context::{Checkpointer, DeployContext};
use crate::cutover::CutoverCoordinator;
use crate::error::{ConfigurationError, DeployError};
use crate::routing::Router;
use crate::strategy::{FunctionStrategy, OrchestratedStrategy};

/// Provider collaborators, one per control-plane API.
#[derive(Clone)]
pub struct Providers {
    pub artifacts: Arc<dyn ArtifactBuilder>,
    pub functions: Arc<dyn FunctionClient>,
    pub orchestration: Arc<dyn OrchestrationClient>,
    pub load_balancer: Arc<dyn LoadBalancerClient>,
    pub autoscaling: Arc<dyn AutoscalingClient>,
    pub telemetry: Arc<dyn TelemetryClient>,
    pub roles: Arc<dyn RoleProvisioner>,
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Deploy even when nothing changed.
    pub force: bool,
    /// Containers deployed at once.
    pub container_concurrency: usize,
    pub cancel: CancelSignal,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            force: false,
            container_concurrency: DEFAULT_CONTAINER_CONCURRENCY,
            cancel: CancelSignal::never(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ContainerOutcome {
    /// Nothing changed; no provider was contacted.
    Skipped,
    Deployed {
        backend: BackendType,
        endpoint: Option<String>,
        changes: ChangeSet,
    },
}

#[derive(Debug)]
pub struct ContainerReport {
    pub name: String,
    pub outcome: Result<ContainerOutcome, DeployError>,
}

pub struct Deployer {
    config: ProjectConfig,
    root: PathBuf,
    providers: Providers,
    state: StateStore,
    poll: PollSettings,
}

impl Deployer {
    /// `root` is the project directory container `src` paths are relative to.
    pub fn new(config: ProjectConfig, root: impl Into<PathBuf>, providers: Providers, state: StateStore) -> Self {
        let poll = PollSettings::from(&config.deployment.polling);
        Self {
            config,
            root: root.into(),
            providers,
            state,
            poll,
        }
    }

    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll = poll;
        self
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Deploy every container. A failing container does not stop its
    /// siblings; each gets its own report in declaration order.
    pub async fn deploy_project(&self, options: &DeployOptions) -> Result<Vec<ContainerReport>, DeployError> {
        let specs = self
            .config
            .container_specs()
            .map_err(ConfigurationError::from)?;
        let forward_token = self.state.ensure_forward_token()?;
        let coordinator = Arc::new(ConcurrencyCoordinator::new(options.container_concurrency));
        let cutover = self.cutover(coordinator.clone(), forward_token);

        info!(
            project = %self.config.project.name,
            stage = %self.config.project.stage,
            containers = specs.len(),
            "deploying project"
        );

        let runs = specs.iter().map(|spec| {
            let coordinator = &coordinator;
            let cutover = &cutover;
            async move {
                let outcome = self.deploy_container(spec, options, coordinator, cutover).await;
                if let Err(e) = &outcome {
                    error!(container = %spec.name, code = e.code(), error = %e, "container deployment failed");
                    if let Some(hint) = e.hint() {
                        warn!(container = %spec.name, %hint, "remediation");
                    }
                }
                ContainerReport {
                    name: spec.name.clone(),
                    outcome,
                }
            }
        });
        Ok(join_all(runs).await)
    }

    fn cutover(&self, coordinator: Arc<ConcurrencyCoordinator>, forward_token: String) -> CutoverCoordinator {
        let p = &self.providers;
        CutoverCoordinator::new(
            Router::new(p.load_balancer.clone(), coordinator, forward_token),
            ArtifactPipeline::new(p.artifacts.clone()),
            Arc::new(FunctionStrategy::new(p.functions.clone(), p.roles.clone())),
            Arc::new(OrchestratedStrategy::new(
                p.orchestration.clone(),
                p.roles.clone(),
                p.autoscaling.clone(),
                p.telemetry.clone(),
                self.poll,
            )),
        )
    }

    async fn deploy_container(
        &self,
        spec: &ContainerSpec,
        options: &DeployOptions,
        coordinator: &ConcurrencyCoordinator,
        cutover: &CutoverCoordinator,
    ) -> Result<ContainerOutcome, DeployError> {
        let mut cancel = options.cancel.clone();
        let _slot = tokio::select! {
            slot = coordinator.container_slot() => slot.map_err(|_| DeployError::Cancelled)?,
            _ = cancel.cancelled() => return Err(DeployError::Cancelled),
        };

        let previous = self.state.load(&spec.name)?;
        let source_dir = self.root.join(&spec.src);
        let source_hash = hash_source(source_dir.clone()).await?;
        let changes = ChangeDetector::detect(spec, previous.as_ref(), &source_hash);

        let applied_spec = previous.as_ref().and_then(|p| p.spec.as_ref());
        let mut record = previous
            .as_ref()
            .map(|p| p.record.clone())
            .unwrap_or_default();

        if !changes.should_deploy(options.force) {
            record.deployed_on_last_deployment = false;
            self.state.save(&ContainerSnapshot {
                name: spec.name.clone(),
                spec: applied_spec.cloned(),
                record,
            })?;
            info!(container = %spec.name, "no changes, skipping");
            return Ok(ContainerOutcome::Skipped);
        }
        info!(container = %spec.name, ?changes, force = options.force, "changes detected");

        let (health_check_path, inferred) = spec.routing.resolved_health_check_path();
        if inferred {
            warn!(
                container = %spec.name,
                path = %health_check_path,
                "routing.health_check_path not set, using path inferred from path_pattern"
            );
        }

        let mut ctx = DeployContext {
            project: &self.config,
            spec,
            changes,
            force: options.force,
            source_dir,
            source_hash: source_hash.clone(),
            health_check_path,
            target_group: None,
            checkpoint: Checkpointer::new(&self.state, &spec.name, applied_spec),
            cancel,
        };

        match cutover.run(&mut ctx, &mut record).await {
            Ok(provisioned) => {
                record.source_hash = Some(source_hash);
                record.backend = Some(spec.compute.backend);
                record.time_last_deployed = Some(epoch_secs());
                record.deployed_on_last_deployment = true;
                self.state.save(&ContainerSnapshot {
                    name: spec.name.clone(),
                    spec: Some(redact_spec(spec)),
                    record,
                })?;
                Ok(ContainerOutcome::Deployed {
                    backend: spec.compute.backend,
                    endpoint: provisioned.endpoint().map(str::to_string),
                    changes,
                })
            }
            Err(e) => {
                record.deployed_on_last_deployment = false;
                self.save_failed(spec, applied_spec, record);
                Err(e)
            }
        }
    }

    /// Best effort: the deployment error matters more than a failed save.
    fn save_failed(&self, spec: &ContainerSpec, applied_spec: Option<&ContainerSpec>, record: DeploymentRecord) {
        let snapshot = ContainerSnapshot {
            name: spec.name.clone(),
            spec: applied_spec.cloned(),
            record,
        };
        if let Err(e) = self.state.save(&snapshot) {
            warn!(container = %spec.name, error = %e, "failed to persist record after failed deployment");
        }
    }
}

async fn hash_source(dir: PathBuf) -> Result<String, DeployError> {
    let path = dir.clone();
    tokio::task::spawn_blocking(move || hash_directory(&dir))
        .await
        .map_err(std::io::Error::other)
        .and_then(|hashed| hashed)
        .map_err(|source| DeployError::Source { path, source })
}
