//! CutoverCoordinator: zero-downtime deployment of one container.
//!
//! ```text
//!   precheck ──► A: stage routing (deprioritized rule)
//!            ──► B: artifacts + destination strategy, until healthy
//!            ──► C: promote rule to production      ◄── traffic switch
//!            ──► D: decommission the previous backend
//! ```
//!
//! Phases run strictly in order and the record is checkpointed after
//! each. Everything before C is idempotent, so a failed run can simply be
//! repeated.

use std::sync::Arc;

use switchyard_core::{BackendType, ChangeSet, ContainerSpec, DeploymentRecord};
use tracing::info;

use crate::artifacts::ArtifactPipeline;
use crate::context::DeployContext;
use crate::error::{ConfigurationError, DeployError};
use crate::routing::Router;
use crate::strategy::{BackendResourceRef, ComputeDeploymentStrategy};

pub struct CutoverCoordinator {
    router: Router,
    artifacts: ArtifactPipeline,
    function: Arc<dyn ComputeDeploymentStrategy>,
    orchestrated: Arc<dyn ComputeDeploymentStrategy>,
}

impl CutoverCoordinator {
    pub fn new(
        router: Router,
        artifacts: ArtifactPipeline,
        function: Arc<dyn ComputeDeploymentStrategy>,
        orchestrated: Arc<dyn ComputeDeploymentStrategy>,
    ) -> Self {
        Self {
            router,
            artifacts,
            function,
            orchestrated,
        }
    }

    pub fn strategy(&self, backend: BackendType) -> &dyn ComputeDeploymentStrategy {
        match backend {
            BackendType::Function => self.function.as_ref(),
            BackendType::Orchestrated => self.orchestrated.as_ref(),
        }
    }

    /// Reject declarations that cannot be applied, before any mutation.
    pub fn precheck(spec: &ContainerSpec, changes: &ChangeSet) -> Result<(), DeployError> {
        if changes.backend_type_changed && changes.routing_changed {
            return Err(ConfigurationError::BackendAndRoutingChanged.into());
        }
        switchyard_autoscale::validate(&spec.compute.scale)?;
        Ok(())
    }

    pub async fn run(
        &self,
        ctx: &mut DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<BackendResourceRef, DeployError> {
        Self::precheck(ctx.spec, &ctx.changes)?;
        let container = ctx.spec.name.clone();
        let destination = ctx.spec.compute.backend;
        let previous = record.backend;
        info!(%container, backend = %destination, ?previous, "deployment started");

        // A
        ctx.check_cancelled()?;
        let target_group = self.router.stage(ctx, record).await?;
        ctx.target_group = Some(target_group.clone());
        ctx.checkpoint.save(record, "routing-staged")?;

        // B
        ctx.check_cancelled()?;
        self.artifacts.ensure(ctx, record).await?;
        ctx.check_cancelled()?;
        let provisioned = self.strategy(destination).deploy(ctx, record).await?;
        ctx.checkpoint.save(record, "provisioned")?;

        // C
        ctx.check_cancelled()?;
        self.router.promote(ctx, &target_group, record).await?;
        record.backend = Some(destination);
        ctx.checkpoint.save(record, "cutover")?;

        // D
        let replaced = destination.opposite();
        if ctx.changes.backend_type_changed || previous == Some(replaced) {
            self.strategy(replaced).decommission(ctx, record).await?;
            ctx.checkpoint.save(record, "decommissioned")?;
        }

        info!(%container, backend = %destination, "deployment complete");
        Ok(provisioned)
    }
}
