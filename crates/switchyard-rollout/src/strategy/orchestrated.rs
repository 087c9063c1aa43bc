use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use switchyard_autoscale::{PolicySyncer, ScalableResource, ScalingInputs, compute_desired_scaling};
use switchyard_core::provider::{
    AutoscalingClient, OrchestrationClient, RoleProvisioner, ServiceRef, ServiceSpec,
    TaskTemplateSpec, TelemetryClient,
};
use switchyard_core::{BackendType, DeploymentRecord, ProviderError};
use switchyard_health::{DeploymentMonitor, FailureKind, PollSettings};
use tracing::{error, info};

use super::{BackendResourceRef, ComputeDeploymentStrategy};
use crate::context::DeployContext;
use crate::error::DeployError;

pub const DEFAULT_TASK_CPU: u32 = 256;
pub const DEFAULT_TASK_MEMORY_MB: u32 = 512;

/// Where an orchestrated rollout is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloutStage {
    RegisteringTemplate,
    UpdatingService,
    LocatingDeployment,
    Polling,
    Successful,
    FailedHealthCheck,
    FailedExit,
    FailedTimeout,
}

impl RolloutStage {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RolloutStage::Successful
                | RolloutStage::FailedHealthCheck
                | RolloutStage::FailedExit
                | RolloutStage::FailedTimeout
        )
    }

    /// Terminal stage for a failed rollout, if the failure is one of the
    /// rollout outcomes rather than a provider or state error.
    fn from_failure(e: &DeployError) -> Option<Self> {
        match e {
            DeployError::HealthCheck {
                kind: FailureKind::Crash,
                ..
            } => Some(RolloutStage::FailedExit),
            DeployError::HealthCheck { .. } => Some(RolloutStage::FailedHealthCheck),
            DeployError::Timeout { .. } => Some(RolloutStage::FailedTimeout),
            _ => None,
        }
    }
}

impl fmt::Display for RolloutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RolloutStage::RegisteringTemplate => "registering-template",
            RolloutStage::UpdatingService => "updating-service",
            RolloutStage::LocatingDeployment => "locating-deployment",
            RolloutStage::Polling => "polling",
            RolloutStage::Successful => "successful",
            RolloutStage::FailedHealthCheck => "failed-health-check",
            RolloutStage::FailedExit => "failed-exit",
            RolloutStage::FailedTimeout => "failed-timeout",
        };
        f.write_str(s)
    }
}

fn enter(container: &str, stage: RolloutStage) {
    info!(%container, %stage, "orchestrated rollout");
}

/// Deploys a container as an orchestrated service: template revision,
/// service update, health-gated rollout, then autoscaling policies.
pub struct OrchestratedStrategy {
    orchestration: Arc<dyn OrchestrationClient>,
    roles: Arc<dyn RoleProvisioner>,
    monitor: DeploymentMonitor,
    scaling: PolicySyncer,
}

impl OrchestratedStrategy {
    pub fn new(
        orchestration: Arc<dyn OrchestrationClient>,
        roles: Arc<dyn RoleProvisioner>,
        autoscaling: Arc<dyn AutoscalingClient>,
        telemetry: Arc<dyn TelemetryClient>,
        poll: PollSettings,
    ) -> Self {
        Self {
            monitor: DeploymentMonitor::new(orchestration.clone(), telemetry.clone(), poll),
            scaling: PolicySyncer::new(autoscaling, telemetry),
            orchestration,
            roles,
        }
    }

    async fn roll_out(
        &self,
        ctx: &mut DeployContext<'_>,
        record: &mut DeploymentRecord,
        stage: &mut RolloutStage,
    ) -> Result<BackendResourceRef, DeployError> {
        let resource = ctx.resource_name();
        let container = ctx.spec.name.clone();
        let project = ctx.project;
        let compute = &ctx.spec.compute;
        let port = ctx.container_port();

        let service = ServiceRef {
            cluster: project.deployment.cluster.clone(),
            name: resource.clone(),
        };
        // A service scaled to zero by an earlier switch away has no
        // meaningful running count.
        let running = if record.backend == Some(BackendType::Orchestrated) {
            self.orchestration
                .get_service(&service)
                .await?
                .map(|s| s.running_count)
        } else {
            None
        };
        let desired_count =
            compute_desired_scaling(&ScalingInputs::from_policies(running, &compute.scale));
        info!(%container, ?running, desired_count, "desired count resolved");

        *stage = RolloutStage::RegisteringTemplate;
        enter(&container, *stage);
        let task_role = self
            .roles
            .create_or_update_role(&format!("{resource}-task-role"), ctx.spec.access_policy.as_ref())
            .await?;
        let execution_role = project.deployment.execution_role.clone();
        record.roles.execution_role = Some(execution_role.clone());
        record.roles.task_role = Some(task_role.clone());

        let image = record
            .artifacts
            .orchestrated_image
            .clone()
            .ok_or_else(|| ProviderError::NotFound {
                service: "artifacts",
                resource: format!("orchestrated image for {container}"),
            })?;
        let template = self
            .orchestration
            .register_task_template(&TaskTemplateSpec {
                family: resource.clone(),
                image,
                environment: ctx.environment(),
                cpu: compute.cpu.unwrap_or(DEFAULT_TASK_CPU),
                memory: compute.memory.unwrap_or(DEFAULT_TASK_MEMORY_MB),
                port,
                execution_role,
                task_role: Some(task_role),
            })
            .await?;
        record.orchestrated.task_template = Some(template.template.clone());
        record.orchestrated.log_destination = template.log_destination.clone();

        *stage = RolloutStage::UpdatingService;
        enter(&container, *stage);
        let target_group = ctx.destination()?.to_string();
        let service_ref = self
            .orchestration
            .create_or_update_service(&ServiceSpec {
                service: service.clone(),
                template: template.template,
                desired_count,
                target_group: target_group.clone(),
                port,
                network: ctx.network(),
                force_new_deployment: true,
            })
            .await?;
        record.orchestrated.service = Some(service_ref.clone());
        ctx.checkpoint.save(record, "service")?;

        let health_check_path = ctx.health_check_path.clone();
        let monitor_err = |e| DeployError::from_monitor(e, port, &health_check_path);

        *stage = RolloutStage::LocatingDeployment;
        enter(&container, *stage);
        let deployment = self
            .monitor
            .locate_deployment(&service, &mut ctx.cancel)
            .await
            .map_err(monitor_err)?;

        *stage = RolloutStage::Polling;
        enter(&container, *stage);
        let done = self
            .monitor
            .await_completion(
                &service,
                &deployment,
                desired_count,
                template.log_destination.as_deref(),
                &mut ctx.cancel,
            )
            .await
            .map_err(monitor_err)?;

        *stage = RolloutStage::Successful;
        enter(&container, *stage);

        let scalable = ScalableResource {
            resource_id: format!("service/{}/{}", service.cluster, service.name),
            name: resource,
            lb_label: Some(format!("{}/{}", project.deployment.load_balancer, target_group)),
            dimensions: BTreeMap::from([
                ("ClusterName".to_string(), service.cluster.clone()),
                ("ServiceName".to_string(), service.name.clone()),
            ]),
        };
        let report = self.scaling.sync(&scalable, &compute.scale).await?;
        info!(
            %container,
            put = report.put.len(),
            deleted = report.deleted.len(),
            "scaling policies synced"
        );

        Ok(BackendResourceRef::Orchestrated {
            service: service_ref,
            deployment: done.deployment,
            running_count: done.running_count,
        })
    }
}

#[async_trait]
impl ComputeDeploymentStrategy for OrchestratedStrategy {
    fn backend(&self) -> BackendType {
        BackendType::Orchestrated
    }

    async fn deploy(
        &self,
        ctx: &mut DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<BackendResourceRef, DeployError> {
        let mut stage = RolloutStage::RegisteringTemplate;
        let result = self.roll_out(ctx, record, &mut stage).await;
        if let Err(e) = &result {
            if let Some(terminal) = RolloutStage::from_failure(e) {
                enter(&ctx.spec.name, terminal);
            }
            error!(container = %ctx.spec.name, %stage, code = e.code(), "orchestrated rollout failed");
        }
        result
    }

    async fn decommission(
        &self,
        ctx: &DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<(), DeployError> {
        if record.orchestrated.service.is_none() {
            return Ok(());
        }
        let service = ServiceRef {
            cluster: ctx.project.deployment.cluster.clone(),
            name: ctx.resource_name(),
        };
        self.orchestration.stop_service(&service).await?;
        info!(container = %ctx.spec.name, service = %service.name, "previous service scaled to zero");
        Ok(())
    }
}
