use std::sync::Arc;

use async_trait::async_trait;
use switchyard_core::provider::{FunctionClient, FunctionSpec, RoleProvisioner};
use switchyard_core::{BackendType, DeploymentRecord, ProviderError};
use tracing::info;

use super::{BackendResourceRef, ComputeDeploymentStrategy};
use crate::context::DeployContext;
use crate::error::DeployError;

pub const DEFAULT_FUNCTION_MEMORY_MB: u32 = 1024;
pub const DEFAULT_FUNCTION_TIMEOUT_SECS: u32 = 30;

/// Deploys a container as a managed function behind its target group.
pub struct FunctionStrategy {
    functions: Arc<dyn FunctionClient>,
    roles: Arc<dyn RoleProvisioner>,
}

impl FunctionStrategy {
    pub fn new(functions: Arc<dyn FunctionClient>, roles: Arc<dyn RoleProvisioner>) -> Self {
        Self { functions, roles }
    }
}

#[async_trait]
impl ComputeDeploymentStrategy for FunctionStrategy {
    fn backend(&self) -> BackendType {
        BackendType::Function
    }

    async fn deploy(
        &self,
        ctx: &mut DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<BackendResourceRef, DeployError> {
        let resource = ctx.resource_name();
        let container = ctx.spec.name.clone();

        let role = self
            .roles
            .create_or_update_role(&format!("{resource}-role"), ctx.spec.access_policy.as_ref())
            .await?;
        record.roles.execution_role = Some(role.clone());

        let image = record.artifacts.function_image.clone().ok_or_else(|| ProviderError::NotFound {
            service: "artifacts",
            resource: format!("function image for {container}"),
        })?;

        let compute = &ctx.spec.compute;
        let spec = FunctionSpec {
            name: resource,
            image,
            role,
            environment: ctx.environment(),
            memory_mb: compute.memory.unwrap_or(DEFAULT_FUNCTION_MEMORY_MB),
            timeout_secs: compute.timeout_secs.unwrap_or(DEFAULT_FUNCTION_TIMEOUT_SECS),
            target_group: ctx.destination()?.to_string(),
            network: compute.network_attached.then(|| ctx.network()),
        };
        info!(%container, function = %spec.name, memory_mb = spec.memory_mb, "deploying function");
        let function = self.functions.create_or_update(&spec).await?;
        let endpoint = self.functions.invocation_endpoint(&function).await?;

        record.function.function = Some(function.clone());
        record.function.endpoint = endpoint.clone();
        ctx.checkpoint.save(record, "function")?;
        info!(%container, %function, "function active");

        Ok(BackendResourceRef::Function { function, endpoint })
    }

    async fn decommission(
        &self,
        ctx: &DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<(), DeployError> {
        if let Some(function) = &record.function.function {
            info!(container = %ctx.spec.name, %function, "function left in place, no longer routed");
        }
        Ok(())
    }
}
