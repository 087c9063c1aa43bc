//! Compute backends behind one deployment capability.
//!
//! The cutover protocol only sees [`ComputeDeploymentStrategy`]; each
//! backend decides how to provision, how to wait for health, and how to
//! step aside once traffic has moved elsewhere.

mod function;
mod orchestrated;

pub use function::FunctionStrategy;
pub use orchestrated::{OrchestratedStrategy, RolloutStage};

use async_trait::async_trait;
use switchyard_core::{BackendType, DeploymentRecord};

use crate::context::DeployContext;
use crate::error::DeployError;

/// What a strategy provisioned.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendResourceRef {
    Function {
        function: String,
        endpoint: Option<String>,
    },
    Orchestrated {
        service: String,
        deployment: String,
        running_count: u32,
    },
}

impl BackendResourceRef {
    pub fn backend(&self) -> BackendType {
        match self {
            BackendResourceRef::Function { .. } => BackendType::Function,
            BackendResourceRef::Orchestrated { .. } => BackendType::Orchestrated,
        }
    }

    /// Direct invocation endpoint, when the backend exposes one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            BackendResourceRef::Function { endpoint, .. } => endpoint.as_deref(),
            BackendResourceRef::Orchestrated { .. } => None,
        }
    }
}

#[async_trait]
pub trait ComputeDeploymentStrategy: Send + Sync {
    fn backend(&self) -> BackendType;

    /// Provision the backend and return once it is healthy. Routing to the
    /// destination target group is already staged.
    async fn deploy(
        &self,
        ctx: &mut DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<BackendResourceRef, DeployError>;

    /// Step aside after production traffic moved to the other backend.
    async fn decommission(
        &self,
        ctx: &DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<(), DeployError>;
}
