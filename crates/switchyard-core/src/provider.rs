//! Collaborator interfaces consumed by the deployment core.
//!
//! Each trait is implemented by a thin wrapper around one provider
//! control-plane API. Wrappers own retry and throttling; the core treats
//! every call as a fallible I/O boundary and propagates `ProviderError`
//! unchanged.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{PriorityTier, StepAdjustment, TargetMetric};

pub type ProviderResult<T> = Result<T, ProviderError>;

/// A collaborator call failed outright.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{service}: {operation} failed: {message}")]
    Request {
        service: &'static str,
        operation: &'static str,
        message: String,
    },

    #[error("{service}: {resource} not found")]
    NotFound {
        service: &'static str,
        resource: String,
    },
}

impl ProviderError {
    pub fn request(service: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        Self::Request {
            service,
            operation,
            message: message.into(),
        }
    }
}

// ── Artifacts ──────────────────────────────────────────────────────

/// Which backend an image is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageVariant {
    Orchestrated,
    /// Function-runtime variant layered on the orchestrated image.
    Function,
}

#[async_trait]
pub trait ArtifactBuilder: Send + Sync {
    /// Resolve (creating if needed) the image repository for a container.
    async fn repository(&self, name: &str) -> ProviderResult<String>;
    async fn build(&self, context: &Path, image: &str, variant: ImageVariant) -> ProviderResult<()>;
    async fn push(&self, image: &str) -> ProviderResult<()>;
    /// Image size in MiB.
    async fn size_mb(&self, image: &str) -> ProviderResult<u64>;
}

// ── Function backend ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub subnets: Vec<String>,
    pub security_groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSpec {
    pub name: String,
    pub image: String,
    pub role: String,
    pub environment: BTreeMap<String, String>,
    pub memory_mb: u32,
    pub timeout_secs: u32,
    /// Target group the function registers with.
    pub target_group: String,
    pub network: Option<NetworkAttachment>,
}

#[async_trait]
pub trait FunctionClient: Send + Sync {
    /// Create or update the function and wait until it is active.
    async fn create_or_update(&self, spec: &FunctionSpec) -> ProviderResult<String>;
    async fn invocation_endpoint(&self, function: &str) -> ProviderResult<Option<String>>;
}

// ── Orchestration backend ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct TaskTemplateSpec {
    pub family: String,
    pub image: String,
    pub environment: BTreeMap<String, String>,
    pub cpu: u32,
    pub memory: u32,
    pub port: u16,
    pub execution_role: String,
    pub task_role: Option<String>,
}

/// A registered, immutable task template revision.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskTemplate {
    pub template: String,
    pub log_destination: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceRef {
    pub cluster: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceSpec {
    pub service: ServiceRef,
    pub template: String,
    pub desired_count: u32,
    pub target_group: String,
    pub port: u16,
    pub network: NetworkAttachment,
    pub force_new_deployment: bool,
}

/// Observed state of a running service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceStatus {
    pub service: String,
    pub running_count: u32,
    pub desired_count: u32,
    pub pending_count: u32,
}

/// A short provider status message attached to a service.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceEvent {
    pub created_at_ms: u64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentStatus {
    Pending,
    InProgress,
    Successful,
    Failed,
    Stopped,
    RolledBack,
}

/// A rollout of a service to a new template revision.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDeployment {
    pub id: String,
    pub status: DeploymentStatus,
    pub created_at_ms: u64,
    pub running_count: u32,
    pub pending_count: u32,
    /// Tasks the provider's circuit breaker counted as failed.
    pub failure_count: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitedTask {
    pub task: String,
    pub stopped_reason: Option<String>,
}

#[async_trait]
pub trait OrchestrationClient: Send + Sync {
    async fn register_task_template(&self, spec: &TaskTemplateSpec) -> ProviderResult<TaskTemplate>;
    async fn create_or_update_service(&self, spec: &ServiceSpec) -> ProviderResult<String>;
    /// `None` when the service does not exist yet.
    async fn get_service(&self, service: &ServiceRef) -> ProviderResult<Option<ServiceStatus>>;
    /// Latest deployment of the service whose status is in `statuses`.
    async fn get_deployment(
        &self,
        service: &ServiceRef,
        statuses: &[DeploymentStatus],
    ) -> ProviderResult<Option<ServiceDeployment>>;
    async fn describe_deployment(&self, deployment: &str) -> ProviderResult<ServiceDeployment>;
    async fn get_service_events(&self, service: &ServiceRef) -> ProviderResult<Vec<ServiceEvent>>;
    async fn get_exited_tasks(&self, service: &ServiceRef) -> ProviderResult<Vec<ExitedTask>>;
    /// Scale the service to zero tasks.
    async fn stop_service(&self, service: &ServiceRef) -> ProviderResult<()>;
}

// ── Load balancer ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    /// Targets are function resources.
    Function,
    /// Targets are task IP addresses.
    Ip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroupSpec {
    pub name: String,
    pub kind: TargetKind,
    pub health_check_path: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListenerSpec {
    pub load_balancer: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoutingRuleSpec {
    pub listener: String,
    pub target_group: String,
    pub path_pattern: String,
    pub host_header: Option<String>,
    pub forward_token: String,
}

/// Every method is a list-then-create sequence on the provider side and
/// must not be called concurrently for the same load balancer.
#[async_trait]
pub trait LoadBalancerClient: Send + Sync {
    async fn get_or_create_target_group(&self, spec: &TargetGroupSpec) -> ProviderResult<String>;
    async fn get_or_create_listener(&self, spec: &ListenerSpec) -> ProviderResult<String>;
    /// Create or update the rule for `spec.path_pattern` at the given tier.
    /// Returns the rule reference.
    async fn create_or_update_routing_rule(
        &self,
        spec: &RoutingRuleSpec,
        tier: PriorityTier,
    ) -> ProviderResult<String>;
}

// ── Autoscaling ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ScalableTarget {
    pub resource_id: String,
    pub min_capacity: u32,
    pub max_capacity: u32,
}

/// Metric alarm that drives a step-scaling policy.
#[derive(Debug, Clone, PartialEq)]
pub struct StepAlarm {
    pub metric: String,
    pub namespace: String,
    pub dimensions: BTreeMap<String, String>,
    pub period_secs: u32,
    pub evaluation_periods: u32,
    pub threshold: f64,
    pub comparison_operator: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PolicyKind {
    TargetTracking {
        metric: TargetMetric,
        /// `<load balancer>/<target group>` for the request-count metric.
        resource_label: Option<String>,
        target_value: f64,
        scale_in_cooldown_secs: u32,
        scale_out_cooldown_secs: u32,
        disable_scale_in: bool,
    },
    Step {
        adjustment_type: String,
        cooldown_secs: u32,
        aggregation: String,
        steps: Vec<StepAdjustment>,
        alarm: StepAlarm,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PolicyDocument {
    pub name: String,
    pub resource_id: String,
    pub kind: PolicyKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemotePolicy {
    pub name: String,
}

#[async_trait]
pub trait AutoscalingClient: Send + Sync {
    async fn register_scalable_target(&self, target: &ScalableTarget) -> ProviderResult<()>;
    async fn list_policies(&self, resource_id: &str) -> ProviderResult<Vec<RemotePolicy>>;
    /// Idempotent create-or-update. Returns the policy reference.
    async fn put_policy(&self, policy: &PolicyDocument) -> ProviderResult<String>;
    async fn delete_policy(&self, resource_id: &str, name: &str) -> ProviderResult<()>;
}

// ── Logs and metrics ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub timestamp_ms: u64,
    pub message: String,
}

#[async_trait]
pub trait TelemetryClient: Send + Sync {
    async fn recent_logs(&self, destination: &str, since_ms: u64, limit: usize) -> ProviderResult<Vec<LogEvent>>;

    /// Create or update the alarm attached to a step-scaling policy.
    async fn put_alarm(&self, policy: &str, alarm: &StepAlarm) -> ProviderResult<()>;

    /// Render log events for display, one per line.
    fn format_logs(&self, logs: &[LogEvent]) -> String {
        logs.iter()
            .map(|e| format!("{} {}", e.timestamp_ms, e.message.trim_end()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ── Access roles ───────────────────────────────────────────────────

#[async_trait]
pub trait RoleProvisioner: Send + Sync {
    /// Create or update the container's role from its custom access policy.
    async fn create_or_update_role(
        &self,
        name: &str,
        policy: Option<&serde_json::Value>,
    ) -> ProviderResult<String>;
}
