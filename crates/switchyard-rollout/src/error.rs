//! Typed deployment failures with stable codes and remediation hints.

use std::path::PathBuf;

use switchyard_autoscale::ScalingError;
use switchyard_core::{ConfigError, ProviderError};
use switchyard_health::{FailureKind, MonitorError};
use switchyard_state::StateError;
use thiserror::Error;

/// A declaration that cannot be applied. Raised before any mutation.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("compute type and routing changed in the same deployment")]
    BackendAndRoutingChanged,

    #[error(transparent)]
    Scaling(ScalingError),

    #[error(transparent)]
    Project(#[from] ConfigError),
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("provisioning failed: {0}")]
    Provisioning(#[from] ProviderError),

    #[error("deployment failed ({kind}): {event}")]
    HealthCheck {
        kind: FailureKind,
        event: String,
        port: u16,
        health_check_path: String,
    },

    #[error("service did not finish deploying after {attempts} polls ({ceiling_secs}s)")]
    Timeout { attempts: u32, ceiling_secs: u64 },

    #[error("could not locate the rollout of service {service} after {attempts} attempts")]
    ObservabilityGap { service: String, attempts: u32 },

    #[error("failed to read source directory {}: {source}", path.display())]
    Source {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("state store failure: {0}")]
    State(#[from] StateError),

    #[error("deployment cancelled")]
    Cancelled,
}

impl From<ScalingError> for DeployError {
    fn from(e: ScalingError) -> Self {
        match e {
            ScalingError::Provider(e) => DeployError::Provisioning(e),
            other => DeployError::Configuration(ConfigurationError::Scaling(other)),
        }
    }
}

impl DeployError {
    /// Attach the routing details a health-check hint refers to.
    pub fn from_monitor(e: MonitorError, port: u16, health_check_path: &str) -> Self {
        match e {
            MonitorError::HealthCheck { kind, event } => DeployError::HealthCheck {
                kind,
                event,
                port,
                health_check_path: health_check_path.to_string(),
            },
            MonitorError::Timeout {
                attempts,
                ceiling_secs,
            } => DeployError::Timeout {
                attempts,
                ceiling_secs,
            },
            MonitorError::ObservabilityGap { service, attempts } => {
                DeployError::ObservabilityGap { service, attempts }
            }
            MonitorError::Provider(e) => DeployError::Provisioning(e),
            MonitorError::Cancelled => DeployError::Cancelled,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            DeployError::Configuration(ConfigurationError::BackendAndRoutingChanged) => {
                "CONFIG_BACKEND_AND_ROUTING_CHANGED"
            }
            DeployError::Configuration(ConfigurationError::Scaling(e)) => match e {
                ScalingError::DuplicateTargetPolicy(_) => "CONFIG_DUPLICATE_TARGET_POLICY",
                ScalingError::InvalidBounds { .. } => "CONFIG_INVALID_SCALING_BOUNDS",
                ScalingError::MissingResourceLabel(_) => "CONFIG_MISSING_RESOURCE_LABEL",
                ScalingError::Provider(_) => "PROVISIONING_FAILED",
            },
            DeployError::Configuration(ConfigurationError::Project(_)) => "CONFIG_INVALID_PROJECT",
            DeployError::Provisioning(_) => "PROVISIONING_FAILED",
            DeployError::HealthCheck { kind, .. } => match kind {
                FailureKind::PortMisconfigured => "ORCHESTRATED_UNHEALTHY_PORT_MISCONFIGURED",
                FailureKind::HealthCheck => "ORCHESTRATED_TARGET_GROUP_UNHEALTHY",
                FailureKind::Crash => "ORCHESTRATED_CONTAINER_EXITED",
            },
            DeployError::Timeout { .. } => "ORCHESTRATED_DEPLOYMENT_TIMEOUT",
            DeployError::ObservabilityGap { .. } => "ORCHESTRATED_DEPLOYMENT_NOT_FOUND",
            DeployError::Source { .. } => "SOURCE_READ_FAILED",
            DeployError::State(_) => "STATE_STORE_FAILURE",
            DeployError::Cancelled => "DEPLOYMENT_CANCELLED",
        }
    }

    /// Remediation text for the operator.
    pub fn hint(&self) -> Option<String> {
        let hint = match self {
            DeployError::Configuration(ConfigurationError::BackendAndRoutingChanged) => {
                "Deploy the routing change first, then switch the compute type in a separate deployment.".to_string()
            }
            DeployError::Configuration(ConfigurationError::Scaling(ScalingError::DuplicateTargetPolicy(_))) => {
                "Declare at most one target scaling policy per metric.".to_string()
            }
            DeployError::Configuration(ConfigurationError::Scaling(ScalingError::InvalidBounds { .. })) => {
                "Set the scaling min to a value no greater than max.".to_string()
            }
            DeployError::Configuration(ConfigurationError::Scaling(ScalingError::MissingResourceLabel(_))) => {
                "Configure [deployment] load_balancer so the request-count metric can be resolved.".to_string()
            }
            DeployError::HealthCheck {
                kind,
                port,
                health_check_path,
                ..
            } => match kind {
                FailureKind::PortMisconfigured => format!(
                    "Your container is not listening on port {port}. Make the server listen on port {port}, \
                     make {health_check_path} return a 200 status, and redeploy. No traffic was disrupted; \
                     the service rolls back automatically."
                ),
                FailureKind::HealthCheck => format!(
                    "Health check endpoint {health_check_path} returned a non-200 status. Set \
                     routing.health_check_path to an endpoint that returns 200 and redeploy. No traffic \
                     was disrupted; the service rolls back automatically."
                ),
                FailureKind::Crash => "Your container exited. Make sure it keeps running, review the logs \
                     above, and redeploy. No traffic was disrupted; the service rolls back automatically."
                    .to_string(),
            },
            DeployError::Timeout { .. } => {
                "Review the service logs above. The provider rolls the service back on its own.".to_string()
            }
            DeployError::ObservabilityGap { .. } => {
                "Retry the deployment. If it persists, inspect the service in the provider console.".to_string()
            }
            DeployError::Source { .. } => "Check the container's src path.".to_string(),
            _ => return None,
        };
        Some(hint)
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DeployError::Configuration(_))
    }
}
