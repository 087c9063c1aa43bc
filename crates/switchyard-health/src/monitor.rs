//! DeploymentMonitor: follows one orchestrated rollout to completion.
//!
//! ```text
//! locate_deployment        poll get_deployment(in-progress | pending)
//!        │                 not found after N attempts ─► ObservabilityGap
//!        ▼
//! await_completion         each attempt: deployment + service + events,
//!                          exited tasks for progress reporting
//!   ├─ status successful                       ─► Ok
//!   ├─ event newer than deployment classified  ─► logs, HealthCheck{kind}
//!   └─ attempts exhausted                      ─► logs, Timeout
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use switchyard_core::ProviderError;
use switchyard_core::provider::{
    DeploymentStatus, OrchestrationClient, ServiceDeployment, ServiceRef, TelemetryClient,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::classifier::{FailureKind, classify};
use crate::poll::{CancelSignal, PollError, PollSettings, PollStep, poll_until};

/// Number of trailing log lines fetched for a failed rollout.
pub const DIAGNOSTIC_LOG_LIMIT: usize = 50;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("rollout failed ({kind}): {event}")]
    HealthCheck { kind: FailureKind, event: String },

    #[error("rollout did not complete after {attempts} polls ({ceiling_secs}s)")]
    Timeout { attempts: u32, ceiling_secs: u64 },

    #[error("could not locate the deployment of service {service} after {attempts} attempts")]
    ObservabilityGap { service: String, attempts: u32 },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("cancelled")]
    Cancelled,
}

/// A rollout the provider reported successful.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedRollout {
    pub deployment: String,
    pub running_count: u32,
    pub attempts: u32,
}

enum RolloutOutcome {
    Succeeded(CompletedRollout),
    Failed(FailureKind, String),
}

/// Progress of a rollout as reported to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progress {
    /// Running count reached desired count.
    AtDesired,
    /// Dropped below desired after having reached it.
    Regressed,
    /// Ramping up, some tasks already exited.
    Restarting,
    RampingUp,
}

/// Tracks whether the desired count was ever reached, so a later drop reads
/// as a regression rather than initial ramp-up.
#[derive(Debug, Default)]
struct ProgressTracker {
    met_desired: AtomicBool,
}

impl ProgressTracker {
    fn observe(&self, running: u32, desired: u32, exited: usize) -> Progress {
        if running == desired {
            self.met_desired.store(true, Ordering::Relaxed);
            Progress::AtDesired
        } else if self.met_desired.load(Ordering::Relaxed) {
            Progress::Regressed
        } else if exited > 0 {
            Progress::Restarting
        } else {
            Progress::RampingUp
        }
    }
}

const ACTIVE_DEPLOYMENT: [DeploymentStatus; 2] =
    [DeploymentStatus::InProgress, DeploymentStatus::Pending];

pub struct DeploymentMonitor {
    orchestration: Arc<dyn OrchestrationClient>,
    telemetry: Arc<dyn TelemetryClient>,
    settings: PollSettings,
}

impl DeploymentMonitor {
    pub fn new(
        orchestration: Arc<dyn OrchestrationClient>,
        telemetry: Arc<dyn TelemetryClient>,
        settings: PollSettings,
    ) -> Self {
        Self {
            orchestration,
            telemetry,
            settings,
        }
    }

    pub fn settings(&self) -> &PollSettings {
        &self.settings
    }

    /// Find the deployment a service update just triggered.
    pub async fn locate_deployment(
        &self,
        service: &ServiceRef,
        cancel: &mut CancelSignal,
    ) -> Result<ServiceDeployment, MonitorError> {
        let result = poll_until(self.settings.locate, cancel, move |attempt| {
            self.locate_attempt(service, attempt)
        })
        .await;

        match result {
            Ok(deployment) => {
                info!(service = %service.name, deployment = %deployment.id, "deployment located");
                Ok(deployment)
            }
            Err(PollError::Exhausted { attempts }) => Err(MonitorError::ObservabilityGap {
                service: service.name.clone(),
                attempts,
            }),
            Err(PollError::Cancelled) => Err(MonitorError::Cancelled),
            Err(PollError::Failed(e)) => Err(e),
        }
    }

    async fn locate_attempt(
        &self,
        service: &ServiceRef,
        attempt: u32,
    ) -> Result<PollStep<ServiceDeployment>, MonitorError> {
        debug!(service = %service.name, attempt, "locating deployment");
        let found = self
            .orchestration
            .get_deployment(service, &ACTIVE_DEPLOYMENT)
            .await?;
        Ok(match found {
            Some(deployment) => PollStep::Ready(deployment),
            None => PollStep::Pending,
        })
    }

    /// Poll `deployment` until it succeeds, a failure event is classified,
    /// or the attempt ceiling is reached. Recent logs from
    /// `log_destination` are emitted before any failure is returned.
    pub async fn await_completion(
        &self,
        service: &ServiceRef,
        deployment: &ServiceDeployment,
        desired_count: u32,
        log_destination: Option<&str>,
        cancel: &mut CancelSignal,
    ) -> Result<CompletedRollout, MonitorError> {
        let tracker = ProgressTracker::default();
        let tracker = &tracker;
        let policy = self.settings.rollout;

        let result = poll_until(policy, cancel, move |attempt| {
            self.rollout_attempt(service, deployment, desired_count, tracker, attempt)
        })
        .await;

        match result {
            Ok(RolloutOutcome::Succeeded(done)) => {
                info!(service = %service.name, deployment = %done.deployment, "rollout successful");
                Ok(done)
            }
            Ok(RolloutOutcome::Failed(kind, event)) => {
                error!(service = %service.name, %kind, %event, "rollout failed");
                self.emit_logs(&service.name, log_destination, deployment.created_at_ms)
                    .await;
                Err(MonitorError::HealthCheck { kind, event })
            }
            Err(PollError::Exhausted { attempts }) => {
                error!(service = %service.name, attempts, "rollout timed out");
                self.emit_logs(&service.name, log_destination, deployment.created_at_ms)
                    .await;
                Err(MonitorError::Timeout {
                    attempts,
                    ceiling_secs: policy.ceiling().as_secs(),
                })
            }
            Err(PollError::Cancelled) => Err(MonitorError::Cancelled),
            Err(PollError::Failed(e)) => Err(e),
        }
    }

    async fn rollout_attempt(
        &self,
        service: &ServiceRef,
        deployment: &ServiceDeployment,
        desired_count: u32,
        tracker: &ProgressTracker,
        attempt: u32,
    ) -> Result<PollStep<RolloutOutcome>, MonitorError> {
        let (current, events) = tokio::try_join!(
            self.orchestration.describe_deployment(&deployment.id),
            self.orchestration.get_service_events(service),
        )?;

        if current.status == DeploymentStatus::Successful {
            return Ok(PollStep::Ready(RolloutOutcome::Succeeded(CompletedRollout {
                deployment: current.id,
                running_count: current.running_count,
                attempts: attempt,
            })));
        }

        let exited = self.orchestration.get_exited_tasks(service).await?;
        debug!(
            service = %service.name,
            attempt,
            running = current.running_count,
            desired = desired_count,
            pending = current.pending_count,
            failures = current.failure_count,
            "rollout status"
        );
        let (running, desired) = (current.running_count, desired_count);
        match tracker.observe(running, desired, exited.len()) {
            Progress::AtDesired => {
                info!(service = %service.name, running, desired, "tasks deployed, running health checks")
            }
            Progress::Regressed => warn!(
                service = %service.name,
                running,
                desired,
                "tasks deploying again after reaching desired count"
            ),
            Progress::Restarting => warn!(
                service = %service.name,
                running,
                desired,
                reason = exited[0].stopped_reason.as_deref().unwrap_or("unknown"),
                "tasks deploying again after exit"
            ),
            Progress::RampingUp => info!(service = %service.name, running, desired, "deploying tasks"),
        }

        let failure = events
            .iter()
            .filter(|e| e.created_at_ms > deployment.created_at_ms)
            .find_map(|e| classify(&e.message).map(|kind| (kind, e.message.clone())));
        Ok(match failure {
            Some((kind, event)) => PollStep::Ready(RolloutOutcome::Failed(kind, event)),
            None => PollStep::Pending,
        })
    }

    /// Best effort: a failed log fetch is logged and ignored.
    async fn emit_logs(&self, service: &str, destination: Option<&str>, since_ms: u64) {
        let Some(destination) = destination else {
            return;
        };
        match self
            .telemetry
            .recent_logs(destination, since_ms, DIAGNOSTIC_LOG_LIMIT)
            .await
        {
            Ok(logs) if logs.is_empty() => {}
            Ok(logs) => {
                error!(%service, "recent logs:\n{}", self.telemetry.format_logs(&logs));
            }
            Err(e) => warn!(%service, error = %e, "failed to retrieve logs"),
        }
    }
}
