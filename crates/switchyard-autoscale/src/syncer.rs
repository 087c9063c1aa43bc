//! PolicySyncer: makes remote autoscaling state match the declarations.
//!
//! ```text
//! validate ─► register scalable target ─► put every desired policy
//!                                           (+ alarm for step policies)
//!          ─► list remote policies ─► delete names not in desired set
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use switchyard_core::ScalingPolicySpec;
use switchyard_core::provider::{AutoscalingClient, PolicyKind, ScalableTarget, TelemetryClient};
use tracing::{debug, info};

use crate::error::ScalingError;
use crate::policy::{ScalableResource, desired_policies};
use crate::reconciler::ScalingInputs;

/// What one sync changed remotely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub put: Vec<String>,
    pub deleted: Vec<String>,
}

pub struct PolicySyncer {
    autoscaling: Arc<dyn AutoscalingClient>,
    telemetry: Arc<dyn TelemetryClient>,
}

impl PolicySyncer {
    pub fn new(autoscaling: Arc<dyn AutoscalingClient>, telemetry: Arc<dyn TelemetryClient>) -> Self {
        Self {
            autoscaling,
            telemetry,
        }
    }

    /// Reconcile the policies on `resource` against `policies`.
    ///
    /// Configuration errors are raised before the first provider call.
    pub async fn sync(
        &self,
        resource: &ScalableResource,
        policies: &[ScalingPolicySpec],
    ) -> Result<SyncReport, ScalingError> {
        let desired = desired_policies(resource, policies)?;
        let (min_capacity, max_capacity) = ScalingInputs::from_policies(None, policies).capacity_bounds();

        self.autoscaling
            .register_scalable_target(&ScalableTarget {
                resource_id: resource.resource_id.clone(),
                min_capacity,
                max_capacity,
            })
            .await?;
        debug!(resource = %resource.resource_id, min_capacity, max_capacity, "scalable target registered");

        let mut report = SyncReport::default();
        for document in &desired {
            let policy_ref = self.autoscaling.put_policy(document).await?;
            if let PolicyKind::Step { alarm, .. } = &document.kind {
                self.telemetry.put_alarm(&policy_ref, alarm).await?;
            }
            report.put.push(document.name.clone());
        }

        let keep: BTreeSet<&str> = desired.iter().map(|d| d.name.as_str()).collect();
        for remote in self.autoscaling.list_policies(&resource.resource_id).await? {
            if !keep.contains(remote.name.as_str()) {
                self.autoscaling
                    .delete_policy(&resource.resource_id, &remote.name)
                    .await?;
                report.deleted.push(remote.name);
            }
        }

        info!(
            resource = %resource.resource_id,
            put = report.put.len(),
            deleted = report.deleted.len(),
            "scaling policies synced"
        );
        Ok(report)
    }
}
