//! Desired instance count from scaling declarations.
//!
//! `compute_desired_scaling` is pure: the orchestrated strategy feeds it the
//! service's currently running count (unknown before the first rollout) and
//! hands the result to the service update as its desired count.

use switchyard_core::ScalingPolicySpec;

/// Everything the reconciler looks at. `None` means "not declared" for the
/// bounds and "not observed" for `running`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScalingInputs {
    pub running: Option<u32>,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub desired: Option<u32>,
    pub has_target: bool,
    pub has_step: bool,
}

impl ScalingInputs {
    /// Collect bounds and policy kinds from a declaration list. A repeated
    /// `min`, `max`, or `desired` takes the last value.
    pub fn from_policies(running: Option<u32>, policies: &[ScalingPolicySpec]) -> Self {
        let mut inputs = ScalingInputs {
            running,
            ..Default::default()
        };
        for policy in policies {
            match policy {
                ScalingPolicySpec::Min { min } => inputs.min = Some(*min),
                ScalingPolicySpec::Max { max } => inputs.max = Some(*max),
                ScalingPolicySpec::Desired { desired } => inputs.desired = Some(*desired),
                ScalingPolicySpec::Target { .. } => inputs.has_target = true,
                ScalingPolicySpec::Step { .. } => inputs.has_step = true,
            }
        }
        inputs
    }

    /// Capacity bounds registered for the scalable resource: `min` or 1, and
    /// `max`, else `desired`, else 1, never below the lower bound.
    pub fn capacity_bounds(&self) -> (u32, u32) {
        let lower = self.min.unwrap_or(1);
        let upper = self.max.or(self.desired).unwrap_or(1).max(lower);
        (lower, upper)
    }
}

fn clamp(value: u32, min: u32, max: u32) -> u32 {
    if value < min {
        min
    } else if value > max {
        max
    } else {
        value
    }
}

/// Instance count the service should converge to.
///
/// With an active target or step policy the running count is kept inside
/// the bounds and an explicit `desired` is ignored. Otherwise an explicit
/// `desired` wins, then the declared bounds are enforced against the
/// running count. An unknown running count never counts as below a floor.
pub fn compute_desired_scaling(inputs: &ScalingInputs) -> u32 {
    let ScalingInputs {
        running,
        min,
        max,
        desired,
        has_target,
        has_step,
    } = *inputs;

    if has_target || has_step {
        return match (min, max) {
            (Some(min), Some(max)) => clamp(running.unwrap_or(1), min, max),
            _ => running.unwrap_or(1),
        };
    }

    if let Some(desired) = desired {
        return desired;
    }

    match (min, max) {
        (None, None) => 1,
        (Some(min), Some(max)) => match running {
            None => min,
            Some(r) if r >= min && r <= max => r,
            // Snap to the nearer bound, ties to min.
            Some(r) => {
                if r.abs_diff(min) <= r.abs_diff(max) {
                    min
                } else {
                    max
                }
            }
        },
        (Some(min), None) => running.map_or(min, |r| r.max(min)),
        (None, Some(max)) => running.map_or(1.min(max), |r| r.min(max)),
    }
}
