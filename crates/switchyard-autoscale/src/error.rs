//! Error types for scaling reconciliation.

use switchyard_core::{ProviderError, TargetMetric};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScalingError {
    #[error("more than one target scaling policy for metric `{}`", .0.as_str())]
    DuplicateTargetPolicy(TargetMetric),

    #[error("scaling min ({min}) is greater than max ({max})")]
    InvalidBounds { min: u32, max: u32 },

    #[error("target policy on `{}` needs a load balancer and target group", .0.as_str())]
    MissingResourceLabel(TargetMetric),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

impl ScalingError {
    /// Raised by validation, before any provider call.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, ScalingError::Provider(_))
    }
}
