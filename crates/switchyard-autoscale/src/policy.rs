//! Desired policy set derived from scaling declarations.

use std::collections::{BTreeMap, BTreeSet};

use switchyard_core::provider::{PolicyDocument, PolicyKind, StepAlarm};
use switchyard_core::{ScalingPolicySpec, TargetMetric};

use crate::error::ScalingError;

pub const DEFAULT_TARGET_VALUE: f64 = 70.0;
pub const DEFAULT_COOLDOWN_SECS: u32 = 60;
pub const DEFAULT_ADJUSTMENT_TYPE: &str = "ChangeInCapacity";
pub const DEFAULT_AGGREGATION: &str = "Average";
pub const DEFAULT_PERIOD_SECS: u32 = 60;
pub const DEFAULT_EVALUATION_PERIODS: u32 = 3;
pub const DEFAULT_UNIT: &str = "Percent";

/// The scalable resource policies attach to.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalableResource {
    /// Provider identifier of the scalable dimension.
    pub resource_id: String,
    /// Prefix for policy names, normally the service name.
    pub name: String,
    /// `<load balancer>/<target group>`, required by the request-count metric.
    pub lb_label: Option<String>,
    /// Alarm dimensions used when a step policy declares none.
    pub dimensions: BTreeMap<String, String>,
}

pub fn target_policy_name(resource: &str, metric: TargetMetric) -> String {
    match metric {
        TargetMetric::LbRequestsPerTarget => format!("{resource}-lb-requests-per-target-scaling-policy"),
        m => format!("{resource}-{}-target-tracking-scaling-policy", m.as_str()),
    }
}

pub fn step_policy_name(resource: &str, metric: &str) -> String {
    format!("{resource}-{metric}-step-scaling-policy")
}

/// Reject declarations that cannot be applied. Runs before any provider call.
pub fn validate(policies: &[ScalingPolicySpec]) -> Result<(), ScalingError> {
    let mut seen = BTreeSet::new();
    let (mut min, mut max) = (None, None);
    for policy in policies {
        match policy {
            ScalingPolicySpec::Target { target, .. } => {
                if !seen.insert(*target) {
                    return Err(ScalingError::DuplicateTargetPolicy(*target));
                }
            }
            ScalingPolicySpec::Min { min: m } => min = Some(*m),
            ScalingPolicySpec::Max { max: m } => max = Some(*m),
            _ => {}
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(ScalingError::InvalidBounds { min, max });
        }
    }
    Ok(())
}

/// Every policy the declarations imply, in declaration order.
pub fn desired_policies(
    resource: &ScalableResource,
    policies: &[ScalingPolicySpec],
) -> Result<Vec<PolicyDocument>, ScalingError> {
    validate(policies)?;

    let mut documents = Vec::new();
    for policy in policies {
        match policy {
            ScalingPolicySpec::Target {
                target,
                value,
                scale_in_cooldown,
                scale_out_cooldown,
                scale_in,
            } => {
                let resource_label = match target {
                    TargetMetric::LbRequestsPerTarget => Some(
                        resource
                            .lb_label
                            .clone()
                            .ok_or(ScalingError::MissingResourceLabel(*target))?,
                    ),
                    _ => None,
                };
                documents.push(PolicyDocument {
                    name: target_policy_name(&resource.name, *target),
                    resource_id: resource.resource_id.clone(),
                    kind: PolicyKind::TargetTracking {
                        metric: *target,
                        resource_label,
                        target_value: value.unwrap_or(DEFAULT_TARGET_VALUE),
                        scale_in_cooldown_secs: scale_in_cooldown.unwrap_or(DEFAULT_COOLDOWN_SECS),
                        scale_out_cooldown_secs: scale_out_cooldown.unwrap_or(DEFAULT_COOLDOWN_SECS),
                        disable_scale_in: *scale_in == Some(false),
                    },
                });
            }
            ScalingPolicySpec::Step {
                metric,
                namespace,
                threshold,
                comparison_operator,
                steps,
                adjustment_type,
                cooldown,
                aggregation,
                period,
                evaluation_periods,
                unit,
                dimensions,
            } => {
                let dimensions = if dimensions.is_empty() {
                    resource.dimensions.clone()
                } else {
                    dimensions.clone()
                };
                documents.push(PolicyDocument {
                    name: step_policy_name(&resource.name, metric),
                    resource_id: resource.resource_id.clone(),
                    kind: PolicyKind::Step {
                        adjustment_type: adjustment_type
                            .clone()
                            .unwrap_or_else(|| DEFAULT_ADJUSTMENT_TYPE.to_string()),
                        cooldown_secs: cooldown.unwrap_or(DEFAULT_COOLDOWN_SECS),
                        aggregation: aggregation
                            .clone()
                            .unwrap_or_else(|| DEFAULT_AGGREGATION.to_string()),
                        steps: steps.clone(),
                        alarm: StepAlarm {
                            metric: metric.clone(),
                            namespace: namespace.clone(),
                            dimensions,
                            period_secs: period.unwrap_or(DEFAULT_PERIOD_SECS),
                            evaluation_periods: evaluation_periods
                                .unwrap_or(DEFAULT_EVALUATION_PERIODS),
                            threshold: *threshold,
                            comparison_operator: comparison_operator.clone(),
                            unit: unit.clone().unwrap_or_else(|| DEFAULT_UNIT.to_string()),
                        },
                    },
                });
            }
            _ => {}
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> ScalableResource {
        ScalableResource {
            resource_id: "service/main/api".to_string(),
            name: "api".to_string(),
            lb_label: Some("app/lb/1/targetgroup/tg/2".to_string()),
            dimensions: BTreeMap::from([("ServiceName".to_string(), "api".to_string())]),
        }
    }

    fn target(metric: TargetMetric) -> ScalingPolicySpec {
        ScalingPolicySpec::Target {
            target: metric,
            value: None,
            scale_in_cooldown: None,
            scale_out_cooldown: None,
            scale_in: None,
        }
    }

    fn step(metric: &str) -> ScalingPolicySpec {
        ScalingPolicySpec::Step {
            metric: metric.to_string(),
            namespace: "Custom".to_string(),
            threshold: 100.0,
            comparison_operator: "GreaterThanThreshold".to_string(),
            steps: Vec::new(),
            adjustment_type: None,
            cooldown: None,
            aggregation: None,
            period: None,
            evaluation_periods: None,
            unit: None,
            dimensions: BTreeMap::new(),
        }
    }

    #[test]
    fn policy_names() {
        assert_eq!(
            target_policy_name("api", TargetMetric::Cpu),
            "api-cpu-target-tracking-scaling-policy"
        );
        assert_eq!(
            target_policy_name("api", TargetMetric::Memory),
            "api-memory-target-tracking-scaling-policy"
        );
        assert_eq!(
            target_policy_name("api", TargetMetric::LbRequestsPerTarget),
            "api-lb-requests-per-target-scaling-policy"
        );
        assert_eq!(step_policy_name("api", "QueueDepth"), "api-QueueDepth-step-scaling-policy");
    }

    #[test]
    fn duplicate_target_metric_is_rejected() {
        let err = desired_policies(&resource(), &[target(TargetMetric::Cpu), target(TargetMetric::Cpu)])
            .unwrap_err();
        assert!(matches!(err, ScalingError::DuplicateTargetPolicy(TargetMetric::Cpu)));
        assert!(err.is_configuration());
    }

    #[test]
    fn min_above_max_is_rejected() {
        let err = validate(&[
            ScalingPolicySpec::Min { min: 5 },
            ScalingPolicySpec::Max { max: 2 },
        ])
        .unwrap_err();
        assert!(matches!(err, ScalingError::InvalidBounds { min: 5, max: 2 }));
    }

    #[test]
    fn target_defaults_applied() {
        let docs = desired_policies(&resource(), &[target(TargetMetric::Memory)]).unwrap();
        assert_eq!(docs.len(), 1);
        match &docs[0].kind {
            PolicyKind::TargetTracking {
                target_value,
                scale_in_cooldown_secs,
                scale_out_cooldown_secs,
                disable_scale_in,
                resource_label,
                ..
            } => {
                assert_eq!(*target_value, 70.0);
                assert_eq!(*scale_in_cooldown_secs, 60);
                assert_eq!(*scale_out_cooldown_secs, 60);
                assert!(!disable_scale_in);
                assert!(resource_label.is_none());
            }
            other => panic!("unexpected policy kind: {other:?}"),
        }
    }

    #[test]
    fn scale_in_false_disables_scale_in() {
        let spec = ScalingPolicySpec::Target {
            target: TargetMetric::Cpu,
            value: Some(50.0),
            scale_in_cooldown: None,
            scale_out_cooldown: None,
            scale_in: Some(false),
        };
        let docs = desired_policies(&resource(), &[spec]).unwrap();
        assert!(matches!(
            docs[0].kind,
            PolicyKind::TargetTracking { disable_scale_in: true, .. }
        ));
    }

    #[test]
    fn request_count_policy_needs_lb_label() {
        let docs = desired_policies(&resource(), &[target(TargetMetric::LbRequestsPerTarget)]).unwrap();
        assert!(matches!(
            &docs[0].kind,
            PolicyKind::TargetTracking { resource_label: Some(label), .. } if label.starts_with("app/lb")
        ));

        let mut bare = resource();
        bare.lb_label = None;
        assert!(matches!(
            desired_policies(&bare, &[target(TargetMetric::LbRequestsPerTarget)]),
            Err(ScalingError::MissingResourceLabel(_))
        ));
    }

    #[test]
    fn step_policy_gets_alarm_with_defaults() {
        let docs = desired_policies(&resource(), &[step("QueueDepth")]).unwrap();
        match &docs[0].kind {
            PolicyKind::Step {
                adjustment_type,
                cooldown_secs,
                aggregation,
                alarm,
                ..
            } => {
                assert_eq!(adjustment_type, "ChangeInCapacity");
                assert_eq!(*cooldown_secs, 60);
                assert_eq!(aggregation, "Average");
                assert_eq!(alarm.period_secs, 60);
                assert_eq!(alarm.evaluation_periods, 3);
                assert_eq!(alarm.unit, "Percent");
                assert_eq!(alarm.dimensions["ServiceName"], "api");
            }
            other => panic!("unexpected policy kind: {other:?}"),
        }
    }

    #[test]
    fn bounds_produce_no_policies() {
        let docs = desired_policies(
            &resource(),
            &[ScalingPolicySpec::Min { min: 1 }, ScalingPolicySpec::Desired { desired: 2 }],
        )
        .unwrap();
        assert!(docs.is_empty());
    }
}
