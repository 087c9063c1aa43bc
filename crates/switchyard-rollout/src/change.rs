//! ChangeDetector: decides whether a container needs any work.
//!
//! Compares the declared spec with the snapshot persisted by the last
//! completed deployment. Each flag is independent; the deploy decision ORs
//! them with the force flag.

use serde_json::Value;
use switchyard_core::diff::{Change, diff_values};
use switchyard_core::redact::redact_spec;
use switchyard_core::{ChangeSet, ContainerSnapshot, ContainerSpec};
use tracing::debug;

/// Fields that never count as compute configuration.
const NON_COMPUTE_FIELDS: &[&str] = &["routing", "access_policy"];

pub struct ChangeDetector;

impl ChangeDetector {
    /// Flags for `spec` against `previous`, given the fresh source hash.
    pub fn detect(
        spec: &ContainerSpec,
        previous: Option<&ContainerSnapshot>,
        source_hash: &str,
    ) -> ChangeSet {
        let prev_spec = previous.and_then(|p| p.spec.as_ref());
        let record = previous.map(|p| &p.record);

        let code_changed = record
            .is_none_or(|r| r.source_hash.as_deref() != Some(source_hash));

        let backend_type_changed =
            prev_spec.is_some_and(|p| p.compute.backend != spec.compute.backend);

        let routing_diff = match prev_spec {
            Some(p) => diff_values(&to_value(&p.routing), &to_value(&spec.routing)),
            None => Vec::new(),
        };
        let routing_changed = prev_spec.is_none() || !routing_diff.is_empty();

        let compute_diff = diff_values(
            &prev_spec.map(compute_view).unwrap_or(Value::Null),
            &compute_view(&redact_spec(spec)),
        );
        let compute_config_changed = !compute_diff.is_empty();

        let images_missing = record.is_none_or(|r| !r.artifacts.complete());

        log_diff(&spec.name, "routing", &routing_diff);
        log_diff(&spec.name, "compute", &compute_diff);

        ChangeSet {
            code_changed,
            backend_type_changed,
            compute_config_changed,
            routing_changed,
            images_missing,
        }
    }
}

fn to_value<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_default()
}

/// The spec as compared for compute changes: everything except routing and
/// the access-policy body. Environment values are already redacted.
fn compute_view(spec: &ContainerSpec) -> Value {
    let mut value = to_value(spec);
    if let Value::Object(map) = &mut value {
        for field in NON_COMPUTE_FIELDS {
            map.remove(*field);
        }
    }
    value
}

fn log_diff(container: &str, section: &str, changes: &[Change]) {
    for change in changes {
        debug!(%container, section, path = %change.path(), "spec changed");
    }
}
