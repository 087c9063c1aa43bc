//! Redaction of secret-bearing spec fields before they are persisted.
//!
//! Values are replaced by a short deterministic digest, so two specs with
//! the same secret redact identically and a changed secret still shows up
//! in a diff.

use sha2::{Digest, Sha256};

use crate::types::ContainerSpec;

const ENV_PREFIX: &str = "environment-";

/// Deterministic stand-in for a secret value.
pub fn scramble(prefix: &str, value: &str) -> String {
    let digest = hex::encode(Sha256::digest(value.as_bytes()));
    format!("{prefix}{}", &digest[..6])
}

/// Copy of `spec` with every environment value scrambled.
pub fn redact_spec(spec: &ContainerSpec) -> ContainerSpec {
    let mut redacted = spec.clone();
    for value in redacted.environment.values_mut() {
        *value = scramble(ENV_PREFIX, value);
    }
    redacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BackendType, ComputeConfig, RoutingConfig};
    use std::collections::BTreeMap;

    fn spec(env: &[(&str, &str)]) -> ContainerSpec {
        ContainerSpec {
            name: "api".to_string(),
            src: "./api".to_string(),
            compute: ComputeConfig {
                backend: BackendType::Function,
                cpu: None,
                memory: None,
                timeout_secs: None,
                network_attached: false,
                scale: Vec::new(),
            },
            routing: RoutingConfig {
                path_pattern: "/*".to_string(),
                health_check_path: None,
                domain: None,
            },
            environment: env
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            access_policy: None,
        }
    }

    #[test]
    fn redaction_is_deterministic_and_hides_values() {
        let a = redact_spec(&spec(&[("TOKEN", "s3cret")]));
        let b = redact_spec(&spec(&[("TOKEN", "s3cret")]));
        assert_eq!(a, b);
        let value = &a.environment["TOKEN"];
        assert!(value.starts_with("environment-"));
        assert_eq!(value.len(), "environment-".len() + 6);
        assert!(!value.contains("s3cret"));
    }

    #[test]
    fn changed_secret_redacts_differently() {
        let a = redact_spec(&spec(&[("TOKEN", "one")]));
        let b = redact_spec(&spec(&[("TOKEN", "two")]));
        assert_ne!(a.environment["TOKEN"], b.environment["TOKEN"]);
    }
}
