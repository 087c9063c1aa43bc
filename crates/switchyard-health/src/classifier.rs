//! Failure classification of service status events.
//!
//! Pure text matching, no I/O. The monitor feeds it every event newer than
//! the deployment under observation.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static PORT_REFERENCE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\(port \d+\)").ok());

/// Why a rollout is failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Targets fail health checks on the port they were registered with;
    /// nothing is listening there.
    PortMisconfigured,
    /// Targets answer health checks with a non-success status.
    HealthCheck,
    /// The container process exited.
    Crash,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::PortMisconfigured => "port-misconfigured",
            FailureKind::HealthCheck => "health-check",
            FailureKind::Crash => "crash",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify one event message. Case-insensitive.
pub fn classify(message: &str) -> Option<FailureKind> {
    let text = message.to_lowercase();

    if text.contains("container") && text.contains("exited") {
        return Some(FailureKind::Crash);
    }
    if !text.contains("is unhealthy in") {
        return None;
    }
    if text.contains("with these codes") {
        return Some(FailureKind::HealthCheck);
    }
    let port_reference = PORT_REFERENCE
        .as_ref()
        .is_some_and(|re| re.is_match(&text));
    if port_reference {
        Some(FailureKind::PortMisconfigured)
    } else {
        Some(FailureKind::HealthCheck)
    }
}
