//! switchyard-health: rollout monitoring for the orchestrated backend.
//!
//! # Architecture
//!
//! ```text
//! DeploymentMonitor
//!   ├── locate_deployment()   poll_until(locate policy)
//!   ├── await_completion()    poll_until(rollout policy)
//!   │     ├── ProgressTracker (ramp-up vs. regression)
//!   │     └── classify(event) → FailureKind
//!   └── trailing logs via TelemetryClient on failure
//! ```
//!
//! Classification is a pure function over event text so it can be tested
//! without any provider. Every wait goes through `poll_until`, which
//! honours a `CancelSignal`.

pub mod classifier;
pub mod monitor;
pub mod poll;

pub use classifier::{FailureKind, classify};
pub use monitor::{CompletedRollout, DeploymentMonitor, MonitorError};
pub use poll::{CancelSignal, PollError, PollPolicy, PollSettings, PollStep, poll_until};
