//! switchyard-rollout: deploys containers across two interchangeable
//! compute backends without dropping traffic.
//!
//! # Architecture
//!
//! ```text
//! Deployer::deploy_project
//!   └── per container (ConcurrencyCoordinator pipeline slot)
//!         ├── hash source ─► ChangeDetector ─► skip? (persist, done)
//!         └── CutoverCoordinator
//!               ├── A  Router::stage        (load-balancer lock)
//!               ├── B  ArtifactPipeline ─► ComputeDeploymentStrategy::deploy
//!               │        ├── FunctionStrategy
//!               │        └── OrchestratedStrategy ─► DeploymentMonitor, PolicySyncer
//!               ├── C  Router::promote      (load-balancer lock)
//!               └── D  previous strategy ::decommission
//! ```
//!
//! The `DeploymentRecord` is owned by the per-container run, passed by
//! reference into each phase and checkpointed to the state store between
//! phases.

pub mod artifacts;
pub mod change;
pub mod concurrency;
pub mod context;
pub mod cutover;
pub mod deployer;
pub mod error;
pub mod routing;
pub mod strategy;

pub use change::ChangeDetector;
pub use concurrency::ConcurrencyCoordinator;
pub use cutover::CutoverCoordinator;
pub use deployer::{ContainerOutcome, ContainerReport, DeployOptions, Deployer, Providers};
pub use error::{ConfigurationError, DeployError};
pub use strategy::{BackendResourceRef, ComputeDeploymentStrategy};
