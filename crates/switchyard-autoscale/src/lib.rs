//! switchyard-autoscale: instance-count reconciliation and autoscaling
//! policy sync for the orchestrated backend.
//!
//! # Desired count
//!
//! ```text
//! target or step policy?  ─► keep running count inside [min, max]
//! explicit desired?       ─► desired, verbatim
//! nothing declared        ─► 1
//! min and max             ─► running if inside, else nearer bound
//! min only                ─► max(running, min)
//! max only                ─► min(running, max)
//! ```
//!
//! An unobserved running count is a distinct state, never treated as
//! "below the floor".
//!
//! # Policy sync
//!
//! The remote policy set is a pure function of the declarations: every
//! declared policy is put, every other policy on the resource is deleted.

pub mod error;
pub mod policy;
pub mod reconciler;
pub mod syncer;

pub use error::ScalingError;
pub use policy::{ScalableResource, desired_policies, validate};
pub use reconciler::{ScalingInputs, compute_desired_scaling};
pub use syncer::{PolicySyncer, SyncReport};
