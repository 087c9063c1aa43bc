//! switchyard-state: embedded deployment-state store.
//!
//! Backed by [redb](https://docs.rs/redb). Holds, per container, the spec
//! applied by the last completed deployment (secrets redacted) and the
//! deployment record as of the latest checkpoint. A project-level table
//! keeps values shared by every container, such as the forwarded-auth
//! token.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use store::StateStore;
