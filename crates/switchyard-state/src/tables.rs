//! redb table definitions for the switchyard state store.
//!
//! Both tables use `&str` keys and `&[u8]` values. Container snapshots are
//! JSON-serialized; project values are raw UTF-8.

use redb::TableDefinition;

/// `ContainerSnapshot` keyed by container name.
pub const CONTAINERS: TableDefinition<&str, &[u8]> = TableDefinition::new("containers");

/// Project-wide values keyed by a fixed name (see `keys`).
pub const PROJECT: TableDefinition<&str, &[u8]> = TableDefinition::new("project");

pub mod keys {
    /// Forwarded-auth token attached to every routing rule.
    pub const FORWARD_TOKEN: &str = "forward_token";
}
