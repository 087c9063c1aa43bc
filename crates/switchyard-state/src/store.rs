//! StateStore: redb-backed persistence of deployment records.
//!
//! One `ContainerSnapshot` per container, JSON-serialized into redb's
//! `&[u8]` value column, plus a small table of project-wide values. The
//! store supports both on-disk and in-memory backends (the latter for
//! testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use switchyard_core::ContainerSnapshot;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Unavailable))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Unavailable))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
        txn.open_table(PROJECT).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Container snapshots ────────────────────────────────────────

    /// Previous snapshot of a container, `None` on first deploy.
    pub fn load(&self, container: &str) -> StateResult<Option<ContainerSnapshot>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
        match table.get(container).map_err(map_err!(Read))? {
            Some(guard) => {
                let snapshot: ContainerSnapshot =
                    serde_json::from_slice(guard.value()).map_err(map_err!(CorruptSnapshot))?;
                Ok(Some(snapshot))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace a container snapshot.
    pub fn save(&self, snapshot: &ContainerSnapshot) -> StateResult<()> {
        let value = serde_json::to_vec(snapshot).map_err(map_err!(Encode))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
            table
                .insert(snapshot.name.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(container = %snapshot.name, "snapshot saved");
        Ok(())
    }

    /// All stored snapshots, ordered by container name.
    pub fn list(&self) -> StateResult<Vec<ContainerSnapshot>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let snapshot: ContainerSnapshot =
                serde_json::from_slice(value.value()).map_err(map_err!(CorruptSnapshot))?;
            results.push(snapshot);
        }
        Ok(results)
    }

    /// Forget a container. Returns true if it existed.
    pub fn delete(&self, container: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(CONTAINERS).map_err(map_err!(Table))?;
            existed = table.remove(container).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%container, existed, "snapshot deleted");
        Ok(existed)
    }

    // ── Project values ─────────────────────────────────────────────

    pub fn forward_token(&self) -> StateResult<Option<String>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(PROJECT).map_err(map_err!(Table))?;
        let token = table
            .get(keys::FORWARD_TOKEN)
            .map_err(map_err!(Read))?
            .map(|guard| String::from_utf8_lossy(guard.value()).into_owned());
        Ok(token)
    }

    /// Return the project's forwarded-auth token, generating and storing a
    /// new UUID v4 on first use.
    pub fn ensure_forward_token(&self) -> StateResult<String> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let token;
        {
            let mut table = txn.open_table(PROJECT).map_err(map_err!(Table))?;
            let existing = table
                .get(keys::FORWARD_TOKEN)
                .map_err(map_err!(Read))?
                .map(|guard| String::from_utf8_lossy(guard.value()).into_owned());
            token = match existing {
                Some(token) => token,
                None => {
                    let fresh = uuid::Uuid::new_v4().to_string();
                    table
                        .insert(keys::FORWARD_TOKEN, fresh.as_bytes())
                        .map_err(map_err!(Write))?;
                    debug!("forward token generated");
                    fresh
                }
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{BackendType, DeploymentRecord};

    fn snapshot(name: &str, hash: &str) -> ContainerSnapshot {
        ContainerSnapshot {
            name: name.to_string(),
            spec: None,
            record: DeploymentRecord {
                source_hash: Some(hash.to_string()),
                backend: Some(BackendType::Function),
                deployed_on_last_deployment: true,
                ..Default::default()
            },
        }
    }

    // ── Container snapshots ────────────────────────────────────────

    #[test]
    fn load_missing_container_is_none() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.load("api").unwrap().is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let store = StateStore::open_in_memory().unwrap();
        let snap = snapshot("api", "abc");
        store.save(&snap).unwrap();
        assert_eq!(store.load("api").unwrap(), Some(snap));
    }

    #[test]
    fn save_overwrites_previous_checkpoint() {
        let store = StateStore::open_in_memory().unwrap();
        store.save(&snapshot("api", "one")).unwrap();
        store.save(&snapshot("api", "two")).unwrap();

        let loaded = store.load("api").unwrap().unwrap();
        assert_eq!(loaded.record.source_hash.as_deref(), Some("two"));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn list_is_ordered_by_name() {
        let store = StateStore::open_in_memory().unwrap();
        store.save(&snapshot("web", "1")).unwrap();
        store.save(&snapshot("api", "2")).unwrap();
        let names: Vec<_> = store.list().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["api", "web"]);
    }

    #[test]
    fn delete_reports_existence() {
        let store = StateStore::open_in_memory().unwrap();
        store.save(&snapshot("api", "1")).unwrap();
        assert!(store.delete("api").unwrap());
        assert!(!store.delete("api").unwrap());
        assert!(store.load("api").unwrap().is_none());
    }

    #[test]
    fn unreadable_snapshot_is_reported_as_corrupt() {
        let store = StateStore::open_in_memory().unwrap();
        let txn = store.db.begin_write().unwrap();
        {
            let mut table = txn.open_table(CONTAINERS).unwrap();
            table.insert("api", b"not json".as_slice()).unwrap();
        }
        txn.commit().unwrap();

        let err = store.load("api").unwrap_err();
        assert!(matches!(err, StateError::CorruptSnapshot(_)), "{err:?}");
        assert!(err.to_string().starts_with("stored container snapshot is unreadable"));
    }

    // ── Project values ─────────────────────────────────────────────

    #[test]
    fn forward_token_is_generated_once() {
        let store = StateStore::open_in_memory().unwrap();
        assert!(store.forward_token().unwrap().is_none());

        let first = store.ensure_forward_token().unwrap();
        assert_eq!(first.len(), 36);
        assert_eq!(store.ensure_forward_token().unwrap(), first);
        assert_eq!(store.forward_token().unwrap(), Some(first));
    }

    #[test]
    fn persistent_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.redb");
        {
            let store = StateStore::open(&path).unwrap();
            store.save(&snapshot("api", "abc")).unwrap();
        }
        let store = StateStore::open(&path).unwrap();
        assert!(store.load("api").unwrap().is_some());
    }
}
