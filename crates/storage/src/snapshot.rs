use todocal_core::TodoMap;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::traits::{KvMedium, LocalStore};

/// Key the day snapshot has always lived under.
pub const SNAPSHOT_KEY: &str = "todo-cal-v1";

/// [`LocalStore`] that keeps the whole map as one MessagePack value.
///
/// One value per snapshot means a save is a single medium write, so a reader
/// can never observe half of an update.
pub struct SnapshotStore<M> {
    medium: M,
    key: String,
}

impl<M: KvMedium> SnapshotStore<M> {
    pub fn new(medium: M) -> Self {
        Self::with_key(medium, SNAPSHOT_KEY)
    }

    pub fn with_key(medium: M, key: impl Into<String>) -> Self {
        Self {
            medium,
            key: key.into(),
        }
    }

    pub fn medium(&self) -> &M {
        &self.medium
    }

    pub fn medium_mut(&mut self) -> &mut M {
        &mut self.medium
    }

    pub fn into_medium(self) -> M {
        self.medium
    }

    /// Like [`LocalStore::load`] but reports why a snapshot was unusable.
    pub fn try_load(&self) -> Result<TodoMap, StorageError> {
        let Some(bytes) = self.medium.get(&self.key)? else {
            return Ok(TodoMap::new());
        };
        rmp_serde::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
            key: self.key.clone(),
            reason: e.to_string(),
        })
    }
}

impl<M: KvMedium> LocalStore for SnapshotStore<M> {
    fn load(&self) -> TodoMap {
        match self.try_load() {
            Ok(map) => {
                debug!(key = %self.key, days = map.len(), "loaded local snapshot");
                map
            }
            Err(err) => {
                warn!(key = %self.key, error = %err, "discarding unreadable local snapshot");
                TodoMap::new()
            }
        }
    }

    fn save(&mut self, map: &TodoMap) -> Result<(), StorageError> {
        if map.is_empty() {
            return self.medium.remove(&self.key);
        }
        let bytes = rmp_serde::to_vec(map).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.medium.set(&self.key, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryKv, SqliteKv};
    use todocal_core::{DayKey, ItemList};

    fn sample() -> TodoMap {
        [(
            DayKey::parse("2025-11-06").unwrap(),
            ItemList::parse("Buy milk\nCall mom"),
        )]
        .into_iter()
        .collect()
    }

    #[test]
    fn missing_snapshot_loads_empty() {
        let store = SnapshotStore::new(MemoryKv::new());
        assert!(store.load().is_empty());
    }

    #[test]
    fn save_then_load() -> Result<(), StorageError> {
        let mut store = SnapshotStore::new(SqliteKv::open_in_memory()?);
        store.save(&sample())?;
        assert_eq!(store.load(), sample());
        Ok(())
    }

    #[test]
    fn corrupt_snapshot_loads_empty() -> Result<(), StorageError> {
        let mut medium = MemoryKv::new();
        medium.set(SNAPSHOT_KEY, b"{not msgpack")?;
        let store = SnapshotStore::new(medium);

        assert!(matches!(store.try_load(), Err(StorageError::Corrupt { .. })));
        assert!(store.load().is_empty());
        Ok(())
    }

    #[test]
    fn snapshot_with_bad_day_key_is_corrupt() -> Result<(), StorageError> {
        let mut raw = std::collections::BTreeMap::new();
        raw.insert("someday".to_string(), vec!["x".to_string()]);
        let mut medium = MemoryKv::new();
        medium.set(SNAPSHOT_KEY, &rmp_serde::to_vec(&raw).unwrap())?;

        assert!(SnapshotStore::new(medium).load().is_empty());
        Ok(())
    }

    #[test]
    fn saving_empty_map_clears_the_key() -> Result<(), StorageError> {
        let mut store = SnapshotStore::new(MemoryKv::new());
        store.save(&sample())?;
        store.save(&TodoMap::new())?;
        assert_eq!(store.medium().get(SNAPSHOT_KEY)?, None);
        Ok(())
    }
}
