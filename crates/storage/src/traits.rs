use todocal_core::TodoMap;

use crate::error::StorageError;

/// Synchronous, process-scoped byte storage addressed by string keys.
pub trait KvMedium {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Replaces the value under `key` in one write.
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

/// Durable home of the whole day → items snapshot.
pub trait LocalStore {
    /// The persisted snapshot. Absent or unreadable content loads as empty.
    fn load(&self) -> TodoMap;

    /// Replaces the persisted snapshot. A later `load` sees either the old
    /// snapshot or this one, never a mix.
    fn save(&mut self, map: &TodoMap) -> Result<(), StorageError>;
}
