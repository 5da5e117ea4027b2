pub mod error;
pub mod memory;
pub mod schema;
pub mod snapshot;
pub mod sqlite;
pub mod traits;

pub use error::StorageError;
pub use memory::MemoryKv;
pub use snapshot::{SNAPSHOT_KEY, SnapshotStore};
pub use sqlite::SqliteKv;
pub use traits::*;
