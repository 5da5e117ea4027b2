use std::error::Error;
use std::sync::Arc;

use todocal_core::{CoreError, PeriodKey, SharedSession, UserId};
use todocal_engine::{RemoteAdapter, SyncEngine, telemetry};
use todocal_storage::{KvMedium, SnapshotStore, SqliteKv};

use crate::notifier::RecordingNotifier;
use crate::remote::MemoryRemote;

/// One signed-in device: an engine over an in-memory SQLite snapshot, talking
/// to a [`MemoryRemote`] and reporting into a [`RecordingNotifier`].
pub struct TestClient {
    pub engine: SyncEngine,
    pub remote: Arc<MemoryRemote>,
    pub session: SharedSession,
    pub notifier: Arc<RecordingNotifier>,
    pub user: UserId,
}

impl TestClient {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::with_medium(SqliteKv::open_in_memory()?, true)
    }

    /// Remote sync switched off by configuration.
    pub fn offline() -> Result<Self, Box<dyn Error>> {
        Self::with_medium(SqliteKv::open_in_memory()?, false)
    }

    pub fn with_medium<M>(medium: M, remote_enabled: bool) -> Result<Self, Box<dyn Error>>
    where
        M: KvMedium + Send + 'static,
    {
        Self::connect(medium, remote_enabled, Arc::new(MemoryRemote::new()), UserId::new())
    }

    /// A second device of the same user sharing this client's remote.
    pub fn another_device(&self) -> Result<Self, Box<dyn Error>> {
        Self::connect(
            SqliteKv::open_in_memory()?,
            true,
            self.remote.clone(),
            self.user,
        )
    }

    fn connect<M>(
        medium: M,
        remote_enabled: bool,
        remote: Arc<MemoryRemote>,
        user: UserId,
    ) -> Result<Self, Box<dyn Error>>
    where
        M: KvMedium + Send + 'static,
    {
        telemetry::init_for_tests();

        let session = SharedSession::signed_in(user);
        let notifier = Arc::new(RecordingNotifier::new());
        let adapter = RemoteAdapter::new(Some(remote.clone()), Arc::new(session.clone()))
            .with_enabled(remote_enabled);
        let engine = SyncEngine::builder()
            .remote(adapter)
            .notifier(notifier.clone())
            .visible(Self::november()?)
            .build(SnapshotStore::new(medium));

        Ok(Self {
            engine,
            remote,
            session,
            notifier,
            user,
        })
    }

    /// The month every scenario starts on.
    pub fn november() -> Result<PeriodKey, CoreError> {
        PeriodKey::new(2025, 10)
    }
}
