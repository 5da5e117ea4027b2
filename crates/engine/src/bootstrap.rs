use std::sync::Arc;

use tracing::{info, warn};

use todocal_core::{PeriodKey, SessionProvider};
use todocal_storage::{SnapshotStore, SqliteKv};

use crate::config::Config;
use crate::error::EngineError;
use crate::notifier::{LogNotifier, Notifier};
use crate::remote::{RemoteAdapter, RemoteBackend};
use crate::SyncEngine;

/// Builds the engine a process runs with.
///
/// Remote sync is wired only when the config enables it and names a
/// service; `ui_notifier` receives failures only when `notify.surface_errors`
/// is set, otherwise they are logged.
pub fn open(
    config: &Config,
    backend: Option<Arc<dyn RemoteBackend>>,
    session: Arc<dyn SessionProvider>,
    ui_notifier: Arc<dyn Notifier>,
) -> Result<SyncEngine, EngineError> {
    config.validate()?;

    let medium = if config.storage.is_in_memory() {
        SqliteKv::open_in_memory()?
    } else {
        SqliteKv::open(&config.storage.path)?
    };

    if config.remote.enabled && !config.remote.is_configured() {
        warn!("remote sync enabled but url/anon_key missing; running local-only");
    }
    let remote = RemoteAdapter::new(backend, session)
        .with_enabled(config.remote.is_active())
        .with_timeout(config.remote.timeout());

    let notifier: Arc<dyn Notifier> = if config.notify.surface_errors {
        ui_notifier
    } else {
        Arc::new(LogNotifier)
    };

    let engine = SyncEngine::builder()
        .remote(remote)
        .notifier(notifier)
        .notice(config.notify.notice())
        .visible(PeriodKey::current())
        .build(SnapshotStore::new(medium));

    info!(
        storage = %config.storage.path,
        remote = config.remote.is_active(),
        surface_errors = config.notify.surface_errors,
        days = engine.snapshot().len(),
        "sync engine ready"
    );
    Ok(engine)
}
