pub mod bootstrap;
pub mod config;
pub mod error;
pub mod inflight;
pub mod notifier;
pub mod remote;
pub mod telemetry;

pub use crate::config::Config;
pub use error::{BackendError, EngineError, RemoteFailure, RemoteOp};
pub use inflight::{InFlightGuard, InFlightSet};
pub use notifier::{
    ChannelNotifier, LogNotifier, NoticeText, Notifier, RetryAction, RetryableFailure,
    SyncOperation,
};
pub use remote::{RemoteAdapter, RemoteBackend, RemoteDay, RemoteRow, RemoteSession};

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use todocal_core::{DayKey, ItemList, MonthView, PeriodKey, TodoMap, UserId};
use todocal_storage::LocalStore;

/// What a call to [`SyncEngine::ensure_period_loaded`] ended up doing.
///
/// Errors are never carried here; they go to the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodLoad {
    /// Remote sync is off, the local snapshot stands.
    Unavailable,
    /// Another fetch for the same user and period is outstanding.
    AlreadyInFlight,
    /// The period was replaced with `days` remote days.
    Loaded { days: usize },
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodState {
    NotLoaded,
    Loading,
    Loaded,
}

/// Contents of the per-day editor when it opens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayDraft {
    pub day: DayKey,
    pub text: String,
    pub show_delete: bool,
}

struct EngineState {
    todos: TodoMap,
    store: Box<dyn LocalStore + Send>,
    visible: PeriodKey,
    loaded: HashSet<(UserId, PeriodKey)>,
}

impl EngineState {
    /// Local saves never fail the caller; the in-memory map keeps serving.
    fn persist(&mut self) {
        if let Err(e) = self.store.save(&self.todos) {
            error!(error = %e, days = self.todos.len(), "failed to persist local snapshot");
        }
    }
}

struct EngineInner {
    state: Mutex<EngineState>,
    inflight: InFlightSet,
    remote: RemoteAdapter,
    notifier: Arc<dyn Notifier>,
    notice: NoticeText,
}

/// Local-first owner of the day map.
///
/// Every edit lands in memory and in the local store before its remote push is
/// spawned. Remote fetches replace one month at a time. Clones share state.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<EngineInner>,
}

pub struct EngineBuilder {
    remote: RemoteAdapter,
    notifier: Arc<dyn Notifier>,
    visible: PeriodKey,
    notice: NoticeText,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            remote: RemoteAdapter::disabled(),
            notifier: Arc::new(LogNotifier),
            visible: PeriodKey::current(),
            notice: NoticeText::default(),
        }
    }
}

impl EngineBuilder {
    pub fn remote(mut self, remote: RemoteAdapter) -> Self {
        self.remote = remote;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn visible(mut self, period: PeriodKey) -> Self {
        self.visible = period;
        self
    }

    pub fn notice(mut self, notice: NoticeText) -> Self {
        self.notice = notice;
        self
    }

    /// Hydrates from `store` and returns the engine. No remote call is made.
    pub fn build(self, store: impl LocalStore + Send + 'static) -> SyncEngine {
        let todos = store.load();
        debug!(days = todos.len(), visible = %self.visible, "hydrated from local store");
        SyncEngine {
            inner: Arc::new(EngineInner {
                state: Mutex::new(EngineState {
                    todos,
                    store: Box::new(store),
                    visible: self.visible,
                    loaded: HashSet::new(),
                }),
                inflight: InFlightSet::new(),
                remote: self.remote,
                notifier: self.notifier,
                notice: self.notice,
            }),
        }
    }
}

#[derive(Debug, Clone)]
enum Push {
    Upsert(DayKey, ItemList),
    Delete(DayKey),
}

impl Push {
    fn operation(&self) -> SyncOperation {
        match self {
            Self::Upsert(day, items) => SyncOperation::UpsertDay {
                day: *day,
                items: items.clone(),
            },
            Self::Delete(day) => SyncOperation::DeleteDay(*day),
        }
    }
}

impl SyncEngine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    // ---- Reads ----

    pub fn snapshot(&self) -> TodoMap {
        self.with_state(|state| state.todos.clone())
    }

    pub fn items_for(&self, day: DayKey) -> Option<ItemList> {
        self.with_state(|state| state.todos.get(&day).cloned())
    }

    /// What the local store holds right now, read back from the medium.
    pub fn local_snapshot(&self) -> TodoMap {
        self.with_state(|state| state.store.load())
    }

    pub fn visible_period(&self) -> PeriodKey {
        self.with_state(|state| state.visible)
    }

    pub fn month_view(&self, period: PeriodKey) -> MonthView {
        self.with_state(|state| MonthView::build(period, &state.todos))
    }

    pub fn visible_month_view(&self) -> MonthView {
        self.with_state(|state| MonthView::build(state.visible, &state.todos))
    }

    pub fn edit_draft(&self, day: DayKey) -> DayDraft {
        let items = self.items_for(day).unwrap_or_default();
        DayDraft {
            day,
            text: items.join(),
            show_delete: !items.is_empty(),
        }
    }

    pub fn is_remote_available(&self) -> bool {
        self.inner.remote.is_available()
    }

    /// Load state of `period` for the signed-in user. Without remote sync
    /// every period is `NotLoaded`.
    pub fn period_state(&self, period: PeriodKey) -> PeriodState {
        let Some(session) = self.inner.remote.session() else {
            return PeriodState::NotLoaded;
        };
        let user = session.user();
        if self.inner.inflight.contains(user, period) {
            PeriodState::Loading
        } else if self.with_state(|state| state.loaded.contains(&(user, period))) {
            PeriodState::Loaded
        } else {
            PeriodState::NotLoaded
        }
    }

    // ---- Remote loading ----

    /// Refreshes `period` from the remote copy, at most one fetch per user
    /// and period at a time.
    ///
    /// On success the days of `period` are replaced by the fetched rows and
    /// persisted; days of other months are untouched. On failure the map is
    /// left alone and the notifier gets a retry that calls this again.
    #[tracing::instrument(skip_all, fields(period = %period))]
    pub async fn ensure_period_loaded(&self, period: PeriodKey) -> PeriodLoad {
        let Some(session) = self.inner.remote.session() else {
            debug!("remote sync unavailable, keeping local snapshot");
            return PeriodLoad::Unavailable;
        };
        let user = session.user();
        let Some(guard) = self.inner.inflight.try_begin(user, period) else {
            debug!(%user, "fetch already in flight");
            return PeriodLoad::AlreadyInFlight;
        };

        let (from, to) = period.day_range();
        match session.fetch_range(from, to).await {
            Ok(rows) => {
                let fetched = rows.len();
                let fresh: TodoMap = rows
                    .into_iter()
                    .map(|row| (row.day, ItemList::parse(&row.text)))
                    .filter(|(_, items)| !items.is_empty())
                    .collect();
                let days = self.with_state(|state| {
                    let days = state.todos.replace_period(period, fresh);
                    state.loaded.insert((user, period));
                    state.persist();
                    days
                });
                drop(guard);
                info!(%user, rows = fetched, days, "merged remote period");
                PeriodLoad::Loaded { days }
            }
            Err(e) => {
                drop(guard);
                warn!(%user, error = %e, "period fetch failed");
                self.report(
                    SyncOperation::FetchPeriod(period),
                    e,
                    fetch_retry(self.clone(), period),
                );
                PeriodLoad::Failed
            }
        }
    }

    /// `month0` is zero-based, as in `PeriodKey::new`.
    pub async fn ensure_month_loaded(&self, year: i32, month0: u32) -> Result<PeriodLoad, EngineError> {
        let period = PeriodKey::new(year, month0)?;
        Ok(self.ensure_period_loaded(period).await)
    }

    // ---- Navigation ----

    pub async fn navigate_to(&self, period: PeriodKey) -> PeriodLoad {
        self.with_state(|state| state.visible = period);
        self.ensure_period_loaded(period).await
    }

    pub async fn show_next_month(&self) -> PeriodLoad {
        let next = self.visible_period().next();
        self.navigate_to(next).await
    }

    pub async fn show_previous_month(&self) -> PeriodLoad {
        let prev = self.visible_period().prev();
        self.navigate_to(prev).await
    }

    // ---- Edits ----

    /// Replaces the items of `day` with the lines of `raw`.
    ///
    /// The map and the local store are updated before this returns. The
    /// remote push runs on a spawned task; its failure goes to the notifier,
    /// so the handle only says when the push is over. Needs a tokio runtime.
    pub fn edit_day(&self, day: DayKey, raw: &str) -> JoinHandle<()> {
        let items = ItemList::parse(raw);
        let push = if items.is_empty() {
            Push::Delete(day)
        } else {
            Push::Upsert(day, items.clone())
        };
        self.with_state(|state| {
            state.todos.set(day, items);
            state.persist();
        });
        debug!(%day, operation = %push.operation(), "applied local edit");
        tokio::spawn(self.clone().push(push))
    }

    pub fn delete_day(&self, day: DayKey) -> JoinHandle<()> {
        self.edit_day(day, "")
    }

    async fn push(self, push: Push) {
        let result = match &push {
            Push::Upsert(day, items) => self.inner.remote.upsert_day(*day, items).await,
            Push::Delete(day) => self.inner.remote.delete_day(*day).await,
        };
        if let Err(e) = result {
            warn!(operation = %push.operation(), error = %e, "remote push failed");
            let operation = push.operation();
            let retry = push_retry(self.clone(), push);
            self.report(operation, e, retry);
        }
    }

    fn report(&self, operation: SyncOperation, error: RemoteFailure, retry: RetryAction) {
        self.inner.notifier.report(RetryableFailure::new(
            self.inner.notice.clone(),
            operation,
            error,
            retry,
        ));
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut EngineState) -> T) -> T {
        let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

// Retries are built outside the async fns they replay.

fn fetch_retry(engine: SyncEngine, period: PeriodKey) -> RetryAction {
    RetryAction::new(move || {
        let engine = engine.clone();
        async move {
            engine.ensure_period_loaded(period).await;
        }
    })
}

fn push_retry(engine: SyncEngine, push: Push) -> RetryAction {
    RetryAction::new(move || engine.clone().push(push.clone()))
}
