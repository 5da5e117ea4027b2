use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::watch;

use todocal_core::{DayKey, UserId};
use todocal_engine::{BackendError, RemoteBackend, RemoteRow};

/// One request as it reached the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Select { user: UserId, from: DayKey, to: DayKey },
    Upsert { user: UserId, day: DayKey, text: String },
    Delete { user: UserId, day: DayKey },
}

/// In-process row store with failure injection and a fetch gate.
///
/// Rows are kept as the JSON a hosted table would return, keyed by user and
/// date string.
pub struct MemoryRemote {
    rows: Mutex<BTreeMap<(UserId, String), Value>>,
    raw_rows: Mutex<Vec<(UserId, Value)>>,
    calls: Mutex<Vec<RemoteCall>>,
    failing_fetches: AtomicUsize,
    failing_pushes: AtomicUsize,
    fetch_gate: watch::Sender<bool>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        let (fetch_gate, _) = watch::channel(false);
        Self {
            rows: Mutex::new(BTreeMap::new()),
            raw_rows: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            failing_fetches: AtomicUsize::new(0),
            failing_pushes: AtomicUsize::new(0),
            fetch_gate,
        }
    }

    /// Stores a row as if another device had pushed it.
    pub fn seed(&self, user: UserId, day: DayKey, text: &str) {
        let date = day.to_string();
        lock(&self.rows).insert(
            (user, date.clone()),
            json!({ "user_id": user, "date": date, "text": text }),
        );
    }

    /// Adds a row returned verbatim by every fetch for `user`, whatever the
    /// range. For rows the adapter should reject.
    pub fn insert_raw(&self, user: UserId, row: Value) {
        lock(&self.raw_rows).push((user, row));
    }

    pub fn text_of(&self, user: UserId, day: DayKey) -> Option<String> {
        lock(&self.rows)
            .get(&(user, day.to_string()))
            .and_then(|row| row.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub fn row_count(&self, user: UserId) -> usize {
        lock(&self.rows).keys().filter(|(u, _)| *u == user).count()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.calls).clone()
    }

    pub fn fetch_calls(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| matches!(call, RemoteCall::Select { .. }))
            .count()
    }

    pub fn push_calls(&self) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|call| !matches!(call, RemoteCall::Select { .. }))
            .count()
    }

    pub fn fail_next_fetches(&self, n: usize) {
        self.failing_fetches.store(n, Ordering::SeqCst);
    }

    pub fn fail_next_pushes(&self, n: usize) {
        self.failing_pushes.store(n, Ordering::SeqCst);
    }

    /// Fetch responses are held back until [`release_fetches`](Self::release_fetches).
    pub fn hold_fetches(&self) {
        self.fetch_gate.send_replace(true);
    }

    pub fn release_fetches(&self) {
        self.fetch_gate.send_replace(false);
    }

    fn record(&self, call: RemoteCall) {
        lock(&self.calls).push(call);
    }

    async fn wait_for_gate(&self) -> Result<(), BackendError> {
        let mut gate = self.fetch_gate.subscribe();
        loop {
            let held = *gate.borrow_and_update();
            if !held {
                return Ok(());
            }
            gate.changed().await?;
        }
    }
}

#[async_trait]
impl RemoteBackend for MemoryRemote {
    async fn select_range(
        &self,
        user: UserId,
        from: DayKey,
        to: DayKey,
    ) -> Result<Vec<Value>, BackendError> {
        self.record(RemoteCall::Select { user, from, to });

        // The response is read now and delivered once the gate opens.
        let (from, to) = (from.to_string(), to.to_string());
        let mut rows: Vec<Value> = lock(&self.rows)
            .iter()
            .filter(|((u, date), _)| *u == user && *date >= from && *date < to)
            .map(|(_, row)| row.clone())
            .collect();
        rows.extend(
            lock(&self.raw_rows)
                .iter()
                .filter(|(u, _)| *u == user)
                .map(|(_, row)| row.clone()),
        );

        self.wait_for_gate().await?;
        if take_one(&self.failing_fetches) {
            return Err("injected fetch failure".into());
        }
        Ok(rows)
    }

    async fn upsert(&self, row: RemoteRow) -> Result<(), BackendError> {
        self.record(RemoteCall::Upsert {
            user: row.user_id,
            day: row.date,
            text: row.text.clone(),
        });
        if take_one(&self.failing_pushes) {
            return Err("injected upsert failure".into());
        }
        let value = serde_json::to_value(&row)?;
        lock(&self.rows).insert((row.user_id, row.date.to_string()), value);
        Ok(())
    }

    async fn delete(&self, user: UserId, date: DayKey) -> Result<(), BackendError> {
        self.record(RemoteCall::Delete { user, day: date });
        if take_one(&self.failing_pushes) {
            return Err("injected delete failure".into());
        }
        lock(&self.rows).remove(&(user, date.to_string()));
        Ok(())
    }
}

/// Consumes one injected failure if any are left.
fn take_one(counter: &AtomicUsize) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
