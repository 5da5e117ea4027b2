//! Optional remote copy of the day rows.
//!
//! [`RemoteBackend`] is the raw row store (one row per user and day, text
//! joined by `\n`). [`RemoteAdapter`] puts the gating in front of it: remote
//! sync must be enabled, a backend must be configured and a user must be
//! signed in, checked again on every call. Rows coming back from the backend
//! are validated here, so the engine only ever sees typed days.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use todocal_core::{Anonymous, DayKey, ItemList, SessionProvider, UserId};

use crate::error::{BackendError, RemoteFailure, RemoteOp};

/// Row shape written to the backing service. Conflict target is
/// `(user_id, date)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteRow {
    pub user_id: UserId,
    pub date: DayKey,
    pub text: String,
}

#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Rows of `user` with `from <= date < to`, exactly as the service
    /// returned them. An empty result is not an error.
    async fn select_range(
        &self,
        user: UserId,
        from: DayKey,
        to: DayKey,
    ) -> Result<Vec<serde_json::Value>, BackendError>;

    /// Inserts the row or overwrites the existing one for `(user_id, date)`.
    async fn upsert(&self, row: RemoteRow) -> Result<(), BackendError>;

    /// Removes the row for `(user, date)`. Removing a missing row succeeds.
    async fn delete(&self, user: UserId, date: DayKey) -> Result<(), BackendError>;
}

/// A validated remote row. `text` is still one unsplit string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDay {
    pub day: DayKey,
    pub text: String,
}

#[derive(Deserialize)]
struct WireRow {
    date: String,
    #[serde(default)]
    text: Option<String>,
}

pub struct RemoteAdapter {
    enabled: bool,
    backend: Option<Arc<dyn RemoteBackend>>,
    session: Arc<dyn SessionProvider>,
    timeout: Option<Duration>,
}

impl RemoteAdapter {
    pub fn new(backend: Option<Arc<dyn RemoteBackend>>, session: Arc<dyn SessionProvider>) -> Self {
        Self {
            enabled: true,
            backend,
            session,
            timeout: None,
        }
    }

    /// Local-only: every call is a no-op.
    pub fn disabled() -> Self {
        Self::new(None, Arc::new(Anonymous)).with_enabled(false)
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Per-request limit; `None` waits as long as the backend takes.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves the gating for one call. `None` means remote sync is off
    /// right now: disabled, no backend, or nobody signed in.
    pub fn session(&self) -> Option<RemoteSession> {
        if !self.enabled {
            return None;
        }
        let backend = self.backend.clone()?;
        let user = self.session.current()?;
        Some(RemoteSession {
            user,
            backend,
            timeout: self.timeout,
        })
    }

    pub fn is_available(&self) -> bool {
        self.session().is_some()
    }

    pub async fn fetch_range(&self, from: DayKey, to: DayKey) -> Result<Vec<RemoteDay>, RemoteFailure> {
        match self.session() {
            Some(session) => session.fetch_range(from, to).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn upsert_day(&self, day: DayKey, items: &ItemList) -> Result<(), RemoteFailure> {
        match self.session() {
            Some(session) => session.upsert_day(day, items).await,
            None => {
                debug!(%day, "remote sync unavailable, skipping upsert");
                Ok(())
            }
        }
    }

    pub async fn delete_day(&self, day: DayKey) -> Result<(), RemoteFailure> {
        match self.session() {
            Some(session) => session.delete_day(day).await,
            None => {
                debug!(%day, "remote sync unavailable, skipping delete");
                Ok(())
            }
        }
    }
}

/// Remote access for one signed-in user, resolved for a single call.
#[derive(Clone)]
pub struct RemoteSession {
    user: UserId,
    backend: Arc<dyn RemoteBackend>,
    timeout: Option<Duration>,
}

impl RemoteSession {
    pub fn user(&self) -> UserId {
        self.user
    }

    pub async fn fetch_range(&self, from: DayKey, to: DayKey) -> Result<Vec<RemoteDay>, RemoteFailure> {
        let values = self
            .call(
                RemoteOp::FetchRange,
                self.backend.select_range(self.user, from, to),
            )
            .await?;
        Ok(validate_rows(values, from, to))
    }

    pub async fn upsert_day(&self, day: DayKey, items: &ItemList) -> Result<(), RemoteFailure> {
        let row = RemoteRow {
            user_id: self.user,
            date: day,
            text: items.join(),
        };
        self.call(RemoteOp::UpsertDay, self.backend.upsert(row)).await
    }

    pub async fn delete_day(&self, day: DayKey) -> Result<(), RemoteFailure> {
        self.call(RemoteOp::DeleteDay, self.backend.delete(self.user, day))
            .await
    }

    async fn call<T>(
        &self,
        op: RemoteOp,
        request: impl Future<Output = Result<T, BackendError>>,
    ) -> Result<T, RemoteFailure> {
        let outcome = match self.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, request).await {
                Ok(outcome) => outcome,
                Err(_) => return Err(RemoteFailure::TimedOut { op, timeout }),
            },
            None => request.await,
        };
        outcome.map_err(|source| RemoteFailure::Backend { op, source })
    }
}

/// Keeps rows that match `{ date: "YYYY-MM-DD", text: string | null }` and
/// fall inside `[from, to)`. A missing or null text becomes `""`.
fn validate_rows(values: Vec<serde_json::Value>, from: DayKey, to: DayKey) -> Vec<RemoteDay> {
    let mut days = Vec::with_capacity(values.len());
    for value in values {
        let row: WireRow = match serde_json::from_value(value) {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "rejecting remote row with unexpected shape");
                continue;
            }
        };
        let day = match DayKey::parse(&row.date) {
            Ok(day) => day,
            Err(e) => {
                warn!(error = %e, "rejecting remote row with bad date");
                continue;
            }
        };
        if day < from || day >= to {
            warn!(%day, %from, %to, "rejecting remote row outside requested range");
            continue;
        }
        days.push(RemoteDay {
            day,
            text: row.text.unwrap_or_default(),
        });
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use todocal_core::SharedSession;

    fn day(s: &str) -> DayKey {
        DayKey::parse(s).unwrap()
    }

    struct Unreachable;

    #[async_trait]
    impl RemoteBackend for Unreachable {
        async fn select_range(
            &self,
            _user: UserId,
            _from: DayKey,
            _to: DayKey,
        ) -> Result<Vec<serde_json::Value>, BackendError> {
            Err("unreachable".into())
        }

        async fn upsert(&self, _row: RemoteRow) -> Result<(), BackendError> {
            Err("unreachable".into())
        }

        async fn delete(&self, _user: UserId, _date: DayKey) -> Result<(), BackendError> {
            Err("unreachable".into())
        }
    }

    struct Stalled;

    #[async_trait]
    impl RemoteBackend for Stalled {
        async fn select_range(
            &self,
            _user: UserId,
            _from: DayKey,
            _to: DayKey,
        ) -> Result<Vec<serde_json::Value>, BackendError> {
            std::future::pending().await
        }

        async fn upsert(&self, _row: RemoteRow) -> Result<(), BackendError> {
            std::future::pending().await
        }

        async fn delete(&self, _user: UserId, _date: DayKey) -> Result<(), BackendError> {
            std::future::pending().await
        }
    }

    #[test]
    fn validation_rejects_and_coerces_at_the_boundary() {
        let rows = vec![
            json!({ "date": "2025-11-06", "text": "Buy milk\nCall mom" }),
            json!({ "date": "2025-11-10", "text": null }),
            json!({ "date": "2025-11-11" }),
            json!({ "date": 20251112, "text": "numeric date" }),
            json!({ "text": "no date" }),
            json!({ "date": "11/13/2025", "text": "wrong format" }),
            json!({ "date": "2025-12-01", "text": "next month" }),
            json!({ "date": "2025-11-14", "text": 42 }),
        ];
        let days = validate_rows(rows, day("2025-11-01"), day("2025-12-01"));
        assert_eq!(
            days,
            vec![
                RemoteDay { day: day("2025-11-06"), text: "Buy milk\nCall mom".into() },
                RemoteDay { day: day("2025-11-10"), text: String::new() },
                RemoteDay { day: day("2025-11-11"), text: String::new() },
            ]
        );
    }

    #[test]
    fn gating_needs_flag_backend_and_user() {
        let session = SharedSession::new();
        let backend: Arc<dyn RemoteBackend> = Arc::new(Unreachable);

        let adapter = RemoteAdapter::new(Some(backend.clone()), Arc::new(session.clone()));
        assert!(!adapter.is_available(), "nobody signed in");

        session.sign_in(UserId::new());
        assert!(adapter.is_available());

        let adapter = RemoteAdapter::new(Some(backend), Arc::new(session.clone())).with_enabled(false);
        assert!(!adapter.is_available(), "disabled by config");

        let adapter = RemoteAdapter::new(None, Arc::new(session));
        assert!(!adapter.is_available(), "no backend configured");

        assert!(!RemoteAdapter::disabled().is_available());
    }

    #[tokio::test]
    async fn gated_calls_succeed_without_touching_the_backend() {
        let adapter = RemoteAdapter::new(Some(Arc::new(Unreachable)), Arc::new(SharedSession::new()));
        let (from, to) = (day("2025-11-01"), day("2025-12-01"));

        assert!(adapter.fetch_range(from, to).await.unwrap().is_empty());
        adapter.upsert_day(from, &ItemList::parse("x")).await.unwrap();
        adapter.delete_day(from).await.unwrap();
    }

    #[tokio::test]
    async fn backend_errors_become_remote_failures() {
        let session = SharedSession::signed_in(UserId::new());
        let adapter = RemoteAdapter::new(Some(Arc::new(Unreachable)), Arc::new(session));

        let err = adapter.delete_day(day("2025-11-06")).await.unwrap_err();
        assert_eq!(err.op(), RemoteOp::DeleteDay);
        assert!(err.to_string().contains("unreachable"));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        let session = SharedSession::signed_in(UserId::new());
        let adapter = RemoteAdapter::new(Some(Arc::new(Stalled)), Arc::new(session))
            .with_timeout(Some(Duration::from_millis(250)));

        let err = adapter
            .fetch_range(day("2025-11-01"), day("2025-12-01"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RemoteFailure::TimedOut { op: RemoteOp::FetchRange, .. }
        ));
    }
}
