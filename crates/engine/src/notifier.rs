//! Error-reporting surface for remote failures.
//!
//! The engine never returns a remote error to its caller. Every failure is
//! packaged as a [`RetryableFailure`] that carries a ready-to-run replay of the
//! exact operation that failed, and handed to a [`Notifier`].

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use todocal_core::{DayKey, ItemList, PeriodKey};

use crate::error::RemoteFailure;

pub const DEFAULT_TITLE: &str = "Server error occurred (WLP-SRV-501)";
pub const DEFAULT_MESSAGE: &str = "Please wait a moment and try again.";

/// Zero-argument replay of a failed operation.
#[derive(Clone)]
pub struct RetryAction(Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>);

impl RetryAction {
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self(Arc::new(move || action().boxed()))
    }

    /// Runs the replay to completion. Failures of the replay are reported
    /// again through the same notifier.
    pub fn run(&self) -> BoxFuture<'static, ()> {
        (self.0)()
    }

    /// Runs the replay in the background. Needs a tokio runtime.
    pub fn spawn(&self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

impl fmt::Debug for RetryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryAction(..)")
    }
}

/// The operation a failure belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOperation {
    FetchPeriod(PeriodKey),
    UpsertDay { day: DayKey, items: ItemList },
    DeleteDay(DayKey),
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FetchPeriod(period) => write!(f, "fetch {period}"),
            Self::UpsertDay { day, items } => write!(f, "upsert {day} ({} items)", items.len()),
            Self::DeleteDay(day) => write!(f, "delete {day}"),
        }
    }
}

/// Human-readable text attached to every reported failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoticeText {
    pub title: String,
    pub message: String,
}

impl Default for NoticeText {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            message: DEFAULT_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug)]
pub struct RetryableFailure {
    pub title: String,
    pub message: String,
    pub operation: SyncOperation,
    pub error: RemoteFailure,
    retry: RetryAction,
}

impl RetryableFailure {
    pub fn new(
        notice: NoticeText,
        operation: SyncOperation,
        error: RemoteFailure,
        retry: RetryAction,
    ) -> Self {
        Self {
            title: notice.title,
            message: notice.message,
            operation,
            error,
            retry,
        }
    }

    pub fn retry(&self) -> BoxFuture<'static, ()> {
        self.retry.run()
    }

    pub fn retry_action(&self) -> RetryAction {
        self.retry.clone()
    }
}

/// Receives failures. Implementations decide whether and when to retry.
pub trait Notifier: Send + Sync {
    fn report(&self, failure: RetryableFailure);
}

/// Suppressed surface: the failure is logged and the retry dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn report(&self, failure: RetryableFailure) {
        warn!(
            operation = %failure.operation,
            error = %failure.error,
            "remote error (suppressed)"
        );
    }
}

/// Forwards failures to the UI task over a channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<RetryableFailure>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RetryableFailure>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn report(&self, failure: RetryableFailure) {
        if let Err(mpsc::error::SendError(failure)) = self.tx.send(failure) {
            debug!(operation = %failure.operation, "notification receiver gone, dropping failure");
        }
    }
}
