use std::sync::{Mutex, PoisonError};

use todocal_engine::{Notifier, RetryableFailure};

/// Keeps every reported failure so a test can inspect it and run its retry.
#[derive(Default)]
pub struct RecordingNotifier {
    failures: Mutex<Vec<RetryableFailure>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the failures reported so far, oldest first.
    pub fn take(&self) -> Vec<RetryableFailure> {
        std::mem::take(&mut *self.failures.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn report(&self, failure: RetryableFailure) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(failure);
    }
}
