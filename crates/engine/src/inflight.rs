use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use todocal_core::{PeriodKey, UserId};

type FetchKey = (UserId, PeriodKey);

/// Periods with a remote fetch currently outstanding, per user.
#[derive(Clone, Default)]
pub struct InFlightSet {
    keys: Arc<Mutex<HashSet<FetchKey>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `(user, period)` as fetching. `None` if it already is.
    ///
    /// The mark lives as long as the returned guard, so it is cleared on
    /// success, on failure, and when the fetching future is dropped.
    pub fn try_begin(&self, user: UserId, period: PeriodKey) -> Option<InFlightGuard> {
        let inserted = self.lock().insert((user, period));
        inserted.then(|| InFlightGuard {
            set: self.clone(),
            key: (user, period),
        })
    }

    pub fn contains(&self, user: UserId, period: PeriodKey) -> bool {
        self.lock().contains(&(user, period))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<FetchKey>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[must_use = "the period is only marked while the guard is alive"]
pub struct InFlightGuard {
    set: InFlightSet,
    key: FetchKey,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}
