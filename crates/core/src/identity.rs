use std::sync::{Arc, PoisonError, RwLock};

use crate::ids::UserId;

/// Source of the signed-in user, owned by the auth layer.
///
/// Implementations must be cheap to query; callers ask on every remote call
/// instead of caching the answer.
pub trait SessionProvider: Send + Sync {
    fn current(&self) -> Option<UserId>;
}

/// A session slot the auth layer writes and the sync layer reads.
#[derive(Clone, Default)]
pub struct SharedSession {
    user: Arc<RwLock<Option<UserId>>>,
}

impl SharedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: UserId) -> Self {
        let session = Self::new();
        session.sign_in(user);
        session
    }

    pub fn sign_in(&self, user: UserId) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = Some(user);
    }

    pub fn sign_out(&self) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl SessionProvider for SharedSession {
    fn current(&self) -> Option<UserId> {
        *self.user.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// No auth at all: remote sync stays gated off.
pub struct Anonymous;

impl SessionProvider for Anonymous {
    fn current(&self) -> Option<UserId> {
        None
    }
}
