use std::fmt;
use std::time::Duration;

use thiserror::Error;
use todocal_core::CoreError;
use todocal_storage::StorageError;

/// Whatever the backing service raised, boxed so any client can plug in.
pub type BackendError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOp {
    FetchRange,
    UpsertDay,
    DeleteDay,
}

impl RemoteOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchRange => "fetch_range",
            Self::UpsertDay => "upsert_day",
            Self::DeleteDay => "delete_day",
        }
    }
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A remote call that reached the backing service and did not succeed.
#[derive(Debug, Error)]
pub enum RemoteFailure {
    #[error("remote {op} failed: {source}")]
    Backend {
        op: RemoteOp,
        #[source]
        source: BackendError,
    },

    #[error("remote {op} timed out after {timeout:?}")]
    TimedOut { op: RemoteOp, timeout: Duration },
}

impl RemoteFailure {
    pub fn op(&self) -> RemoteOp {
        match self {
            Self::Backend { op, .. } | Self::TimedOut { op, .. } => *op,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("logging setup failed: {0}")]
    Telemetry(String),
}
