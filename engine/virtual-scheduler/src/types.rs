//! Pending-callback records and the handles that name them

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Keyword arguments handed back to a callback when it is dispatched
pub type Kwargs = serde_json::Map<String, serde_json::Value>;

/// Shared, invocable callback. Stored by reference; invoked with its kwargs on dispatch.
pub type Callback = Arc<dyn Fn(&Kwargs) + Send + Sync>;

/// Opaque token identifying one pending callback
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Handle(Uuid);

impl Handle {
    /// A fresh handle; the scheduler knows it only once a callback is inserted under it
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// A registered callback waiting for simulated time to reach `run_at`
pub(crate) struct PendingCallback {
    pub handle: Handle,
    /// Insertion number; breaks ties between equal `run_at` values
    pub sequence: u64,
    /// Naive UTC
    pub run_at: NaiveDateTime,
    pub callback: Callback,
    pub kwargs: Kwargs,
    /// Seconds between runs, 0 for one-shot
    pub interval: u64,
}

impl PendingCallback {
    pub fn dispatch_key(&self) -> (NaiveDateTime, u64) {
        (self.run_at, self.sequence)
    }

    pub fn snapshot(&self) -> PendingSnapshot {
        PendingSnapshot {
            handle: self.handle.clone(),
            run_at: self.run_at.and_utc(),
            interval: self.interval,
            kwargs: self.kwargs.clone(),
        }
    }
}

impl fmt::Debug for PendingCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCallback")
            .field("handle", &self.handle)
            .field("sequence", &self.sequence)
            .field("run_at", &self.run_at)
            .field("kwargs", &self.kwargs)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Read-only view of a pending callback, for introspection from tests
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingSnapshot {
    pub handle: Handle,
    pub run_at: DateTime<Utc>,
    pub interval: u64,
    pub kwargs: Kwargs,
}

/// A callback lifted out of the pending set for one dispatch
pub(crate) struct DueCallback {
    pub handle: Handle,
    pub run_at: NaiveDateTime,
    pub callback: Callback,
    pub kwargs: Kwargs,
}
