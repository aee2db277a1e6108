//! Awaitable scheduler surface, as the platform's cooperative runtime calls it

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::Result;
use crate::scheduler::VirtualScheduler;
use crate::types::{Callback, Handle, Kwargs};

/// The scheduler calls automations may await
///
/// Every method resolves immediately from the synchronous result; none waits on other
/// cooperative work, so it is safe to await from inside a dispatching callback.
#[async_trait::async_trait]
pub trait SchedulerApi: Send + Sync {
    /// Current time in UTC
    async fn get_now(&self) -> DateTime<Utc>;

    /// Current time as epoch seconds
    async fn get_now_ts(&self) -> f64;

    /// Current local wall-clock time, zone stripped
    async fn get_now_naive(&self) -> NaiveDateTime;

    /// Register a callback at an absolute time
    async fn insert_schedule(
        &self,
        run_at: DateTime<Utc>,
        callback: Callback,
        kwargs: Kwargs,
        interval: u64,
    ) -> Result<Handle>;

    /// Cancel a pending callback
    async fn cancel_timer(&self, handle: &Handle) -> bool;
}

#[async_trait::async_trait]
impl SchedulerApi for VirtualScheduler {
    async fn get_now(&self) -> DateTime<Utc> {
        self.now()
    }

    async fn get_now_ts(&self) -> f64 {
        self.now_as_timestamp()
    }

    async fn get_now_naive(&self) -> NaiveDateTime {
        self.now_naive()
    }

    async fn insert_schedule(
        &self,
        run_at: DateTime<Utc>,
        callback: Callback,
        kwargs: Kwargs,
        interval: u64,
    ) -> Result<Handle> {
        self.insert_callback(run_at, callback, kwargs, interval)
    }

    async fn cancel_timer(&self, handle: &Handle) -> bool {
        self.cancel(handle)
    }
}
