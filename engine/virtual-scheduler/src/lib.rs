//! # VirtualScheduler
//!
//! A deterministic, callback-driven stand-in for the home-automation platform's scheduler.
//!
//! Simulated time only moves when a test asks it to. Callbacks registered with
//! [`VirtualScheduler::insert_schedule`] are dispatched in ascending run time (ties broken by
//! insertion order) while [`VirtualScheduler::advance_time`] walks the clock forward, so a
//! firing callback always observes its own scheduled time through `now()`.

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod scheduler;
pub mod time;
pub mod types;

#[cfg(test)]
mod tests;


pub use api::SchedulerApi;
pub use config::SchedulerConfig;
pub use error::{PastAction, Result, SchedulerError};
pub use metrics::{DispatchMetrics, SchedulerMetrics};
pub use scheduler::VirtualScheduler;
pub use time::{FastForward, Localizer, TimeSpec};
pub use types::{Callback, Handle, Kwargs, PendingSnapshot};

/// Re-export commonly used time types
pub use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Current version of the VirtualScheduler
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default local offset from UTC, in seconds
pub const DEFAULT_UTC_OFFSET_SECONDS: i32 = 0;

/// Default log filter for test tracing
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Largest accepted local offset (a full day either side of UTC)
pub const MAX_UTC_OFFSET_SECONDS: i32 = 86_399;
