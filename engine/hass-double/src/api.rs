//! The host API automations are written against

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use virtual_scheduler::{Callback, Handle, Kwargs};

use crate::error::{HassError, Result};
use crate::listeners::{EventCallback, ListenerHandle, StateCallback, StateListenOptions};
use crate::operation::Operation;

/// Severity of an automation log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Host operations available to an automation
///
/// Automations take an implementation of this trait at construction. Times given as naive
/// values are local wall-clock times of the host.
pub trait HassApi: Send + Sync {
    /// Name the automation was registered under
    fn name(&self) -> &str;

    /// Arguments from the automation's configuration
    fn args(&self) -> &Kwargs;

    fn log_at(&self, level: LogLevel, message: &str);

    fn log(&self, message: &str) {
        self.log_at(LogLevel::Info, message)
    }

    fn error(&self, message: &str) {
        self.log_at(LogLevel::Error, message)
    }

    /// Run `callback` once, `delay_seconds` from now
    fn run_in(&self, callback: Callback, delay_seconds: u64, kwargs: Kwargs) -> Result<Handle>;

    /// Run `callback` once at the next occurrence of `time`
    fn run_once(&self, callback: Callback, time: NaiveTime, kwargs: Kwargs) -> Result<Handle>;

    /// Run `callback` once at a local date-time
    fn run_at(&self, callback: Callback, at: NaiveDateTime, kwargs: Kwargs) -> Result<Handle>;

    /// Run `callback` every day at `time`
    fn run_daily(&self, callback: Callback, time: NaiveTime, kwargs: Kwargs) -> Result<Handle>;

    /// Run `callback` every hour at the minute and second of `time`
    fn run_hourly(&self, callback: Callback, time: NaiveTime, kwargs: Kwargs) -> Result<Handle>;

    /// Run `callback` every minute at the second of `time`
    fn run_minutely(&self, callback: Callback, time: NaiveTime, kwargs: Kwargs) -> Result<Handle>;

    /// Run `callback` at `start` and every `interval_seconds` after
    fn run_every(
        &self,
        callback: Callback,
        start: NaiveDateTime,
        interval_seconds: u64,
        kwargs: Kwargs,
    ) -> Result<Handle>;

    /// Run `callback` at every sunrise
    fn run_at_sunrise(&self, callback: Callback, kwargs: Kwargs) -> Result<Handle>;

    /// Run `callback` at every sunset
    fn run_at_sunset(&self, callback: Callback, kwargs: Kwargs) -> Result<Handle>;

    /// Cancel a timer; false when it already ran or was cancelled
    fn cancel_timer(&self, handle: &Handle) -> bool;

    /// Current local time
    fn get_now(&self) -> DateTime<FixedOffset>;

    fn get_now_ts(&self) -> f64;

    /// Current local time-of-day
    fn time(&self) -> NaiveTime;

    /// Current local date
    fn date(&self) -> NaiveDate;

    /// Whether the local time-of-day lies within `[start, end]`, wrapping past midnight when
    /// `end` is before `start`
    fn now_is_between(&self, start: NaiveTime, end: NaiveTime) -> bool;

    fn listen_event(&self, callback: EventCallback, event: &str, filters: Kwargs) -> Result<ListenerHandle>;

    fn listen_state(
        &self,
        callback: StateCallback,
        entity_id: &str,
        options: StateListenOptions,
    ) -> Result<ListenerHandle>;

    fn cancel_listen_event(&self, handle: &ListenerHandle) -> bool;

    fn cancel_listen_state(&self, handle: &ListenerHandle) -> bool;

    fn get_state(&self, entity_id: &str) -> Result<String>;

    /// `Ok(None)` when the entity exists without that attribute
    fn get_attribute(&self, entity_id: &str, attribute: &str) -> Result<Option<Value>>;

    fn get_full_state(&self, entity_id: &str) -> Result<Value>;

    fn get_all_states(&self) -> Value;

    fn set_state(&self, entity_id: &str, state: &str, attributes: Kwargs) -> Result<()>;

    fn entity_exists(&self, entity_id: &str) -> bool;

    /// Call `domain/service` with its data
    fn call_service(&self, service: &str, kwargs: Kwargs) -> Result<()>;

    fn turn_on(&self, entity_id: &str, kwargs: Kwargs) -> Result<()>;

    fn turn_off(&self, entity_id: &str, kwargs: Kwargs) -> Result<()>;

    fn toggle(&self, entity_id: &str, kwargs: Kwargs) -> Result<()>;

    fn notify(&self, message: &str, kwargs: Kwargs) -> Result<()>;

    fn fire_event(&self, event: &str, data: Kwargs) -> Result<()>;

    /// Make `name` usable as a constraint in the automation's arguments
    fn register_constraint(&self, name: &str) -> Result<()>;

    /// Parse a platform time expression such as `"sunset - 00:30:00"`
    fn parse_time(&self, _text: &str) -> Result<NaiveTime> {
        Err(HassError::unknown(Operation::ParseTime))
    }

    /// Subscribe to the platform's own log lines
    fn listen_log(&self, _callback: EventCallback, _level: LogLevel) -> Result<ListenerHandle> {
        Err(HassError::unknown(Operation::ListenLog))
    }

    /// Another running automation, looked up by name
    fn get_app(&self, _name: &str) -> Result<Arc<dyn HassApi>> {
        Err(HassError::unknown(Operation::GetApp))
    }
}
