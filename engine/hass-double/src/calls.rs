//! Recording of every host interaction

use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, NaiveTime, Utc};
use parking_lot::Mutex;
use virtual_scheduler::{Handle, Kwargs};

use crate::api::LogLevel;
use crate::listeners::{ListenerHandle, StateListenOptions};
use crate::operation::Operation;

/// The data of one host call
///
/// Callbacks are not comparable, so registrations carry their schedule data and the handle
/// that was returned instead.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Log { level: LogLevel, message: String },
    RunIn { delay_seconds: u64, kwargs: Kwargs, handle: Handle },
    RunOnce { time: NaiveTime, kwargs: Kwargs, handle: Handle },
    RunAt { at: NaiveDateTime, kwargs: Kwargs, handle: Handle },
    RunDaily { time: NaiveTime, kwargs: Kwargs, handle: Handle },
    RunHourly { time: NaiveTime, kwargs: Kwargs, handle: Handle },
    RunMinutely { time: NaiveTime, kwargs: Kwargs, handle: Handle },
    RunEvery { start: NaiveDateTime, interval_seconds: u64, kwargs: Kwargs, handle: Handle },
    /// Recorded only; no solar data exists, so the handle never fires
    RunAtSunrise { kwargs: Kwargs, handle: Handle },
    RunAtSunset { kwargs: Kwargs, handle: Handle },
    CancelTimer { handle: Handle, cancelled: bool },
    ListenEvent { event: String, filters: Kwargs, handle: ListenerHandle },
    ListenState { entity_id: String, options: StateListenOptions, handle: ListenerHandle },
    CancelListenEvent { handle: ListenerHandle, cancelled: bool },
    CancelListenState { handle: ListenerHandle, cancelled: bool },
    SetState { entity_id: String, state: String, attributes: Kwargs },
    CallService { service: String, kwargs: Kwargs },
    TurnOn { entity_id: String, kwargs: Kwargs },
    TurnOff { entity_id: String, kwargs: Kwargs },
    Toggle { entity_id: String, kwargs: Kwargs },
    Notify { message: String, kwargs: Kwargs },
    FireEvent { event: String, data: Kwargs },
    RegisterConstraint { name: String },
}

impl HostCall {
    pub fn operation(&self) -> Operation {
        match self {
            HostCall::Log { level: LogLevel::Error, .. } => Operation::Error,
            HostCall::Log { .. } => Operation::Log,
            HostCall::RunIn { .. } => Operation::RunIn,
            HostCall::RunOnce { .. } => Operation::RunOnce,
            HostCall::RunAt { .. } => Operation::RunAt,
            HostCall::RunDaily { .. } => Operation::RunDaily,
            HostCall::RunHourly { .. } => Operation::RunHourly,
            HostCall::RunMinutely { .. } => Operation::RunMinutely,
            HostCall::RunEvery { .. } => Operation::RunEvery,
            HostCall::RunAtSunrise { .. } => Operation::RunAtSunrise,
            HostCall::RunAtSunset { .. } => Operation::RunAtSunset,
            HostCall::CancelTimer { .. } => Operation::CancelTimer,
            HostCall::ListenEvent { .. } => Operation::ListenEvent,
            HostCall::ListenState { .. } => Operation::ListenState,
            HostCall::CancelListenEvent { .. } => Operation::CancelListenEvent,
            HostCall::CancelListenState { .. } => Operation::CancelListenState,
            HostCall::SetState { .. } => Operation::SetState,
            HostCall::CallService { .. } => Operation::CallService,
            HostCall::TurnOn { .. } => Operation::TurnOn,
            HostCall::TurnOff { .. } => Operation::TurnOff,
            HostCall::Toggle { .. } => Operation::Toggle,
            HostCall::Notify { .. } => Operation::Notify,
            HostCall::FireEvent { .. } => Operation::FireEvent,
            HostCall::RegisterConstraint { .. } => Operation::RegisterConstraint,
        }
    }
}

/// One entry of the call log
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Name of the automation that made the call
    pub app: String,
    pub operation: Operation,
    pub call: HostCall,
    /// Simulated time of the call
    pub at: DateTime<Utc>,
}

/// Shared, append-only log of host calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, app: &str, call: HostCall, at: DateTime<Utc>) {
        let operation = call.operation();
        tracing::trace!(app, operation = %operation, "Host call recorded");
        self.entries.lock().push(RecordedCall { app: app.to_string(), operation, call, at });
    }

    pub fn all(&self) -> Vec<RecordedCall> {
        self.entries.lock().clone()
    }

    pub fn for_app(&self, app: &str) -> Vec<RecordedCall> {
        self.entries.lock().iter().filter(|entry| entry.app == app).cloned().collect()
    }

    pub fn of(&self, operation: Operation) -> Vec<RecordedCall> {
        self.entries.lock().iter().filter(|entry| entry.operation == operation).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
