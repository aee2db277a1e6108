//! Recording in-memory implementation of the host API

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use virtual_scheduler::{Callback, Handle, Kwargs, SchedulerConfig, SchedulerError, VirtualScheduler};

use crate::api::{HassApi, LogLevel};
use crate::assert_that::AssertThat;
use crate::calls::{CallLog, HostCall, RecordedCall};
use crate::error::{HassError, Result};
use crate::given_that::GivenThat;
use crate::listeners::{
    EventCallback, EventFired, EventListener, ListenerHandle, Listeners, StateCallback, StateChange,
    StateDelivery, StateListenOptions, StateListener,
};
use crate::state::{EntityState, StateStore};
use crate::time_travel::TimeTravel;
use crate::when::When;
use crate::DEFAULT_APP_NAME;

/// State shared by every automation's view of the double
struct HassCore {
    scheduler: VirtualScheduler,
    states: Mutex<StateStore>,
    listeners: Mutex<Listeners>,
    calls: CallLog,
}

struct AppInfo {
    name: String,
    args: Kwargs,
}

/// How a state change treats the entity's existing attributes
pub(crate) enum AttributeUpdate {
    Keep,
    Merge(Kwargs),
    Replace(Kwargs),
}

/// The test double
///
/// Cloning is cheap and every clone shares the same scheduler, entity states, listeners and
/// call log. [`HassDouble::for_app`] makes a view that records under another automation name.
#[derive(Clone)]
pub struct HassDouble {
    core: Arc<HassCore>,
    app: Arc<AppInfo>,
}

impl HassDouble {
    pub fn new(scheduler: VirtualScheduler) -> Self {
        let core = HassCore {
            scheduler,
            states: Mutex::new(StateStore::default()),
            listeners: Mutex::new(Listeners::default()),
            calls: CallLog::new(),
        };
        Self {
            core: Arc::new(core),
            app: Arc::new(AppInfo { name: DEFAULT_APP_NAME.to_string(), args: Kwargs::new() }),
        }
    }

    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        Ok(Self::new(VirtualScheduler::new(config)?))
    }

    /// A view of the same host for the automation `name`
    pub fn for_app(&self, name: impl Into<String>, args: Kwargs) -> Self {
        Self { core: Arc::clone(&self.core), app: Arc::new(AppInfo { name: name.into(), args }) }
    }

    pub fn scheduler(&self) -> &VirtualScheduler {
        &self.core.scheduler
    }

    pub fn call_log(&self) -> &CallLog {
        &self.core.calls
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.core.calls.all()
    }

    pub fn clear_calls(&self) {
        self.core.calls.clear();
    }

    pub fn given_that(&self) -> GivenThat<'_> {
        GivenThat::new(self)
    }

    pub fn when(&self) -> When<'_> {
        When::new(self)
    }

    pub fn time_travel(&self) -> TimeTravel<'_> {
        TimeTravel::new(&self.core.scheduler)
    }

    /// Assertions over everything recorded so far
    pub fn assert_that(&self, thing: impl Into<String>) -> AssertThat {
        let calls = self.calls();
        AssertThat::new(thing, calls.clone(), calls)
    }

    /// Registered `(state, event)` listener counts
    pub fn listener_counts(&self) -> (usize, usize) {
        let listeners = self.core.listeners.lock();
        (listeners.state_count(), listeners.event_count())
    }

    fn record(&self, call: HostCall) {
        self.core.calls.record(&self.app.name, call, self.core.scheduler.now());
    }

    fn now_local(&self) -> NaiveDateTime {
        self.core.scheduler.now_naive()
    }

    /// The instant `seconds` from now
    fn after_seconds(&self, seconds: u64) -> Result<DateTime<Utc>> {
        let now = self.core.scheduler.now();
        now.checked_add_signed(seconds_of(seconds)?).ok_or_else(|| {
            SchedulerError::out_of_range(format!("{now} + {seconds}s overflows")).into()
        })
    }

    fn schedule(&self, callback: Callback, at: NaiveDateTime, kwargs: Kwargs, interval: u64) -> Result<Handle> {
        let run_at = self.core.scheduler.localizer().localize(at)?;
        Ok(self.core.scheduler.insert_callback(run_at, callback, kwargs, interval)?)
    }

    pub(crate) fn put_state(&self, entity: EntityState) {
        self.core.states.lock().insert(entity);
    }

    pub(crate) fn clear_states(&self) {
        self.core.states.lock().clear();
    }

    /// Store a new state and notify the listeners it reaches
    pub(crate) fn change_state(&self, entity_id: &str, state: &str, update: AttributeUpdate) -> Result<()> {
        let now = self.core.scheduler.now_local();
        let (previous, attributes) = {
            let mut states = self.core.states.lock();
            let previous = states.get(entity_id).ok().cloned();

            let mut entity = previous.clone().unwrap_or_else(|| EntityState::new(entity_id, state));
            match update {
                AttributeUpdate::Keep => {}
                AttributeUpdate::Merge(attributes) => entity.attributes.extend(attributes),
                AttributeUpdate::Replace(attributes) => entity.attributes = attributes,
            }
            if previous.as_ref().map(|p| p.state.as_str()) != Some(state) {
                entity.last_changed = Some(now);
            }
            entity.state = state.to_string();
            entity.last_updated = Some(now);
            let attributes = entity.attributes.clone();
            states.insert(entity);
            (previous, attributes)
        };

        let old_state = previous.as_ref().map(|p| p.state.clone());
        tracing::debug!(entity_id, old = ?old_state, new = state, "State changed");
        self.notify_state(entity_id, None, old_state.as_deref(), state)?;

        let empty = Kwargs::new();
        let old_attributes = previous.as_ref().map_or(&empty, |p| &p.attributes);
        let mut keys: Vec<&String> = old_attributes.keys().chain(attributes.keys()).collect();
        keys.sort();
        keys.dedup();
        for key in keys {
            let old_value = old_attributes.get(key);
            let new_value = attributes.get(key);
            if old_value == new_value {
                continue;
            }
            let new_text = new_value.map(attribute_text).unwrap_or_default();
            self.notify_state(entity_id, Some(key.as_str()), old_value.map(attribute_text).as_deref(), &new_text)?;
        }
        Ok(())
    }

    fn notify_state(&self, entity_id: &str, attribute: Option<&str>, old: Option<&str>, new: &str) -> Result<()> {
        let (deliveries, stale) =
            self.core.listeners.lock().state_deliveries(entity_id, attribute, old, new);
        for timer in stale {
            self.core.scheduler.cancel(&timer);
        }

        for (delivery, kwargs) in deliveries {
            let change = StateChange {
                entity_id: entity_id.to_string(),
                attribute: attribute.map(str::to_string),
                old: old.map(str::to_string),
                new: new.to_string(),
                kwargs,
            };
            match delivery {
                StateDelivery::Now(callback) => callback(&change),
                StateDelivery::Delayed { handle, callback, seconds } => {
                    let run_at = self.after_seconds(seconds)?;
                    let timer = self.core.scheduler.insert_schedule(
                        run_at,
                        move |_: &Kwargs| callback(&change),
                        Kwargs::new(),
                        0,
                    )?;
                    self.core.listeners.lock().set_pending(&handle, timer);
                }
            }
        }
        Ok(())
    }

    pub(crate) fn dispatch_event(&self, event: &str, data: &Kwargs) {
        let deliveries = self.core.listeners.lock().event_deliveries(event, data);
        tracing::debug!(event, listeners = deliveries.len(), "Event fired");
        for (callback, filters) in deliveries {
            callback(&EventFired { event: event.to_string(), data: data.clone(), kwargs: filters });
        }
    }
}

fn seconds_of(seconds: u64) -> Result<Duration> {
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| HassError::invalid_argument(format!("{seconds} seconds is out of range")))
}

fn attribute_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// `candidate` if it is still ahead of `now`, else one `step` later
fn next_after(now: NaiveDateTime, candidate: NaiveDateTime, step: Duration) -> Result<NaiveDateTime> {
    if candidate > now {
        return Ok(candidate);
    }
    candidate
        .checked_add_signed(step)
        .ok_or_else(|| SchedulerError::out_of_range(format!("{candidate} + {step} overflows")).into())
}

fn with_minute_second(now: NaiveDateTime, time: NaiveTime) -> Result<NaiveDateTime> {
    now.with_minute(time.minute())
        .and_then(|t| t.with_second(time.second()))
        .and_then(|t| t.with_nanosecond(time.nanosecond()))
        .ok_or_else(|| HassError::invalid_argument(format!("invalid time {time}")))
}

impl HassApi for HassDouble {
    fn name(&self) -> &str {
        &self.app.name
    }

    fn args(&self) -> &Kwargs {
        &self.app.args
    }

    fn log_at(&self, level: LogLevel, message: &str) {
        let app = self.app.name.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(target: "hass_double::app", app, "{message}"),
            LogLevel::Info => tracing::info!(target: "hass_double::app", app, "{message}"),
            LogLevel::Warning => tracing::warn!(target: "hass_double::app", app, "{message}"),
            LogLevel::Error => tracing::error!(target: "hass_double::app", app, "{message}"),
        }
        self.record(HostCall::Log { level, message: message.to_string() });
    }

    fn run_in(&self, callback: Callback, delay_seconds: u64, kwargs: Kwargs) -> Result<Handle> {
        let run_at = self.after_seconds(delay_seconds)?;
        let handle = self.core.scheduler.insert_callback(run_at, callback, kwargs.clone(), 0)?;
        self.record(HostCall::RunIn { delay_seconds, kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn run_once(&self, callback: Callback, time: NaiveTime, kwargs: Kwargs) -> Result<Handle> {
        let now = self.now_local();
        let at = next_after(now, now.date().and_time(time), Duration::days(1))?;
        let handle = self.schedule(callback, at, kwargs.clone(), 0)?;
        self.record(HostCall::RunOnce { time, kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn run_at(&self, callback: Callback, at: NaiveDateTime, kwargs: Kwargs) -> Result<Handle> {
        let handle = self.schedule(callback, at, kwargs.clone(), 0)?;
        self.record(HostCall::RunAt { at, kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn run_daily(&self, callback: Callback, time: NaiveTime, kwargs: Kwargs) -> Result<Handle> {
        let now = self.now_local();
        let at = next_after(now, now.date().and_time(time), Duration::days(1))?;
        let handle = self.schedule(callback, at, kwargs.clone(), 86_400)?;
        self.record(HostCall::RunDaily { time, kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn run_hourly(&self, callback: Callback, time: NaiveTime, kwargs: Kwargs) -> Result<Handle> {
        let now = self.now_local();
        let at = next_after(now, with_minute_second(now, time)?, Duration::hours(1))?;
        let handle = self.schedule(callback, at, kwargs.clone(), 3_600)?;
        self.record(HostCall::RunHourly { time, kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn run_minutely(&self, callback: Callback, time: NaiveTime, kwargs: Kwargs) -> Result<Handle> {
        let now = self.now_local();
        let candidate = now
            .with_second(time.second())
            .and_then(|t| t.with_nanosecond(time.nanosecond()))
            .ok_or_else(|| HassError::invalid_argument(format!("invalid time {time}")))?;
        let at = next_after(now, candidate, Duration::minutes(1))?;
        let handle = self.schedule(callback, at, kwargs.clone(), 60)?;
        self.record(HostCall::RunMinutely { time, kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn run_every(
        &self,
        callback: Callback,
        start: NaiveDateTime,
        interval_seconds: u64,
        kwargs: Kwargs,
    ) -> Result<Handle> {
        if interval_seconds == 0 {
            return Err(HassError::invalid_argument("run_every interval must be at least one second"));
        }
        let handle = self.schedule(callback, start, kwargs.clone(), interval_seconds)?;
        self.record(HostCall::RunEvery { start, interval_seconds, kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn run_at_sunrise(&self, _callback: Callback, kwargs: Kwargs) -> Result<Handle> {
        let handle = Handle::generate();
        self.record(HostCall::RunAtSunrise { kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn run_at_sunset(&self, _callback: Callback, kwargs: Kwargs) -> Result<Handle> {
        let handle = Handle::generate();
        self.record(HostCall::RunAtSunset { kwargs, handle: handle.clone() });
        Ok(handle)
    }

    fn cancel_timer(&self, handle: &Handle) -> bool {
        let cancelled = self.core.scheduler.cancel(handle);
        self.record(HostCall::CancelTimer { handle: handle.clone(), cancelled });
        cancelled
    }

    fn get_now(&self) -> DateTime<FixedOffset> {
        self.core.scheduler.now_local()
    }

    fn get_now_ts(&self) -> f64 {
        self.core.scheduler.now_as_timestamp()
    }

    fn time(&self) -> NaiveTime {
        self.now_local().time()
    }

    fn date(&self) -> NaiveDate {
        self.now_local().date()
    }

    fn now_is_between(&self, start: NaiveTime, end: NaiveTime) -> bool {
        let now = self.time();
        if start <= end {
            start <= now && now <= end
        } else {
            now >= start || now <= end
        }
    }

    fn listen_event(&self, callback: EventCallback, event: &str, filters: Kwargs) -> Result<ListenerHandle> {
        if event.is_empty() {
            return Err(HassError::invalid_argument("event name must not be empty"));
        }
        let handle = ListenerHandle::generate();
        self.core.listeners.lock().add_event(EventListener {
            handle: handle.clone(),
            event: event.to_string(),
            filters: filters.clone(),
            callback,
        });
        self.record(HostCall::ListenEvent { event: event.to_string(), filters, handle: handle.clone() });
        Ok(handle)
    }

    fn listen_state(
        &self,
        callback: StateCallback,
        entity_id: &str,
        options: StateListenOptions,
    ) -> Result<ListenerHandle> {
        if entity_id.is_empty() {
            return Err(HassError::invalid_argument("entity id must not be empty"));
        }
        let handle = ListenerHandle::generate();
        self.core.listeners.lock().add_state(StateListener {
            handle: handle.clone(),
            entity_id: entity_id.to_string(),
            options: options.clone(),
            callback,
            pending: None,
        });
        self.record(HostCall::ListenState { entity_id: entity_id.to_string(), options, handle: handle.clone() });
        Ok(handle)
    }

    fn cancel_listen_event(&self, handle: &ListenerHandle) -> bool {
        let cancelled = self.core.listeners.lock().remove_event(handle);
        self.record(HostCall::CancelListenEvent { handle: handle.clone(), cancelled });
        cancelled
    }

    fn cancel_listen_state(&self, handle: &ListenerHandle) -> bool {
        let removed = self.core.listeners.lock().remove_state(handle);
        if let Some(Some(timer)) = &removed {
            self.core.scheduler.cancel(timer);
        }
        let cancelled = removed.is_some();
        self.record(HostCall::CancelListenState { handle: handle.clone(), cancelled });
        cancelled
    }

    fn get_state(&self, entity_id: &str) -> Result<String> {
        self.core.states.lock().get(entity_id).map(|entity| entity.state.clone())
    }

    fn get_attribute(&self, entity_id: &str, attribute: &str) -> Result<Option<Value>> {
        Ok(self.core.states.lock().get(entity_id)?.attributes.get(attribute).cloned())
    }

    fn get_full_state(&self, entity_id: &str) -> Result<Value> {
        self.core.states.lock().get(entity_id).map(EntityState::to_full_json)
    }

    fn get_all_states(&self) -> Value {
        self.core.states.lock().all()
    }

    fn set_state(&self, entity_id: &str, state: &str, attributes: Kwargs) -> Result<()> {
        self.record(HostCall::SetState {
            entity_id: entity_id.to_string(),
            state: state.to_string(),
            attributes: attributes.clone(),
        });
        self.change_state(entity_id, state, AttributeUpdate::Merge(attributes))
    }

    fn entity_exists(&self, entity_id: &str) -> bool {
        self.core.states.lock().contains(entity_id)
    }

    fn call_service(&self, service: &str, kwargs: Kwargs) -> Result<()> {
        match service.split_once('/') {
            Some((domain, name)) if !domain.is_empty() && !name.is_empty() => {}
            _ => return Err(HassError::invalid_argument(format!("service '{service}' is not domain/service"))),
        }
        self.record(HostCall::CallService { service: service.to_string(), kwargs });
        Ok(())
    }

    fn turn_on(&self, entity_id: &str, kwargs: Kwargs) -> Result<()> {
        self.record(HostCall::TurnOn { entity_id: entity_id.to_string(), kwargs });
        Ok(())
    }

    fn turn_off(&self, entity_id: &str, kwargs: Kwargs) -> Result<()> {
        self.record(HostCall::TurnOff { entity_id: entity_id.to_string(), kwargs });
        Ok(())
    }

    fn toggle(&self, entity_id: &str, kwargs: Kwargs) -> Result<()> {
        self.record(HostCall::Toggle { entity_id: entity_id.to_string(), kwargs });
        Ok(())
    }

    fn notify(&self, message: &str, kwargs: Kwargs) -> Result<()> {
        self.record(HostCall::Notify { message: message.to_string(), kwargs });
        Ok(())
    }

    fn fire_event(&self, event: &str, data: Kwargs) -> Result<()> {
        self.record(HostCall::FireEvent { event: event.to_string(), data: data.clone() });
        self.dispatch_event(event, &data);
        Ok(())
    }

    fn register_constraint(&self, name: &str) -> Result<()> {
        self.record(HostCall::RegisterConstraint { name: name.to_string() });
        Ok(())
    }
}

impl fmt::Debug for HassDouble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HassDouble")
            .field("app", &self.app.name)
            .field("scheduler", &self.core.scheduler)
            .field("recorded_calls", &self.core.calls.len())
            .finish_non_exhaustive()
    }
}
