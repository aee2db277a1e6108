//! State and event listener registrations

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use virtual_scheduler::{Handle, Kwargs};

/// Invoked when a watched entity changes state
pub type StateCallback = Arc<dyn Fn(&StateChange) + Send + Sync>;

/// Invoked when a watched event fires
pub type EventCallback = Arc<dyn Fn(&EventFired) + Send + Sync>;

/// Token naming one listener registration
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerHandle(Uuid);

impl ListenerHandle {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// What a state listener is told
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    pub entity_id: String,
    pub attribute: Option<String>,
    pub old: Option<String>,
    pub new: String,
    /// Extra kwargs given at registration
    pub kwargs: Kwargs,
}

/// What an event listener is told
#[derive(Debug, Clone, PartialEq)]
pub struct EventFired {
    pub event: String,
    pub data: Kwargs,
    /// Filters given at registration
    pub kwargs: Kwargs,
}

/// Options of a `listen_state` registration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateListenOptions {
    /// Only fire when the new state equals this
    pub new: Option<String>,
    /// Only fire when the previous state equals this
    pub old: Option<String>,
    pub attribute: Option<String>,
    /// Seconds the new state must hold before the callback runs
    pub duration: Option<u64>,
    pub kwargs: Kwargs,
}

impl StateListenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_state(mut self, state: impl Into<String>) -> Self {
        self.new = Some(state.into());
        self
    }

    pub fn old_state(mut self, state: impl Into<String>) -> Self {
        self.old = Some(state.into());
        self
    }

    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    pub fn duration(mut self, seconds: u64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn kwarg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub(crate) fn matches(&self, old: Option<&str>, new: &str) -> bool {
        let new_ok = self.new.as_deref().map_or(true, |wanted| wanted == new);
        let old_ok = self.old.as_deref().map_or(true, |wanted| old == Some(wanted));
        new_ok && old_ok
    }
}

pub(crate) struct StateListener {
    pub handle: ListenerHandle,
    pub entity_id: String,
    pub options: StateListenOptions,
    pub callback: StateCallback,
    /// Timer waiting out `duration` for the latest matching change
    pub pending: Option<Handle>,
}

pub(crate) struct EventListener {
    pub handle: ListenerHandle,
    pub event: String,
    pub filters: Kwargs,
    pub callback: EventCallback,
}

impl EventListener {
    /// Every filter key must be present in `data` with an equal value
    pub fn matches(&self, event: &str, data: &Kwargs) -> bool {
        self.event == event && self.filters.iter().all(|(key, value)| data.get(key) == Some(value))
    }
}

/// A state listener that should be notified of a change
pub(crate) enum StateDelivery {
    Now(StateCallback),
    /// Run after `duration` seconds unless superseded
    Delayed { handle: ListenerHandle, callback: StateCallback, seconds: u64 },
}

#[derive(Default)]
pub(crate) struct Listeners {
    state: Vec<StateListener>,
    event: Vec<EventListener>,
}

impl Listeners {
    pub fn add_state(&mut self, listener: StateListener) {
        self.state.push(listener);
    }

    pub fn add_event(&mut self, listener: EventListener) {
        self.event.push(listener);
    }

    /// Remove a state listener, returning its outstanding duration timer if any
    pub fn remove_state(&mut self, handle: &ListenerHandle) -> Option<Option<Handle>> {
        let index = self.state.iter().position(|listener| &listener.handle == handle)?;
        Some(self.state.remove(index).pending)
    }

    pub fn remove_event(&mut self, handle: &ListenerHandle) -> bool {
        let before = self.event.len();
        self.event.retain(|listener| &listener.handle != handle);
        self.event.len() != before
    }

    /// Sort the listeners of `entity_id` by whether a change to `new` reaches them
    ///
    /// Returns the deliveries plus the duration timers made stale by the change; the caller
    /// cancels those outside the lock.
    pub fn state_deliveries(
        &mut self,
        entity_id: &str,
        attribute: Option<&str>,
        old: Option<&str>,
        new: &str,
    ) -> (Vec<(StateDelivery, Kwargs)>, Vec<Handle>) {
        let mut deliveries = Vec::new();
        let mut stale = Vec::new();

        for listener in self.state.iter_mut().filter(|l| l.entity_id == entity_id) {
            if listener.options.attribute.as_deref() != attribute {
                continue;
            }
            if let Some(handle) = listener.pending.take() {
                stale.push(handle);
            }
            if !listener.options.matches(old, new) {
                continue;
            }
            let delivery = match listener.options.duration {
                Some(seconds) if seconds > 0 => StateDelivery::Delayed {
                    handle: listener.handle.clone(),
                    callback: Arc::clone(&listener.callback),
                    seconds,
                },
                _ => StateDelivery::Now(Arc::clone(&listener.callback)),
            };
            deliveries.push((delivery, listener.options.kwargs.clone()));
        }

        (deliveries, stale)
    }

    /// Remember the timer that will deliver a delayed change
    pub fn set_pending(&mut self, handle: &ListenerHandle, timer: Handle) {
        if let Some(listener) = self.state.iter_mut().find(|l| &l.handle == handle) {
            listener.pending = Some(timer);
        }
    }

    pub fn event_deliveries(&self, event: &str, data: &Kwargs) -> Vec<(EventCallback, Kwargs)> {
        self.event
            .iter()
            .filter(|listener| listener.matches(event, data))
            .map(|listener| (Arc::clone(&listener.callback), listener.filters.clone()))
            .collect()
    }

    pub fn state_count(&self) -> usize {
        self.state.len()
    }

    pub fn event_count(&self) -> usize {
        self.event.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_state_filters() {
        let any = StateListenOptions::new();
        assert!(any.matches(None, "on"));

        let to_on = StateListenOptions::new().new_state("on");
        assert!(to_on.matches(Some("off"), "on"));
        assert!(!to_on.matches(Some("on"), "off"));

        let off_to_on = StateListenOptions::new().old_state("off").new_state("on");
        assert!(off_to_on.matches(Some("off"), "on"));
        assert!(!off_to_on.matches(None, "on"));
    }

    #[test]
    fn test_event_filters_require_equal_values() {
        let mut filters = Kwargs::new();
        filters.insert("entity_id".into(), json!("binary_sensor.button"));
        let listener = EventListener {
            handle: ListenerHandle::generate(),
            event: "click".into(),
            filters,
            callback: Arc::new(|_: &EventFired| {}),
        };

        let mut data = Kwargs::new();
        data.insert("entity_id".into(), json!("binary_sensor.button"));
        data.insert("click_type".into(), json!("single"));
        assert!(listener.matches("click", &data));
        assert!(!listener.matches("motion", &data));

        data.insert("entity_id".into(), json!("binary_sensor.other"));
        assert!(!listener.matches("click", &data));
    }
}
