//! Panicking assertions over recorded host calls

use chrono::{NaiveDateTime, NaiveTime};
use serde_json::Value;
use virtual_scheduler::Kwargs;

use crate::calls::{HostCall, RecordedCall};
use crate::listeners::StateListenOptions;

/// Assertions about one entity, service or automation
pub struct AssertThat {
    thing: String,
    /// Calls made since the last clear
    calls: Vec<RecordedCall>,
    /// Calls that count as registrations, including those made during initialize
    registrations: Vec<RecordedCall>,
}

impl AssertThat {
    pub(crate) fn new(thing: impl Into<String>, calls: Vec<RecordedCall>, registrations: Vec<RecordedCall>) -> Self {
        Self { thing: thing.into(), calls, registrations }
    }

    pub fn was(&self) -> Was<'_> {
        Was { assert: self, expected: true }
    }

    pub fn was_not(&self) -> Was<'_> {
        Was { assert: self, expected: false }
    }

    /// `thing` names an automation
    pub fn listens_to(&self) -> ListensTo<'_> {
        ListensTo { assert: self }
    }

    /// `thing` names an automation
    pub fn registered(&self) -> Registered<'_> {
        Registered { assert: self }
    }

    fn registrations_of_app(&self) -> impl Iterator<Item = &HostCall> {
        self.registrations
            .iter()
            .filter(|entry| entry.app == self.thing && entry.operation.is_registration())
            .map(|entry| &entry.call)
    }
}

fn show(kwargs: &Kwargs) -> String {
    Value::Object(kwargs.clone()).to_string()
}

fn recorded(calls: &[RecordedCall]) -> String {
    if calls.is_empty() {
        return "nothing was recorded".to_string();
    }
    let lines: Vec<String> = calls.iter().map(|entry| format!("  [{}] {:?}", entry.app, entry.call)).collect();
    format!("recorded calls:\n{}", lines.join("\n"))
}

pub struct Was<'a> {
    assert: &'a AssertThat,
    expected: bool,
}

impl Was<'_> {
    /// Passes on `turn_on(thing, kwargs)` or a `*/turn_on` service call for `thing`
    #[track_caller]
    pub fn turned_on(&self, kwargs: Kwargs) {
        self.switched("turn_on", kwargs);
    }

    /// Passes on `turn_off(thing, kwargs)` or a `*/turn_off` service call for `thing`
    #[track_caller]
    pub fn turned_off(&self, kwargs: Kwargs) {
        self.switched("turn_off", kwargs);
    }

    /// `thing` is a `domain/service` called with exactly `kwargs`
    #[track_caller]
    pub fn called_with(&self, kwargs: Kwargs) {
        let thing = &self.assert.thing;
        let found = self.assert.calls.iter().any(|entry| {
            matches!(&entry.call, HostCall::CallService { service, kwargs: data } if service == thing && data == &kwargs)
        });
        self.check(found, format!("service '{thing}' called with {}", show(&kwargs)));
    }

    #[track_caller]
    pub fn called(&self) {
        self.called_with(Kwargs::new());
    }

    #[track_caller]
    fn switched(&self, action: &str, kwargs: Kwargs) {
        let thing = &self.assert.thing;
        let mut service_data = kwargs.clone();
        service_data.insert("entity_id".to_string(), Value::String(thing.clone()));
        let suffix = format!("/{action}");

        let found = self.assert.calls.iter().any(|entry| match &entry.call {
            HostCall::TurnOn { entity_id, kwargs: data } if action == "turn_on" => {
                entity_id == thing && data == &kwargs
            }
            HostCall::TurnOff { entity_id, kwargs: data } if action == "turn_off" => {
                entity_id == thing && data == &kwargs
            }
            HostCall::CallService { service, kwargs: data } => {
                service.ends_with(&suffix) && data == &service_data
            }
            _ => false,
        });

        self.check(
            found,
            format!(
                "either {action}('{thing}', {}) or a '*/{action}' service call with {}",
                show(&kwargs),
                show(&service_data)
            ),
        );
    }

    #[track_caller]
    fn check(&self, found: bool, description: String) {
        if found == self.expected {
            return;
        }
        let calls = recorded(&self.assert.calls);
        if self.expected {
            panic!("expected {description}, but it was not called; {calls}");
        } else {
            panic!("expected no {description}, but it was called; {calls}");
        }
    }
}

pub struct ListensTo<'a> {
    assert: &'a AssertThat,
}

impl ListensTo<'_> {
    #[track_caller]
    pub fn event(&self, event: &str, filters: Kwargs) {
        let found = self.assert.registrations_of_app().any(|call| {
            matches!(call, HostCall::ListenEvent { event: name, filters: f, .. } if name == event && f == &filters)
        });
        assert!(
            found,
            "expected '{}' to listen to event '{event}' with {}; {}",
            self.assert.thing,
            show(&filters),
            recorded(&self.assert.registrations)
        );
    }

    #[track_caller]
    pub fn state(&self, entity_id: &str, options: StateListenOptions) {
        let found = self.assert.registrations_of_app().any(|call| {
            matches!(call, HostCall::ListenState { entity_id: id, options: o, .. } if id == entity_id && o == &options)
        });
        assert!(
            found,
            "expected '{}' to listen to state of '{entity_id}' with {options:?}; {}",
            self.assert.thing,
            recorded(&self.assert.registrations)
        );
    }
}

pub struct Registered<'a> {
    assert: &'a AssertThat,
}

impl Registered<'_> {
    #[track_caller]
    pub fn run_daily(&self, time: NaiveTime, kwargs: Kwargs) {
        self.check(format!("run_daily at {time}"), &kwargs, |call| match call {
            HostCall::RunDaily { time: t, kwargs: k, .. } => *t == time && k == &kwargs,
            _ => false,
        });
    }

    #[track_caller]
    pub fn run_hourly(&self, time: NaiveTime, kwargs: Kwargs) {
        self.check(format!("run_hourly at {time}"), &kwargs, |call| match call {
            HostCall::RunHourly { time: t, kwargs: k, .. } => *t == time && k == &kwargs,
            _ => false,
        });
    }

    #[track_caller]
    pub fn run_minutely(&self, time: NaiveTime, kwargs: Kwargs) {
        self.check(format!("run_minutely at {time}"), &kwargs, |call| match call {
            HostCall::RunMinutely { time: t, kwargs: k, .. } => *t == time && k == &kwargs,
            _ => false,
        });
    }

    #[track_caller]
    pub fn run_at(&self, at: NaiveDateTime, kwargs: Kwargs) {
        self.check(format!("run_at {at}"), &kwargs, |call| match call {
            HostCall::RunAt { at: a, kwargs: k, .. } => *a == at && k == &kwargs,
            _ => false,
        });
    }

    #[track_caller]
    pub fn run_in(&self, delay_seconds: u64, kwargs: Kwargs) {
        self.check(format!("run_in {delay_seconds}s"), &kwargs, |call| match call {
            HostCall::RunIn { delay_seconds: d, kwargs: k, .. } => *d == delay_seconds && k == &kwargs,
            _ => false,
        });
    }

    #[track_caller]
    pub fn run_every(&self, start: NaiveDateTime, interval_seconds: u64, kwargs: Kwargs) {
        self.check(format!("run_every {interval_seconds}s from {start}"), &kwargs, |call| match call {
            HostCall::RunEvery { start: s, interval_seconds: i, kwargs: k, .. } => {
                *s == start && *i == interval_seconds && k == &kwargs
            }
            _ => false,
        });
    }

    #[track_caller]
    pub fn run_at_sunrise(&self, kwargs: Kwargs) {
        self.check("run_at_sunrise".to_string(), &kwargs, |call| {
            matches!(call, HostCall::RunAtSunrise { kwargs: k, .. } if k == &kwargs)
        });
    }

    #[track_caller]
    pub fn run_at_sunset(&self, kwargs: Kwargs) {
        self.check("run_at_sunset".to_string(), &kwargs, |call| {
            matches!(call, HostCall::RunAtSunset { kwargs: k, .. } if k == &kwargs)
        });
    }

    #[track_caller]
    fn check(&self, description: String, kwargs: &Kwargs, matches: impl Fn(&HostCall) -> bool) {
        let found = self.assert.registrations_of_app().any(matches);
        assert!(
            found,
            "expected '{}' to register {description} with {}; {}",
            self.assert.thing,
            show(kwargs),
            recorded(&self.assert.registrations)
        );
    }
}
