//! Test setup: entity states, start time and clearing recorded calls

use chrono::{DateTime, FixedOffset};
use virtual_scheduler::{Kwargs, TimeSpec};

use crate::double::HassDouble;
use crate::error::Result;
use crate::state::EntityState;

/// Arrange the world before the automation acts
///
/// Nothing done here is recorded or reaches a listener.
pub struct GivenThat<'a> {
    double: &'a HassDouble,
}

impl<'a> GivenThat<'a> {
    pub(crate) fn new(double: &'a HassDouble) -> Self {
        Self { double }
    }

    pub fn state_of(&self, entity_id: impl Into<String>) -> GivenState<'a> {
        GivenState { double: self.double, entity_id: entity_id.into(), last_updated: None, last_changed: None }
    }

    /// Rebase simulated time; fails while timers are pending
    pub fn time_is(&self, time: impl Into<TimeSpec>) -> Result<()> {
        self.double.scheduler().set_start_time(time)?;
        Ok(())
    }

    /// Forget recorded calls, and entity states too when `clear_states` is set
    pub fn mock_functions_are_cleared(&self, clear_states: bool) {
        self.double.clear_calls();
        if clear_states {
            self.double.clear_states();
        }
    }
}

pub struct GivenState<'a> {
    double: &'a HassDouble,
    entity_id: String,
    last_updated: Option<DateTime<FixedOffset>>,
    last_changed: Option<DateTime<FixedOffset>>,
}

impl GivenState<'_> {
    pub fn with_timestamps(
        mut self,
        last_updated: DateTime<FixedOffset>,
        last_changed: DateTime<FixedOffset>,
    ) -> Self {
        self.last_updated = Some(last_updated);
        self.last_changed = Some(last_changed);
        self
    }

    pub fn is_set_to(self, state: impl Into<String>) {
        self.is_set_to_with(state, Kwargs::new());
    }

    pub fn is_set_to_with(self, state: impl Into<String>, attributes: Kwargs) {
        let mut entity = EntityState::new(self.entity_id, state);
        entity.attributes = attributes;
        entity.last_updated = self.last_updated;
        entity.last_changed = self.last_changed;
        self.double.put_state(entity);
    }
}
