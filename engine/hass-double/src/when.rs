//! Stimuli that reach the automation's listeners

use virtual_scheduler::Kwargs;

use crate::double::{AttributeUpdate, HassDouble};
use crate::error::Result;

/// Act on the world the way the platform would
pub struct When<'a> {
    double: &'a HassDouble,
}

impl<'a> When<'a> {
    pub(crate) fn new(double: &'a HassDouble) -> Self {
        Self { double }
    }

    pub fn state_of(&self, entity_id: impl Into<String>) -> WhenState<'a> {
        WhenState { double: self.double, entity_id: entity_id.into() }
    }

    /// Fire `event` to every listener whose filters all match `data`
    pub fn event(&self, event: &str, data: Kwargs) {
        self.double.dispatch_event(event, &data);
    }
}

pub struct WhenState<'a> {
    double: &'a HassDouble,
    entity_id: String,
}

impl WhenState<'_> {
    /// Change the state, keeping current attributes
    pub fn is_set_to(self, state: &str) -> Result<()> {
        self.double.change_state(&self.entity_id, state, AttributeUpdate::Keep)
    }

    /// Change state and attributes
    pub fn is_set_to_with(self, state: &str, attributes: Kwargs) -> Result<()> {
        self.double.change_state(&self.entity_id, state, AttributeUpdate::Replace(attributes))
    }
}
