//! # Demo automations
//!
//! Automations written against [`hass_double::HassApi`]. Each one takes the host at
//! construction and does all its work from callbacks registered in `initialize`.

pub mod bathroom_volume;
pub mod entity_ids;
pub mod heater_cycle;
pub mod kitchen;

#[cfg(test)]
mod tests;

pub use bathroom_volume::BathroomVolume;
pub use heater_cycle::HeaterCycle;
pub use kitchen::Kitchen;

use hass_double::{HassApi, HassError};

/// Callbacks cannot return errors to the host; log them under the automation instead
pub(crate) fn log_failure<H: HassApi>(hass: &H, action: &str, result: Result<(), HassError>) {
    if let Err(error) = result {
        hass.error(&format!("{action} failed: {error}"));
    }
}
