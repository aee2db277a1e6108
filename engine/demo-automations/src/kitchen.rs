//! Kitchen light on motion, and a button that pauses the water heater

use std::sync::Arc;

use hass_double::{kwargs, Automation, EventFired, HassApi, Kwargs, Result, StateChange, StateListenOptions};

use crate::entity_ids::{bathroom, kitchen};
use crate::log_failure;

pub const PHONE_PUSHBULLET_ID: &str = "device/OnePlus 5T";
pub const TURNED_OFF_MSG: &str = "Water Heater was turned OFF";
pub const TURNED_ON_MSG: &str = "Water Heater was turned back ON";
pub const WATER_HEATER_DELAY_MINUTES: u64 = 10;

pub struct Kitchen<H> {
    hass: H,
}

impl<H: HassApi + Clone + 'static> Kitchen<H> {
    pub fn new(hass: H) -> Self {
        Self { hass }
    }

    fn new_motion(hass: &H) -> Result<()> {
        hass.turn_on(kitchen::LIGHT, Kwargs::new())
    }

    fn no_more_motion(hass: &H) -> Result<()> {
        hass.turn_off(kitchen::LIGHT, Kwargs::new())
    }

    /// Water heater off now, back on after the delay
    fn new_button_click(hass: &H) -> Result<()> {
        hass.turn_off(bathroom::WATER_HEATER, Kwargs::new())?;
        notify_phone(hass, TURNED_OFF_MSG)?;

        let later = hass.clone();
        hass.run_in(
            Arc::new(move |_: &Kwargs| log_failure(&later, "water heater restore", Self::after_delay(&later))),
            WATER_HEATER_DELAY_MINUTES * 60,
            Kwargs::new(),
        )?;
        Ok(())
    }

    fn after_delay(hass: &H) -> Result<()> {
        hass.turn_on(bathroom::WATER_HEATER, Kwargs::new())?;
        notify_phone(hass, TURNED_ON_MSG)
    }
}

fn notify_phone<H: HassApi>(hass: &H, message: &str) -> Result<()> {
    hass.call_service("notify/pushbullet", kwargs! {"target" => PHONE_PUSHBULLET_ID, "message" => message})
}

impl<H: HassApi + Clone + 'static> Automation for Kitchen<H> {
    fn initialize(&mut self) -> Result<()> {
        let hass = self.hass.clone();
        self.hass.listen_event(
            Arc::new(move |_: &EventFired| log_failure(&hass, "motion", Self::new_motion(&hass))),
            "motion",
            kwargs! {"entity_id" => kitchen::MOTION_SENSOR},
        )?;

        let hass = self.hass.clone();
        self.hass.listen_state(
            Arc::new(move |_: &StateChange| log_failure(&hass, "no more motion", Self::no_more_motion(&hass))),
            kitchen::MOTION_SENSOR,
            StateListenOptions::new().new_state("off"),
        )?;

        let hass = self.hass.clone();
        self.hass.listen_event(
            Arc::new(move |_: &EventFired| log_failure(&hass, "button click", Self::new_button_click(&hass))),
            "click",
            kwargs! {"entity_id" => kitchen::BUTTON, "click_type" => "single"},
        )?;
        Ok(())
    }
}
