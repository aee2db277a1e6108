//! Speaker volumes that follow presence in the bathroom

use std::sync::Arc;

use chrono::NaiveTime;
use hass_double::{kwargs, Automation, EventFired, HassApi, Kwargs, Result, StateChange, StateListenOptions};

use crate::entity_ids::{bathroom, cast_groups, kitchen, living_room};
use crate::log_failure;

/// Low enough to be inaudible; some speakers misbehave when fully muted
pub const FAKE_MUTE_VOLUME: f64 = 0.1;
pub const BATHROOM_VOLUME: f64 = 0.4;

pub const DEFAULT_VOLUMES: [(&str, f64); 4] = [
    (kitchen::SPEAKER, 0.40),
    (bathroom::SPEAKER, FAKE_MUTE_VOLUME),
    (living_room::SOUNDBAR, 0.25),
    (living_room::CONTROLLER, 0.57),
];

pub fn reset_time() -> NaiveTime {
    NaiveTime::MIN + chrono::Duration::hours(4)
}

pub struct BathroomVolume<H> {
    hass: H,
}

impl<H: HassApi + Clone + 'static> BathroomVolume<H> {
    pub fn new(hass: H) -> Self {
        Self { hass }
    }

    fn reset_all_volumes(hass: &H) -> Result<()> {
        hass.log("Resetting all volumes");
        DEFAULT_VOLUMES.iter().try_for_each(|(speaker, volume)| set_volume(hass, speaker, *volume))
    }

    fn new_motion(hass: &H) -> Result<()> {
        if is_media_casting(hass)? {
            set_volume(hass, bathroom::SPEAKER, BATHROOM_VOLUME)?;
        }
        Ok(())
    }

    fn no_more_motion(hass: &H) -> Result<()> {
        set_volume(hass, bathroom::SPEAKER, FAKE_MUTE_VOLUME)
    }
}

fn set_volume<H: HassApi>(hass: &H, speaker: &str, volume: f64) -> Result<()> {
    hass.call_service("media_player/volume_set", kwargs! {"entity_id" => speaker, "volume_level" => volume})
}

/// Something plays on the bathroom speaker, directly or through the whole-flat group
fn is_media_casting<H: HassApi>(hass: &H) -> Result<bool> {
    Ok(hass.get_state(bathroom::SPEAKER)? != "off" || hass.get_state(cast_groups::ENTIRE_FLAT)? != "off")
}

impl<H: HassApi + Clone + 'static> Automation for BathroomVolume<H> {
    fn initialize(&mut self) -> Result<()> {
        let hass = self.hass.clone();
        self.hass.run_daily(
            Arc::new(move |_: &Kwargs| log_failure(&hass, "volume reset", Self::reset_all_volumes(&hass))),
            reset_time(),
            Kwargs::new(),
        )?;

        let hass = self.hass.clone();
        self.hass.listen_event(
            Arc::new(move |_: &EventFired| log_failure(&hass, "bathroom motion", Self::new_motion(&hass))),
            "motion",
            kwargs! {"entity_id" => bathroom::MOTION_SENSOR},
        )?;

        let hass = self.hass.clone();
        self.hass.listen_state(
            Arc::new(move |_: &StateChange| log_failure(&hass, "bathroom empty", Self::no_more_motion(&hass))),
            bathroom::MOTION_SENSOR,
            StateListenOptions::new().new_state("off"),
        )?;
        Ok(())
    }
}
