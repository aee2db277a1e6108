//! Behaviour of the demo automations on the double

use chrono::{NaiveDate, NaiveTime};
use hass_double::{kwargs, AutomationHarness, HassApi, HassDouble, HassError, HostCall, Kwargs, Operation, StateListenOptions};

use crate::bathroom_volume::{BathroomVolume, BATHROOM_VOLUME, DEFAULT_VOLUMES, FAKE_MUTE_VOLUME};
use crate::entity_ids::{bathroom, cast_groups, kitchen};
use crate::heater_cycle::HeaterCycle;
use crate::kitchen::{Kitchen, PHONE_PUSHBULLET_ID, TURNED_OFF_MSG, TURNED_ON_MSG};

fn hms(hour: u32, minute: u32, second: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, second).unwrap()
}

#[cfg(test)]
mod kitchen_tests {
    use super::*;

    fn kitchen_harness() -> (AutomationHarness, Kitchen<HassDouble>) {
        let mut harness = AutomationHarness::new();
        let automation = harness.automation("kitchen", Kwargs::new(), Kitchen::new).unwrap();
        (harness, automation)
    }

    #[test]
    fn test_listens_to_sensors() {
        let (harness, _kitchen) = kitchen_harness();
        let assert = harness.assert_that("kitchen");
        assert.listens_to().event("motion", kwargs! {"entity_id" => kitchen::MOTION_SENSOR});
        assert.listens_to().state(kitchen::MOTION_SENSOR, StateListenOptions::new().new_state("off"));
        assert
            .listens_to()
            .event("click", kwargs! {"entity_id" => kitchen::BUTTON, "click_type" => "single"});
    }

    #[test]
    fn test_motion_turns_light_on() {
        let (harness, _kitchen) = kitchen_harness();
        harness.when().event("motion", kwargs! {"entity_id" => kitchen::MOTION_SENSOR});
        harness.assert_that(kitchen::LIGHT).was().turned_on(Kwargs::new());
    }

    #[test]
    fn test_motion_elsewhere_is_ignored() {
        let (harness, _kitchen) = kitchen_harness();
        harness.when().event("motion", kwargs! {"entity_id" => bathroom::MOTION_SENSOR});
        harness.assert_that(kitchen::LIGHT).was_not().turned_on(Kwargs::new());
    }

    #[test]
    fn test_no_more_motion_turns_light_off() {
        let (harness, _kitchen) = kitchen_harness();
        harness.given_that().state_of(kitchen::MOTION_SENSOR).is_set_to("on");

        harness.when().state_of(kitchen::MOTION_SENSOR).is_set_to("off").unwrap();
        harness.assert_that(kitchen::LIGHT).was().turned_off(Kwargs::new());
    }

    #[test]
    fn test_click_pauses_water_heater_for_ten_minutes() {
        let (harness, _kitchen) = kitchen_harness();
        harness.when().event("click", kwargs! {"entity_id" => kitchen::BUTTON, "click_type" => "single"});

        harness.assert_that(bathroom::WATER_HEATER).was().turned_off(Kwargs::new());
        harness
            .assert_that("notify/pushbullet")
            .was()
            .called_with(kwargs! {"target" => PHONE_PUSHBULLET_ID, "message" => TURNED_OFF_MSG});
        harness.assert_that("kitchen").registered().run_in(600, Kwargs::new());

        harness.time_travel().fast_forward(9).minutes().unwrap();
        harness.assert_that(bathroom::WATER_HEATER).was_not().turned_on(Kwargs::new());

        harness.time_travel().fast_forward(1).minutes().unwrap();
        harness.assert_that(bathroom::WATER_HEATER).was().turned_on(Kwargs::new());
        harness
            .assert_that("notify/pushbullet")
            .was()
            .called_with(kwargs! {"target" => PHONE_PUSHBULLET_ID, "message" => TURNED_ON_MSG});
    }

    #[test]
    fn test_double_click_does_nothing() {
        let (harness, _kitchen) = kitchen_harness();
        harness.when().event("click", kwargs! {"entity_id" => kitchen::BUTTON, "click_type" => "double"});
        assert!(harness.hass().calls().is_empty());
        assert_eq!(harness.hass().scheduler().pending_count(), 0);
    }
}

#[cfg(test)]
mod bathroom_volume_tests {
    use super::*;

    fn bathroom_harness() -> (AutomationHarness, BathroomVolume<HassDouble>) {
        let mut harness = AutomationHarness::new();
        let automation = harness.automation("bathroom", Kwargs::new(), BathroomVolume::new).unwrap();
        (harness, automation)
    }

    fn volume_set(speaker: &str, volume: f64) -> Kwargs {
        kwargs! {"entity_id" => speaker, "volume_level" => volume}
    }

    #[test]
    fn test_volumes_reset_every_morning() {
        let (harness, _bathroom) = bathroom_harness();
        harness.assert_that("bathroom").registered().run_daily(hms(4, 0, 0), Kwargs::new());

        harness.time_travel().fast_forward(3).hours().unwrap();
        harness.assert_that("media_player/volume_set").was_not().called_with(volume_set(kitchen::SPEAKER, 0.40));

        harness.time_travel().fast_forward(1).hours().unwrap();
        for (speaker, volume) in DEFAULT_VOLUMES {
            harness.assert_that("media_player/volume_set").was().called_with(volume_set(speaker, volume));
        }

        harness.given_that().mock_functions_are_cleared(false);
        harness.time_travel().fast_forward(24).hours().unwrap();
        assert_eq!(harness.hass().call_log().of(Operation::CallService).len(), DEFAULT_VOLUMES.len());
    }

    #[test]
    fn test_motion_raises_volume_while_casting() {
        let (harness, _bathroom) = bathroom_harness();
        harness.given_that().state_of(bathroom::SPEAKER).is_set_to("off");
        harness.given_that().state_of(cast_groups::ENTIRE_FLAT).is_set_to("playing");

        harness.when().event("motion", kwargs! {"entity_id" => bathroom::MOTION_SENSOR});
        harness
            .assert_that("media_player/volume_set")
            .was()
            .called_with(volume_set(bathroom::SPEAKER, BATHROOM_VOLUME));
    }

    #[test]
    fn test_motion_without_media_keeps_volume() {
        let (harness, _bathroom) = bathroom_harness();
        harness.given_that().state_of(bathroom::SPEAKER).is_set_to("off");
        harness.given_that().state_of(cast_groups::ENTIRE_FLAT).is_set_to("off");

        harness.when().event("motion", kwargs! {"entity_id" => bathroom::MOTION_SENSOR});
        assert!(harness.hass().calls().is_empty());
    }

    #[test]
    fn test_leaving_mutes_bathroom() {
        let (harness, _bathroom) = bathroom_harness();
        harness.when().state_of(bathroom::MOTION_SENSOR).is_set_to("off").unwrap();
        harness
            .assert_that("media_player/volume_set")
            .was()
            .called_with(volume_set(bathroom::SPEAKER, FAKE_MUTE_VOLUME));
    }

    #[test]
    fn test_unknown_media_state_is_logged() {
        let (harness, _bathroom) = bathroom_harness();
        harness.when().event("motion", kwargs! {"entity_id" => bathroom::MOTION_SENSOR});

        let errors = harness.hass().call_log().of(Operation::Error);
        assert_eq!(errors.len(), 1);
        match &errors[0].call {
            HostCall::Log { message, .. } => assert!(message.contains(bathroom::SPEAKER), "{message}"),
            other => panic!("unexpected call {other:?}"),
        }
    }
}

#[cfg(test)]
mod heater_cycle_tests {
    use super::*;

    #[test]
    fn test_cycles_then_cancels_itself() {
        let mut harness = AutomationHarness::new();
        let heater = harness
            .automation("heater", kwargs! {"interval_minutes" => 10, "cycles" => 3}, HeaterCycle::new)
            .unwrap();
        let start = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_time(hms(0, 10, 0));
        harness.assert_that("heater").registered().run_every(start, 600, Kwargs::new());
        assert!(heater.is_running());

        harness.time_travel().fast_forward(2).hours().unwrap();

        assert_eq!(heater.runs(), 3);
        assert!(!heater.is_running());
        assert_eq!(harness.hass().call_log().of(Operation::Toggle).len(), 3);
        harness.assert_that(bathroom::TOWEL_HEATER).was().turned_off(Kwargs::new());
        assert_eq!(harness.hass().scheduler().pending_count(), 0);
    }

    #[test]
    fn test_runs_on_interval() {
        let mut harness = AutomationHarness::new();
        let heater = harness.automation("heater", Kwargs::new(), HeaterCycle::new).unwrap();

        harness.time_travel().fast_forward(44).minutes().unwrap();
        assert_eq!(heater.runs(), 2);
        harness.time_travel().fast_forward(1).minutes().unwrap();
        assert_eq!(heater.runs(), 3);
        assert!(heater.is_running());
        assert_eq!(harness.hass().get_now().naive_local().time(), hms(0, 45, 0));
    }

    #[test]
    fn test_invalid_args_are_rejected() {
        let mut harness = AutomationHarness::new();
        let result = harness.automation("heater", kwargs! {"cycles" => 0}, HeaterCycle::new);
        assert!(matches!(result, Err(HassError::InvalidArgument(_))));

        let result = harness.automation("heater_two", kwargs! {"interval_minutes" => "soon"}, HeaterCycle::new);
        assert!(matches!(result, Err(HassError::InvalidArgument(_))));
    }
}
