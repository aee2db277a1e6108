//! Entity ids of the flat

pub mod kitchen {
    pub const MOTION_SENSOR: &str = "binary_sensor.motion_sensor_158d0001660f47";
    pub const LIGHT: &str = "light.kitchen_bulb";
    pub const SPEAKER: &str = "media_player.kitchen";
    pub const BUTTON: &str = "binary_sensor.switch_158d0001bd15b7";
}

pub mod bathroom {
    pub const MOTION_SENSOR: &str = "binary_sensor.motion_sensor_158d0001656bba";
    pub const SPEAKER: &str = "media_player.bathroom";
    pub const WATER_HEATER: &str = "switch.water_heater";
    pub const TOWEL_HEATER: &str = "switch.towel_heater";
}

pub mod living_room {
    pub const SOUNDBAR: &str = "media_player.soundbar";
    pub const CONTROLLER: &str = "media_player.controller";
}

pub mod cast_groups {
    pub const ENTIRE_FLAT: &str = "media_player.entire_flat";
}
