// crates/zigbee-rs/src/zcl/ids.rs
//! Well-known cluster, attribute and command identifiers.

/// Cluster identifiers.
pub mod cluster {
    pub const BASIC: u16 = 0x0000;
    pub const POWER_CONFIGURATION: u16 = 0x0001;
    pub const DEVICE_TEMPERATURE: u16 = 0x0002;
    pub const IDENTIFY: u16 = 0x0003;
    pub const GROUPS: u16 = 0x0004;
    pub const SCENES: u16 = 0x0005;
    pub const ON_OFF: u16 = 0x0006;
    pub const ON_OFF_SWITCH_CONFIGURATION: u16 = 0x0007;
    pub const LEVEL_CONTROL: u16 = 0x0008;
    pub const ALARMS: u16 = 0x0009;
    pub const TIME: u16 = 0x000A;
    pub const OTA_UPGRADE: u16 = 0x0019;
    pub const POLL_CONTROL: u16 = 0x0020;
    pub const DOOR_LOCK: u16 = 0x0101;
    pub const WINDOW_COVERING: u16 = 0x0102;
    pub const THERMOSTAT: u16 = 0x0201;
    pub const FAN_CONTROL: u16 = 0x0202;
    pub const COLOR_CONTROL: u16 = 0x0300;
    pub const ILLUMINANCE_MEASUREMENT: u16 = 0x0400;
    pub const TEMPERATURE_MEASUREMENT: u16 = 0x0402;
    pub const PRESSURE_MEASUREMENT: u16 = 0x0403;
    pub const RELATIVE_HUMIDITY_MEASUREMENT: u16 = 0x0405;
    pub const OCCUPANCY_SENSING: u16 = 0x0406;
    pub const IAS_ZONE: u16 = 0x0500;
    pub const METERING: u16 = 0x0702;
    pub const ELECTRICAL_MEASUREMENT: u16 = 0x0B04;
    pub const TOUCHLINK_COMMISSIONING: u16 = 0x1000;

    /// Returns a human readable cluster name for logging.
    pub fn name(cluster_id: u16) -> &'static str {
        match cluster_id {
            BASIC => "Basic",
            POWER_CONFIGURATION => "PowerConfiguration",
            DEVICE_TEMPERATURE => "DeviceTemperature",
            IDENTIFY => "Identify",
            GROUPS => "Groups",
            SCENES => "Scenes",
            ON_OFF => "OnOff",
            ON_OFF_SWITCH_CONFIGURATION => "OnOffSwitchConfiguration",
            LEVEL_CONTROL => "LevelControl",
            ALARMS => "Alarms",
            TIME => "Time",
            OTA_UPGRADE => "OtaUpgrade",
            POLL_CONTROL => "PollControl",
            DOOR_LOCK => "DoorLock",
            WINDOW_COVERING => "WindowCovering",
            THERMOSTAT => "Thermostat",
            FAN_CONTROL => "FanControl",
            COLOR_CONTROL => "ColorControl",
            ILLUMINANCE_MEASUREMENT => "IlluminanceMeasurement",
            TEMPERATURE_MEASUREMENT => "TemperatureMeasurement",
            PRESSURE_MEASUREMENT => "PressureMeasurement",
            RELATIVE_HUMIDITY_MEASUREMENT => "RelativeHumidityMeasurement",
            OCCUPANCY_SENSING => "OccupancySensing",
            IAS_ZONE => "IasZone",
            METERING => "Metering",
            ELECTRICAL_MEASUREMENT => "ElectricalMeasurement",
            TOUCHLINK_COMMISSIONING => "TouchlinkCommissioning",
            _ => "Unknown",
        }
    }
}

/// Attributes of the Basic cluster (0x0000).
pub mod basic {
    pub const ZCL_VERSION: u16 = 0x0000;
    pub const APPLICATION_VERSION: u16 = 0x0001;
    pub const STACK_VERSION: u16 = 0x0002;
    pub const HARDWARE_VERSION: u16 = 0x0003;
    pub const MANUFACTURER_NAME: u16 = 0x0004;
    pub const MODEL_IDENTIFIER: u16 = 0x0005;
    /// ISO 8601 YYYYMMDD
    pub const DATE_CODE: u16 = 0x0006;
    pub const POWER_SOURCE: u16 = 0x0007;
    pub const LOCATION_DESCRIPTION: u16 = 0x0010;
    pub const PHYSICAL_ENVIRONMENT: u16 = 0x0011;
    pub const DEVICE_ENABLED: u16 = 0x0012;
    pub const ALARM_MASK: u16 = 0x0013;
    pub const DISABLE_LOCAL_CONFIG: u16 = 0x0014;
    pub const SW_BUILD_ID: u16 = 0x4000;

    // Values of POWER_SOURCE
    pub const POWER_SOURCE_UNKNOWN: u8 = 0x00;
    pub const POWER_SOURCE_MAINS_SINGLE_PHASE: u8 = 0x01;
    pub const POWER_SOURCE_MAINS_THREE_PHASE: u8 = 0x02;
    pub const POWER_SOURCE_BATTERY: u8 = 0x03;
    pub const POWER_SOURCE_DC_SOURCE: u8 = 0x04;
    pub const POWER_SOURCE_EMERGENCY_MAINS_CONSTANT: u8 = 0x05;
    pub const POWER_SOURCE_EMERGENCY_MAINS_TRANSFER_SWITCH: u8 = 0x06;
}

/// Attributes of the Power Configuration cluster (0x0001).
pub mod power_configuration {
    pub const MAINS_INFORMATION: u16 = 0x0000;
    pub const MAINS_SETTINGS: u16 = 0x0001;
    pub const BATTERY_INFORMATION: u16 = 0x0002;
    pub const BATTERY_SETTINGS: u16 = 0x0003;
    pub const BATTERY_SOURCE_2_INFORMATION: u16 = 0x0004;
    pub const BATTERY_SOURCE_2_SETTINGS: u16 = 0x0005;
    pub const BATTERY_SOURCE_3_INFORMATION: u16 = 0x0006;
    pub const BATTERY_SOURCE_3_SETTINGS: u16 = 0x0007;
}

/// Attributes and commands of the On/Off cluster (0x0006).
pub mod on_off {
    pub const ON_OFF: u16 = 0x0000;
    pub const GLOBAL_SCENE_CONTROL: u16 = 0x4000;
    pub const ON_TIME: u16 = 0x4001;
    pub const OFF_WAIT_TIME: u16 = 0x4002;

    pub const COMMAND_OFF: u8 = 0x00;
    pub const COMMAND_ON: u8 = 0x01;
    pub const COMMAND_TOGGLE: u8 = 0x02;
}

/// Attributes and commands of the Level Control cluster (0x0008).
pub mod level_control {
    pub const CURRENT_LEVEL: u16 = 0x0000;
    pub const REMAINING_TIME: u16 = 0x0001;
    pub const ON_OFF_TRANSITION_TIME: u16 = 0x0010;
    pub const ON_LEVEL: u16 = 0x0011;
    pub const ON_TRANSITION_TIME: u16 = 0x0012;
    pub const OFF_TRANSITION_TIME: u16 = 0x0013;
    pub const DEFAULT_MOVE_RATE: u16 = 0x0014;

    pub const COMMAND_MOVE_TO_LEVEL: u8 = 0x00;
    pub const COMMAND_MOVE: u8 = 0x01;
    pub const COMMAND_STEP: u8 = 0x02;
    pub const COMMAND_STOP: u8 = 0x03;
    pub const COMMAND_MOVE_TO_LEVEL_WITH_ON_OFF: u8 = 0x04;
    pub const COMMAND_MOVE_WITH_ON_OFF: u8 = 0x05;
    pub const COMMAND_STEP_WITH_ON_OFF: u8 = 0x06;
    pub const COMMAND_STOP_WITH_ON_OFF: u8 = 0x07;
}

/// Attributes of the Color Control cluster (0x0300).
pub mod color_control {
    pub const CURRENT_HUE: u16 = 0x0000;
    pub const CURRENT_SATURATION: u16 = 0x0001;
    pub const REMAINING_TIME: u16 = 0x0002;
    pub const CURRENT_X: u16 = 0x0003;
    pub const CURRENT_Y: u16 = 0x0004;
    pub const DRIFT_COMPENSATION: u16 = 0x0005;
    pub const COMPENSATION_TEXT: u16 = 0x0006;
    pub const COLOR_TEMPERATURE_MIREDS: u16 = 0x0007;
    pub const COLOR_MODE: u16 = 0x0008;
    pub const ENHANCED_CURRENT_HUE: u16 = 0x4000;
    pub const ENHANCED_COLOR_MODE: u16 = 0x4001;
    pub const COLOR_LOOP_ACTIVE: u16 = 0x4002;
    pub const COLOR_LOOP_DIRECTION: u16 = 0x4003;
    pub const COLOR_LOOP_TIME: u16 = 0x4004;
    pub const COLOR_LOOP_START_ENHANCED_HUE: u16 = 0x4005;
    pub const COLOR_LOOP_STORED_ENHANCED_HUE: u16 = 0x4006;
    pub const COLOR_CAPABILITIES: u16 = 0x400A;
    pub const COLOR_TEMP_PHYSICAL_MIN_MIREDS: u16 = 0x400B;
    pub const COLOR_TEMP_PHYSICAL_MAX_MIREDS: u16 = 0x400C;

    // Values of COLOR_MODE
    pub const COLOR_MODE_HUE_SATURATION: u8 = 0x00;
    pub const COLOR_MODE_XY: u8 = 0x01;
    pub const COLOR_MODE_COLOR_TEMPERATURE: u8 = 0x02;
}
