//! Flattened state view.
//!
//! One struct carrying every setting in display-ready form, for
//! adapters (HTTP, CLI, smart-home) that want a single serializable value.

use crate::data::ScheduleMode;
use crate::protocol::StateRecord;

/// Schedule part of a [`StateSummary`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleSummary {
    /// Schedule mode.
    pub mode: ScheduleMode,
    /// Whether a schedule is active.
    pub enabled: bool,
    /// Scheduled temperature, only while enabled.
    pub temperature_celsius: Option<f64>,
    /// Scheduled hour, only while enabled.
    pub hour: Option<u8>,
    /// Scheduled minute, only while enabled.
    pub minute: Option<u8>,
    /// "HH:MM", only while enabled.
    pub time: Option<String>,
}

/// Every kettle setting in one value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StateSummary {
    /// Target temperature in Celsius.
    pub target_temperature: f64,
    /// Display units name.
    pub units: String,
    /// Pre-boil enabled.
    pub pre_boil_enabled: bool,
    /// Altitude compensation in meters.
    pub altitude_meters: u32,
    /// Clock display mode name.
    pub clock_mode: String,
    /// Clock hour.
    pub clock_hours: u8,
    /// Clock minute.
    pub clock_minutes: u8,
    /// Clock as "HH:MM".
    pub clock_time: String,
    /// Hold time in minutes.
    pub hold_time_minutes: u8,
    /// Whether hold is on.
    pub hold_enabled: bool,
    /// Chime volume.
    pub chime_volume: u8,
    /// Whether the chime is on.
    pub chime_enabled: bool,
    /// Schedule view.
    pub schedule: ScheduleSummary,
    /// Menu language name.
    pub language: String,
    /// Raw record as hex.
    pub raw_data: String,
    /// Rolling write counter.
    pub counter: u8,
}

impl StateSummary {
    pub(crate) fn from_record(record: &StateRecord) -> Self {
        let schedule = record.schedule();
        let enabled = schedule.is_enabled();
        let clock = record.clock();

        Self {
            target_temperature: record.target_temperature(),
            units: record.units().name().to_string(),
            pre_boil_enabled: record.pre_boil(),
            altitude_meters: record.altitude(),
            clock_mode: record.clock_mode().name().to_string(),
            clock_hours: clock.hour,
            clock_minutes: clock.minute,
            clock_time: clock.to_string(),
            hold_time_minutes: record.hold_time(),
            hold_enabled: record.hold_time() > 0,
            chime_volume: record.chime_volume(),
            chime_enabled: record.chime_volume() > 0,
            schedule: ScheduleSummary {
                mode: schedule.mode,
                enabled,
                temperature_celsius: enabled.then_some(schedule.temperature),
                hour: enabled.then_some(schedule.time.hour),
                minute: enabled.then_some(schedule.time.minute),
                time: enabled.then(|| schedule.time.to_string()),
            },
            language: record.language().name().to_string(),
            raw_data: record.to_hex(),
            counter: record.counter(),
        }
    }
}
