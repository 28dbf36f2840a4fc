//! Encoding of setting changes into full config records.
//!
//! All functions here are pure. Each one starts from the bytes of a
//! decoded record, overlays one change and returns the complete 17-byte
//! record to write. Numeric inputs are clamped to their documented
//! domain; only values with no sensible clamp (clock times, unknown enum
//! variants, NaN) are rejected.
//!
//! Every write advances the rolling counter in byte 16. A schedule enable
//! write then sets or clears the submode bit in that same, already
//! advanced byte. Both steps are reproduced bit-for-bit.

use crate::data::{ClockMode, ClockTime, Language, ScheduleMode, ScheduleRequest, Units};
use crate::error::{Error, Result};
use crate::protocol::payload::*;
use crate::protocol::record::{quantize_altitude, StateRecord};

/// A single field change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Setting {
    /// Target temperature in Celsius, clamped to 0-100.
    TargetTemperature(f64),
    /// Hold time in minutes, clamped to 0-60. Zero disables hold.
    HoldTime(u8),
    /// Chime volume, clamped to 0-10.
    ChimeVolume(u8),
    /// Pre-boil on or off.
    PreBoil(bool),
    /// Altitude in meters, clamped to 0-3000 and rounded to 30 m.
    Altitude(u32),
    /// Clock time, optionally with a new display mode.
    Clock {
        /// Hour (0-23).
        hour: u8,
        /// Minute (0-59).
        minute: u8,
        /// New display mode, or keep the current one.
        mode: Option<ClockMode>,
    },
    /// Clock display mode alone.
    ClockMode(ClockMode),
    /// Menu language.
    Language(Language),
    /// Display units.
    Units(Units),
}

impl Setting {
    /// Reject values that cannot be clamped into range.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::TargetTemperature(celsius) if !celsius.is_finite() => {
                Err(Error::invalid_argument("target_temperature", celsius))
            }
            Self::Clock { hour, minute, mode } => {
                if !ClockTime::new(hour, minute).is_valid() {
                    return Err(Error::invalid_argument(
                        "clock",
                        ClockTime::new(hour, minute),
                    ));
                }
                match mode {
                    Some(mode) => validate_clock_mode(mode),
                    None => Ok(()),
                }
            }
            Self::ClockMode(mode) => validate_clock_mode(mode),
            Self::Language(language) if !language.is_recognized() => {
                Err(Error::invalid_argument("language", language.to_raw()))
            }
            _ => Ok(()),
        }
    }

    /// Short field name, for logging.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::TargetTemperature(_) => "target_temperature",
            Self::HoldTime(_) => "hold_time",
            Self::ChimeVolume(_) => "chime_volume",
            Self::PreBoil(_) => "pre_boil",
            Self::Altitude(_) => "altitude",
            Self::Clock { .. } => "clock",
            Self::ClockMode(_) => "clock_mode",
            Self::Language(_) => "language",
            Self::Units(_) => "units",
        }
    }
}

fn validate_clock_mode(mode: ClockMode) -> Result<()> {
    if mode.is_recognized() {
        Ok(())
    } else {
        Err(Error::invalid_argument("clock_mode", mode.to_raw()))
    }
}

/// Encode a temperature in Celsius as the half-degree byte.
pub(crate) fn encode_temperature(celsius: f64) -> u8 {
    (celsius.clamp(0.0, MAX_TEMPERATURE) * TEMP_SCALE) as u8
}

/// Encode an altitude as (low, high) bytes with the marker bit set.
pub(crate) fn encode_altitude(meters: u32) -> (u8, u8) {
    let quantized = quantize_altitude(meters.min(MAX_ALTITUDE));
    let low = (quantized & 0xFF) as u8;
    let high = ALTITUDE_MARKER | ((quantized >> 8) as u8 & !ALTITUDE_MARKER);
    (low, high)
}

pub(crate) fn encode_hold_time(minutes: u8) -> u8 {
    minutes.min(MAX_HOLD_MINUTES)
}

fn set_flag(byte: &mut u8, mask: u8, on: bool) {
    if on {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// Advance the rolling counter of an outgoing record.
fn advance_counter(bytes: &mut RawRecord, previous: u8) {
    bytes[COUNTER] = previous.wrapping_add(1);
}

/// Produce the record that applies `setting` on top of `record`.
pub fn with_field(record: &StateRecord, setting: Setting) -> Result<RawRecord> {
    setting.validate()?;

    let mut bytes = *record.as_bytes();

    match setting {
        Setting::TargetTemperature(celsius) => {
            bytes[TARGET_TEMP] = encode_temperature(celsius);
        }
        Setting::HoldTime(minutes) => {
            bytes[HOLD_TIME] = encode_hold_time(minutes);
        }
        Setting::ChimeVolume(volume) => {
            bytes[CHIME_VOLUME] = volume.min(MAX_CHIME_VOLUME);
        }
        Setting::PreBoil(enabled) => {
            set_flag(&mut bytes[CONTROL_FLAGS], CONTROL_PRE_BOIL, enabled);
        }
        Setting::Altitude(meters) => {
            let (low, high) = encode_altitude(meters);
            bytes[ALTITUDE_LOW] = low;
            bytes[ALTITUDE_HIGH] = high;
        }
        Setting::Clock { hour, minute, mode } => {
            bytes[CLOCK_HOUR] = hour;
            bytes[CLOCK_MINUTE] = minute;
            if let Some(mode) = mode {
                bytes[CLOCK_MODE] = mode.to_raw();
            }
        }
        Setting::ClockMode(mode) => {
            bytes[CLOCK_MODE] = mode.to_raw();
        }
        Setting::Language(language) => {
            bytes[LANGUAGE] = language.to_raw();
        }
        Setting::Units(units) => {
            set_flag(
                &mut bytes[CONTROL_FLAGS],
                CONTROL_UNITS_CELSIUS,
                units == Units::Celsius,
            );
        }
    }

    advance_counter(&mut bytes, record.counter());
    Ok(bytes)
}

/// Produce the record that turns the schedule off.
///
/// The schedule bytes are reset to the values the firmware itself uses
/// for a disabled schedule: temperature 0xC0, 00:00.
pub fn disable_schedule(record: &StateRecord) -> RawRecord {
    let mut bytes = *record.as_bytes();

    set_flag(&mut bytes[STATUS_FLAGS], STATUS_SCHEDULE_ENABLED, false);
    bytes[SCHEDULE_TEMP] = SCHEDULE_TEMP_DISABLED;
    bytes[SCHEDULE_HOUR] = 0;
    bytes[SCHEDULE_MINUTE] = 0;

    advance_counter(&mut bytes, record.counter());
    bytes
}

/// Produce the record that enables the schedule described by `request`.
///
/// An `Off` request produces the disable record.
pub fn enable_schedule(record: &StateRecord, request: &ScheduleRequest) -> Result<RawRecord> {
    request.validate()?;

    let once = match request.mode {
        ScheduleMode::Off => return Ok(disable_schedule(record)),
        ScheduleMode::Once => true,
        ScheduleMode::Daily => false,
    };

    let mut bytes = *record.as_bytes();

    set_flag(&mut bytes[STATUS_FLAGS], STATUS_SCHEDULE_ENABLED, true);
    bytes[SCHEDULE_TEMP] = encode_temperature(request.temperature);
    bytes[SCHEDULE_HOUR] = request.hour;
    bytes[SCHEDULE_MINUTE] = request.minute;

    // Submode goes into the counter byte only after it has been advanced.
    advance_counter(&mut bytes, record.counter());
    set_flag(&mut bytes[COUNTER], COUNTER_SCHEDULE_ONCE, once);

    Ok(bytes)
}
