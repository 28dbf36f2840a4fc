//! Decoded view of the kettle's config record.

use crate::data::{ClockMode, ClockTime, Language, Schedule, ScheduleMode, StateSummary, Units};
use crate::error::{Error, Result};
use crate::protocol::payload::*;
use crate::utils::from_celsius;

/// Round an altitude to the nearest 30 m step. Exact halves go to the even
/// step, so 15 reads as 0 and 45 as 60.
pub(crate) fn quantize_altitude(meters: u32) -> u32 {
    let mut steps = meters / ALTITUDE_STEP;
    let rest = meters % ALTITUDE_STEP;
    let half = ALTITUDE_STEP / 2;
    if rest > half || (rest == half && steps % 2 == 1) {
        steps += 1;
    }
    steps * ALTITUDE_STEP
}

/// Immutable snapshot of the kettle configuration.
///
/// Every read or write produces a whole new record; records are never
/// patched in place. The raw bytes are kept so that unmapped bytes and
/// unknown flag bits survive a re-encode untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord {
    raw: RawRecord,
    schedule_enabled: bool,
    units: Units,
    pre_boil: bool,
    altitude: u32,
    target_temperature: f64,
    schedule_temperature: f64,
    schedule_time: ClockTime,
    clock: ClockTime,
    clock_mode: ClockMode,
    hold_time: u8,
    chime_volume: u8,
    language: Language,
    counter: u8,
}

impl StateRecord {
    /// Decode a record from characteristic data.
    ///
    /// Bytes past the 17th are ignored. Unknown enum bytes decode to
    /// `Unrecognized` rather than failing.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < RECORD_LEN {
            return Err(Error::InvalidData {
                context: format!(
                    "Config record too short: {} bytes (need {})",
                    data.len(),
                    RECORD_LEN
                ),
            });
        }

        let mut raw = [0u8; RECORD_LEN];
        raw.copy_from_slice(&data[..RECORD_LEN]);

        let altitude_raw =
            (((raw[ALTITUDE_HIGH] & !ALTITUDE_MARKER) as u32) << 8) | raw[ALTITUDE_LOW] as u32;

        let units = if raw[CONTROL_FLAGS] & CONTROL_UNITS_CELSIUS != 0 {
            Units::Celsius
        } else {
            Units::Fahrenheit
        };

        Ok(Self {
            raw,
            schedule_enabled: raw[STATUS_FLAGS] & STATUS_SCHEDULE_ENABLED != 0,
            units,
            pre_boil: raw[CONTROL_FLAGS] & CONTROL_PRE_BOIL != 0,
            altitude: quantize_altitude(altitude_raw),
            target_temperature: raw[TARGET_TEMP] as f64 / TEMP_SCALE,
            schedule_temperature: raw[SCHEDULE_TEMP] as f64 / TEMP_SCALE,
            schedule_time: ClockTime::new(raw[SCHEDULE_HOUR], raw[SCHEDULE_MINUTE]),
            clock: ClockTime::new(raw[CLOCK_HOUR], raw[CLOCK_MINUTE]),
            clock_mode: ClockMode::from_raw(raw[CLOCK_MODE]),
            hold_time: raw[HOLD_TIME],
            chime_volume: raw[CHIME_VOLUME],
            language: Language::from_raw(raw[LANGUAGE]),
            counter: raw[COUNTER],
        })
    }

    /// The raw 17 bytes this record was decoded from.
    pub fn as_bytes(&self) -> &RawRecord {
        &self.raw
    }

    /// Target temperature in Celsius (0.5° resolution).
    pub fn target_temperature(&self) -> f64 {
        self.target_temperature
    }

    /// Target temperature in the given units.
    pub fn target_temperature_in(&self, units: Units) -> f64 {
        from_celsius(self.target_temperature, units)
    }

    /// Display units.
    pub fn units(&self) -> Units {
        self.units
    }

    /// Whether pre-boil is enabled.
    pub fn pre_boil(&self) -> bool {
        self.pre_boil
    }

    /// Altitude compensation in meters, on a 30 m step.
    pub fn altitude(&self) -> u32 {
        self.altitude
    }

    /// Clock time shown on the display.
    pub fn clock(&self) -> ClockTime {
        self.clock
    }

    /// Clock display mode.
    pub fn clock_mode(&self) -> ClockMode {
        self.clock_mode
    }

    /// Hold time in minutes (0 = off).
    pub fn hold_time(&self) -> u8 {
        self.hold_time
    }

    /// Chime volume (0 = off).
    pub fn chime_volume(&self) -> u8 {
        self.chime_volume
    }

    /// Menu language.
    pub fn language(&self) -> Language {
        self.language
    }

    /// Rolling write counter, including the co-resident schedule submode bit.
    pub fn counter(&self) -> u8 {
        self.counter
    }

    /// Current schedule mode.
    ///
    /// `Off` whenever the enabled bit is clear, whatever the other schedule
    /// bytes hold.
    pub fn schedule_mode(&self) -> ScheduleMode {
        if !self.schedule_enabled {
            ScheduleMode::Off
        } else if self.counter & COUNTER_SCHEDULE_ONCE != 0 {
            ScheduleMode::Once
        } else {
            ScheduleMode::Daily
        }
    }

    /// Current schedule.
    pub fn schedule(&self) -> Schedule {
        Schedule {
            mode: self.schedule_mode(),
            temperature: self.schedule_temperature,
            time: self.schedule_time,
        }
    }

    /// Flattened view of every setting.
    pub fn summary(&self) -> StateSummary {
        StateSummary::from_record(self)
    }

    /// Hex dump of the raw record.
    pub fn to_hex(&self) -> String {
        self.raw.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    /// A record captured from a kettle: 95.5°C target, Celsius, 300 m,
    /// digital clock at 08:15, daily schedule at 06:45 for 90°C.
    pub(crate) const SAMPLE: RawRecord = [
        0x08, 0x02, 0x2C, 0x81, 0xBF, 0x00, 0xB4, 0x00, 0x2D, 0x06, 0x0F, 0x08, 0x01, 0x0F,
        0x05, 0x00, 0x20,
    ];

    #[test]
    fn test_decode_sample() {
        let record = StateRecord::decode(&SAMPLE).unwrap();

        assert_eq!(record.target_temperature(), 95.5);
        assert_eq!(record.units(), Units::Celsius);
        assert!(!record.pre_boil());
        assert_eq!(record.altitude(), 300);
        assert_eq!(record.clock(), ClockTime::new(8, 15));
        assert_eq!(record.clock_mode(), ClockMode::Digital);
        assert_eq!(record.hold_time(), 15);
        assert_eq!(record.chime_volume(), 5);
        assert_eq!(record.language(), Language::English);
        assert_eq!(record.counter(), 0x20);
        assert_eq!(
            record.schedule(),
            Schedule {
                mode: ScheduleMode::Daily,
                temperature: 90.0,
                time: ClockTime::new(6, 45),
            }
        );
        assert_eq!(record.as_bytes(), &SAMPLE);
    }

    #[test]
    fn test_decode_too_short() {
        let err = StateRecord::decode(&SAMPLE[..16]).unwrap_err();
        assert!(matches!(err, Error::InvalidData { .. }));
        assert!(StateRecord::decode(&[]).is_err());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut long = SAMPLE.to_vec();
        long.extend_from_slice(&[0xFF, 0xFF]);
        let record = StateRecord::decode(&long).unwrap();
        assert_eq!(record.as_bytes(), &SAMPLE);
    }

    #[test]
    fn test_unrecognized_enum_bytes() {
        let mut raw = SAMPLE;
        raw[CLOCK_MODE] = 0x09;
        raw[LANGUAGE] = 0x42;
        let record = StateRecord::decode(&raw).unwrap();
        assert_eq!(record.clock_mode(), ClockMode::Unrecognized(0x09));
        assert_eq!(record.language(), Language::Unrecognized(0x42));
    }

    #[test]
    fn test_schedule_mode_off_when_disabled() {
        let mut raw = SAMPLE;
        raw[STATUS_FLAGS] = 0x00;
        raw[COUNTER] |= COUNTER_SCHEDULE_ONCE;
        let record = StateRecord::decode(&raw).unwrap();
        assert_eq!(record.schedule_mode(), ScheduleMode::Off);
        assert!(!record.schedule().is_enabled());
    }

    #[test]
    fn test_schedule_mode_once() {
        let mut raw = SAMPLE;
        raw[COUNTER] = 0x28;
        let record = StateRecord::decode(&raw).unwrap();
        assert_eq!(record.schedule_mode(), ScheduleMode::Once);
    }

    #[test]
    fn test_altitude_decode_ignores_marker() {
        let mut raw = SAMPLE;
        // 1230 m = 0x04CE
        raw[ALTITUDE_LOW] = 0xCE;
        raw[ALTITUDE_HIGH] = 0x84;
        assert_eq!(StateRecord::decode(&raw).unwrap().altitude(), 1230);

        raw[ALTITUDE_HIGH] = 0x04;
        assert_eq!(StateRecord::decode(&raw).unwrap().altitude(), 1230);
    }

    #[test]
    fn test_quantize_altitude() {
        assert_eq!(quantize_altitude(0), 0);
        assert_eq!(quantize_altitude(14), 0);
        assert_eq!(quantize_altitude(16), 30);
        assert_eq!(quantize_altitude(1234), 1230);
        assert_eq!(quantize_altitude(3000), 3000);
    }

    #[test]
    fn test_quantize_altitude_halves_to_even() {
        assert_eq!(quantize_altitude(15), 0);
        assert_eq!(quantize_altitude(45), 60);
        assert_eq!(quantize_altitude(75), 60);
        assert_eq!(quantize_altitude(105), 120);
        assert_eq!(quantize_altitude(1275), 1260);
        assert_eq!(quantize_altitude(2985), 3000);
    }

    #[test]
    fn test_altitude_decode_half_step() {
        let mut raw = SAMPLE;
        // 45 m = 0x002D
        raw[ALTITUDE_LOW] = 0x2D;
        raw[ALTITUDE_HIGH] = 0x80;
        assert_eq!(StateRecord::decode(&raw).unwrap().altitude(), 60);

        raw[ALTITUDE_LOW] = 0x0F;
        assert_eq!(StateRecord::decode(&raw).unwrap().altitude(), 0);
    }

    #[test]
    fn test_fahrenheit_view() {
        let mut raw = SAMPLE;
        raw[TARGET_TEMP] = 200;
        let record = StateRecord::decode(&raw).unwrap();
        assert!((record.target_temperature_in(Units::Fahrenheit) - 212.0).abs() < 0.001);
    }

    #[test]
    fn test_to_hex() {
        let record = StateRecord::decode(&SAMPLE).unwrap();
        assert_eq!(record.to_hex(), "08022c81bf00b4002d060f08010f050020");
    }
}
