//! Layout of the 17-byte config record.
//!
//! ```text
//!  0  status flags      bit3 = schedule enabled
//!  1  control flags     bit1 = Celsius, bit3 = pre-boil
//!  2  altitude low
//!  3  altitude high     bit7 always set
//!  4  target temp       celsius * 2
//!  5  (unmapped)
//!  6  schedule temp     celsius * 2, 0xC0 while disabled
//!  7  (unmapped)
//!  8  schedule minute
//!  9  schedule hour
//! 10  clock minute
//! 11  clock hour
//! 12  clock mode
//! 13  hold time         minutes
//! 14  chime volume      0-10
//! 15  language
//! 16  counter           rolling write sequence, bit3 = schedule once
//! ```

/// Length of the config record in bytes.
pub const RECORD_LEN: usize = 17;

/// A raw config record.
pub type RawRecord = [u8; RECORD_LEN];

pub(crate) const STATUS_FLAGS: usize = 0;
pub(crate) const CONTROL_FLAGS: usize = 1;
pub(crate) const ALTITUDE_LOW: usize = 2;
pub(crate) const ALTITUDE_HIGH: usize = 3;
pub(crate) const TARGET_TEMP: usize = 4;
pub(crate) const SCHEDULE_TEMP: usize = 6;
pub(crate) const SCHEDULE_MINUTE: usize = 8;
pub(crate) const SCHEDULE_HOUR: usize = 9;
pub(crate) const CLOCK_MINUTE: usize = 10;
pub(crate) const CLOCK_HOUR: usize = 11;
pub(crate) const CLOCK_MODE: usize = 12;
pub(crate) const HOLD_TIME: usize = 13;
pub(crate) const CHIME_VOLUME: usize = 14;
pub(crate) const LANGUAGE: usize = 15;
pub(crate) const COUNTER: usize = 16;

/// Status flags: schedule enabled.
pub(crate) const STATUS_SCHEDULE_ENABLED: u8 = 0x08;
/// Control flags: display in Celsius.
pub(crate) const CONTROL_UNITS_CELSIUS: u8 = 0x02;
/// Control flags: pre-boil.
pub(crate) const CONTROL_PRE_BOIL: u8 = 0x08;
/// Counter byte: schedule runs once (clear = daily).
pub(crate) const COUNTER_SCHEDULE_ONCE: u8 = 0x08;
/// Altitude high byte marker, set on every write.
pub(crate) const ALTITUDE_MARKER: u8 = 0x80;

/// Schedule temperature byte written while the schedule is disabled.
pub(crate) const SCHEDULE_TEMP_DISABLED: u8 = 0xC0;

/// Temperatures are stored at half-degree resolution.
pub(crate) const TEMP_SCALE: f64 = 2.0;

pub(crate) const MAX_TEMPERATURE: f64 = 100.0;
pub(crate) const MAX_ALTITUDE: u32 = 3000;
pub(crate) const ALTITUDE_STEP: u32 = 30;
pub(crate) const MAX_HOLD_MINUTES: u8 = 60;
pub(crate) const MAX_CHIME_VOLUME: u8 = 10;
