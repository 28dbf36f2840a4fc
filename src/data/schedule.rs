//! Schedule data structures.
//!
//! The kettle can heat automatically at a set time, either once or every
//! day. The schedule fields are only meaningful while the schedule-enabled
//! status bit is set.

use crate::data::ClockTime;
use crate::error::{Error, Result};

/// Schedule mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ScheduleMode {
    /// No schedule (enabled bit clear).
    #[default]
    Off,
    /// Heat once at the scheduled time (submode bit set).
    Once,
    /// Heat every day at the scheduled time (submode bit clear).
    Daily,
}

impl ScheduleMode {
    /// Whether a schedule is active.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Off)
    }

    /// Get a human-readable name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Once => "once",
            Self::Daily => "daily",
        }
    }
}

impl std::str::FromStr for ScheduleMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "once" => Ok(Self::Once),
            "daily" => Ok(Self::Daily),
            other => Err(Error::invalid_argument("schedule_mode", other)),
        }
    }
}

/// Decoded schedule view.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Schedule {
    /// Current mode.
    pub mode: ScheduleMode,
    /// Scheduled temperature in Celsius (meaningless while `Off`).
    pub temperature: f64,
    /// Scheduled start time (meaningless while `Off`).
    pub time: ClockTime,
}

impl Schedule {
    /// Whether a schedule is active.
    pub fn is_enabled(&self) -> bool {
        self.mode.is_active()
    }
}

/// A requested schedule change.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleRequest {
    /// Target mode.
    pub mode: ScheduleMode,
    /// Start hour (0-23).
    pub hour: u8,
    /// Start minute (0-59).
    pub minute: u8,
    /// Target temperature in Celsius; clamped to 0-100 when encoded.
    pub temperature: f64,
}

impl ScheduleRequest {
    /// Default scheduled temperature.
    pub const DEFAULT_TEMPERATURE: f64 = 85.0;

    /// Create a schedule request.
    pub fn new(mode: ScheduleMode, hour: u8, minute: u8, temperature: f64) -> Self {
        Self {
            mode,
            hour,
            minute,
            temperature,
        }
    }

    /// A request that turns the schedule off.
    pub fn off() -> Self {
        Self::new(ScheduleMode::Off, 0, 0, Self::DEFAULT_TEMPERATURE)
    }

    /// Check the request before any I/O.
    ///
    /// Time and temperature are ignored when turning the schedule off.
    pub fn validate(&self) -> Result<()> {
        if !self.mode.is_active() {
            return Ok(());
        }
        if self.hour > 23 {
            return Err(Error::invalid_argument("schedule_hour", self.hour));
        }
        if self.minute > 59 {
            return Err(Error::invalid_argument("schedule_minute", self.minute));
        }
        if !self.temperature.is_finite() {
            return Err(Error::invalid_argument(
                "schedule_temperature",
                self.temperature,
            ));
        }
        Ok(())
    }
}
