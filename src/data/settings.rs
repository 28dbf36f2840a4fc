//! Kettle setting value types.
//!
//! Enumerations stored as whole bytes in the config record. Bytes the
//! firmware reports that we don't know decode to `Unrecognized` instead
//! of failing, so newer firmware variants can still be read.

/// Temperature units shown on the kettle display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Units {
    /// Degrees Fahrenheit (units bit clear).
    Fahrenheit,
    /// Degrees Celsius (units bit set).
    #[default]
    Celsius,
}

impl Units {
    /// Get a human-readable name for these units.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fahrenheit => "fahrenheit",
            Self::Celsius => "celsius",
        }
    }
}

/// Clock display mode (byte 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClockMode {
    /// Clock hidden.
    #[default]
    Off,
    /// Digital clock face.
    Digital,
    /// Analog clock face.
    Analog,
    /// A byte value this crate does not know.
    Unrecognized(u8),
}

impl ClockMode {
    /// Create from raw byte value.
    pub fn from_raw(value: u8) -> Self {
        match value {
            0 => Self::Off,
            1 => Self::Digital,
            2 => Self::Analog,
            other => Self::Unrecognized(other),
        }
    }

    /// Convert to raw byte value.
    pub fn to_raw(&self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Digital => 1,
            Self::Analog => 2,
            Self::Unrecognized(value) => *value,
        }
    }

    /// Whether this is one of the documented modes.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Get a human-readable name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Digital => "digital",
            Self::Analog => "analog",
            Self::Unrecognized(_) => "unrecognized",
        }
    }
}

/// Menu language (byte 15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Language {
    /// English.
    #[default]
    English,
    /// French.
    French,
    /// Spanish.
    Spanish,
    /// Simplified Chinese.
    SimplifiedChinese,
    /// Traditional Chinese.
    TraditionalChinese,
    /// A byte value this crate does not know.
    Unrecognized(u8),
}

impl Language {
    /// All documented languages, in byte order.
    pub const ALL: [Language; 5] = [
        Self::English,
        Self::French,
        Self::Spanish,
        Self::SimplifiedChinese,
        Self::TraditionalChinese,
    ];

    /// Create from raw byte value.
    pub fn from_raw(value: u8) -> Self {
        match value {
            0x00 => Self::English,
            0x01 => Self::French,
            0x02 => Self::Spanish,
            0x03 => Self::SimplifiedChinese,
            0x04 => Self::TraditionalChinese,
            other => Self::Unrecognized(other),
        }
    }

    /// Convert to raw byte value.
    pub fn to_raw(&self) -> u8 {
        match self {
            Self::English => 0x00,
            Self::French => 0x01,
            Self::Spanish => 0x02,
            Self::SimplifiedChinese => 0x03,
            Self::TraditionalChinese => 0x04,
            Self::Unrecognized(value) => *value,
        }
    }

    /// Whether this is one of the documented languages.
    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }

    /// Look up a language by name or short code (`"en"`, `"french"`, `"zh-hans"`, ...).
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Self::English),
            "fr" | "french" => Some(Self::French),
            "es" | "spanish" => Some(Self::Spanish),
            "zh-hans" | "zh-cn" | "simplified_chinese" => Some(Self::SimplifiedChinese),
            "zh-hant" | "zh-tw" | "traditional_chinese" => Some(Self::TraditionalChinese),
            _ => None,
        }
    }

    /// Get a human-readable name for this language.
    pub fn name(&self) -> &'static str {
        match self {
            Self::English => "English",
            Self::French => "French",
            Self::Spanish => "Spanish",
            Self::SimplifiedChinese => "Simplified Chinese",
            Self::TraditionalChinese => "Traditional Chinese",
            Self::Unrecognized(_) => "Unrecognized",
        }
    }
}

/// An hour/minute pair as stored by the kettle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockTime {
    /// Hour (0-23).
    pub hour: u8,
    /// Minute (0-59).
    pub minute: u8,
}

impl ClockTime {
    /// Create a time, without range checking.
    pub fn new(hour: u8, minute: u8) -> Self {
        Self { hour, minute }
    }

    /// Whether both parts are within a 24-hour day.
    pub fn is_valid(&self) -> bool {
        self.hour <= 23 && self.minute <= 59
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
