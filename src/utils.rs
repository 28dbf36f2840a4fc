//! Temperature unit conversion.
//!
//! The kettle always stores Celsius; these helpers cover the Fahrenheit
//! display mode.

use crate::data::Units;

/// Convert Celsius to Fahrenheit.
///
/// # Example
///
/// ```
/// use stagg_rust_ble::celsius_to_fahrenheit;
///
/// let fahrenheit = celsius_to_fahrenheit(100.0);
/// assert!((fahrenheit - 212.0).abs() < 0.001);
/// ```
#[inline]
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

/// Convert Fahrenheit to Celsius.
///
/// # Example
///
/// ```
/// use stagg_rust_ble::fahrenheit_to_celsius;
///
/// let celsius = fahrenheit_to_celsius(203.0);
/// assert!((celsius - 95.0).abs() < 0.001);
/// ```
#[inline]
pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert a Celsius value for display in `units`.
#[inline]
pub fn from_celsius(celsius: f64, units: Units) -> f64 {
    match units {
        Units::Celsius => celsius,
        Units::Fahrenheit => celsius_to_fahrenheit(celsius),
    }
}

/// Convert a value given in `units` to Celsius.
#[inline]
pub fn to_celsius(value: f64, units: Units) -> f64 {
    match units {
        Units::Celsius => value,
        Units::Fahrenheit => fahrenheit_to_celsius(value),
    }
}

/// Format a Celsius value in `units`, e.g. `"95.5°C"` or `"203.9°F"`.
pub fn format_temperature(celsius: f64, units: Units) -> String {
    let suffix = match units {
        Units::Celsius => "C",
        Units::Fahrenheit => "F",
    };
    format!("{:.1}°{}", from_celsius(celsius, units), suffix)
}
