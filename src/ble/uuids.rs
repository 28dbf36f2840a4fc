//! BLE Service and Characteristic UUIDs.
//!
//! Contains the UUID constants and advertised names used to find and talk
//! to the kettle.

use uuid::Uuid;

/// Kettle control service UUID.
pub const KETTLE_SERVICE_UUID: Uuid = Uuid::from_u128(0x7aeb_f330_6cb1_46e4_b23b_7cc2262c605e);

/// Secondary vendor service UUID exposed by some firmware revisions.
pub const KETTLE_AUX_SERVICE_UUID: Uuid =
    Uuid::from_u128(0xb4df_5a1c_3f6b_f4bf_ea4a_820304901a02);

/// Main config characteristic UUID (Read, Write, Notify).
///
/// Carries the whole 17-byte configuration record.
pub const MAIN_CONFIG_UUID: Uuid = Uuid::from_u128(0x2291_c4b5_5d7f_4477_a88b_b266edb97142);

/// Advertised name fragments that identify a kettle.
pub const KETTLE_NAME_PATTERNS: [&str; 3] = ["Stagg", "Fellow", "EKG"];

/// Check if a service UUID is one of the kettle's vendor services.
pub fn is_kettle_service(uuid: &Uuid) -> bool {
    *uuid == KETTLE_SERVICE_UUID || *uuid == KETTLE_AUX_SERVICE_UUID
}

/// Check if an advertised name looks like a kettle.
pub fn is_kettle_name(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    KETTLE_NAME_PATTERNS
        .iter()
        .any(|pattern| name.contains(&pattern.to_ascii_lowercase()))
}
