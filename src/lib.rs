// Allow derivable impls for clarity
#![allow(clippy::derivable_impls)]
// Allow unusual byte groupings for UUIDs which have standard format
#![allow(clippy::unusual_byte_groupings)]

//! # stagg-rust-ble
//!
//! A cross-platform Rust library for controlling the Fellow Stagg EKG Pro
//! kettle over Bluetooth Low Energy.
//!
//! The kettle exposes its whole configuration as one 17-byte GATT record.
//! Every change is a read-modify-write of that record, stamped with a rolling
//! counter the firmware uses to accept or reject writes. This crate owns that
//! record, the counter and the single connection.
//!
//! ## Features
//!
//! - **Discovery**: Find nearby kettles by advertised name, strongest signal first
//! - **Settings**: Target temperature, hold time, chime, pre-boil, altitude,
//!   clock, language and display units
//! - **Schedule**: Once/daily schedules, including the two-write mode switch
//! - **Notifications**: State pushed by the kettle replaces the cached record
//! - **Managed connection**: Serialized access, lazy connect, idle disconnect
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use stagg_rust_ble::{Kettle, Result, ScheduleMode, SessionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let kettle = Kettle::new(SessionConfig::default()).await?;
//!
//!     let state = kettle.get_state().await?;
//!     println!("Target: {:.1}°C", state.target_temperature());
//!
//!     kettle.set_target_temperature(93.5).await?;
//!     kettle.set_schedule(ScheduleMode::Daily, 6, 30, 90.0).await?;
//!
//!     kettle.disconnect().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Platform Notes
//!
//! ### macOS
//! Requires Bluetooth permission. Add `NSBluetoothAlwaysUsageDescription`
//! to your Info.plist for bundled apps. Addresses are CoreBluetooth UUIDs
//! rather than MAC addresses.
//!
//! ### Linux
//! Requires BlueZ. User may need to be in the `bluetooth` group.
//!
//! ### Windows
//! Requires Windows 10 or later with Bluetooth LE support.
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for data types

// Public modules
pub mod ble;
pub mod config;
pub mod data;
pub mod error;
pub mod kettle;
pub mod protocol;
pub mod session;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenience
pub use config::SessionConfig;
pub use error::{Error, Result, TransportOp};
pub use kettle::{CallbackHandle, Kettle};
pub use session::{Command, DeviceSession, SessionGuard};
pub use utils::{celsius_to_fahrenheit, fahrenheit_to_celsius, format_temperature};

// Re-export commonly used types from submodules
pub use ble::{
    BleScanner, BtleTransport, ConnectionEvent, ConnectionState, DiscoveredDevice, Discovery,
    Transport,
};
pub use data::{
    ClockMode, ClockTime, Language, Schedule, ScheduleMode, ScheduleRequest, ScheduleSummary,
    StateSummary, Units,
};
pub use protocol::{RawRecord, Setting, StateRecord, RECORD_LEN};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ble::link::MockDiscovery;
    use crate::protocol::record::tests::SAMPLE;
    use crate::testing::FakeTransport;

    #[test]
    fn test_public_exports() {
        let _ = std::any::TypeId::of::<Kettle>();
        let _ = std::any::TypeId::of::<StateRecord>();
        let _ = std::any::TypeId::of::<Error>();
        let _ = std::any::TypeId::of::<SessionConfig>();
        let _ = std::any::TypeId::of::<StateSummary>();
    }

    #[test]
    fn test_temperature_conversion() {
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((fahrenheit_to_celsius(212.0) - 100.0).abs() < 0.001);
    }

    #[test]
    fn test_blocking_round_trip() {
        let transport = FakeTransport::new(SAMPLE);
        let kettle = Kettle::with_parts(
            transport.clone(),
            MockDiscovery::new(),
            SessionConfig::new().with_address("AA:BB:CC:DD:EE:FF"),
        )
        .unwrap();

        let state = tokio_test::block_on(async {
            kettle.set_pre_boil(true).await?;
            kettle.get_state().await
        })
        .unwrap();

        assert!(state.pre_boil());
        assert_eq!(transport.writes().len(), 1);
    }
}
