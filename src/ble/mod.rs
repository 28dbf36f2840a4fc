//! BLE communication module.
//!
//! This module provides the collaborator interfaces the session is built
//! on and their btleplug implementations for discovering and talking to
//! the kettle.

pub mod connection;
pub mod link;
pub mod scanner;
pub mod transport;
pub mod uuids;

pub use connection::{ConnectionEvent, ConnectionState};
pub use link::{DiscoveredDevice, Discovery, NotificationCallback, Transport};
pub use scanner::{default_adapter, BleScanner};
pub use transport::{BtleLink, BtleTransport};
pub use uuids::*;
