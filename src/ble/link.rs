//! Collaborator interfaces consumed by the session.
//!
//! The session never talks to a radio directly. It goes through a
//! [`Transport`] for the link and a [`Discovery`] to turn a name into an
//! address. The btleplug-backed implementations live in
//! [`transport`](super::transport) and [`scanner`](super::scanner); tests
//! substitute their own.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Called with the raw value of each config characteristic notification.
pub type NotificationCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// A device found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DiscoveredDevice {
    /// Platform address (MAC on Linux/Windows, UUID on macOS).
    pub address: String,
    /// Advertised local name.
    pub name: Option<String>,
    /// Signal strength in dBm.
    pub rssi: Option<i16>,
}

/// Link primitives for the config characteristic.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// An open connection.
    type Handle: Clone + Send + Sync + 'static;

    /// Open a connection to `address`.
    async fn connect(&self, address: &str) -> Result<Self::Handle>;

    /// Close a connection.
    async fn disconnect(&self, handle: &Self::Handle) -> Result<()>;

    /// Read the config characteristic.
    async fn read(&self, handle: &Self::Handle) -> Result<Vec<u8>>;

    /// Write the config characteristic, waiting for the acknowledgment.
    async fn write(&self, handle: &Self::Handle, data: &[u8]) -> Result<()>;

    /// Deliver config characteristic notifications to `callback` until the
    /// connection is closed.
    async fn subscribe(&self, handle: &Self::Handle, callback: NotificationCallback)
        -> Result<()>;
}

/// Device discovery.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Discovery: Send + Sync + 'static {
    /// Scan for `timeout` and return matching devices, strongest signal first.
    ///
    /// With no filter, every device that looks like a kettle is returned.
    async fn scan(
        &self,
        timeout: Duration,
        name_filter: Option<String>,
    ) -> Result<Vec<DiscoveredDevice>>;

    /// Resolve the address of the strongest device whose name contains `name`.
    async fn resolve_by_name(&self, name: &str, timeout: Duration) -> Result<String>;
}
