//! Session configuration.

use std::time::Duration;

use crate::error::{Error, Result};

/// Settings for a [`DeviceSession`](crate::DeviceSession).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Name filter used to resolve the kettle's address.
    pub device_name: String,
    /// Known address; skips discovery until a connect to it fails.
    pub address: Option<String>,
    /// Inactivity before the connection is closed.
    pub idle_timeout: Duration,
    /// Pause between the two writes of a once/daily schedule switch.
    pub settle_delay: Duration,
    /// How long discovery scans.
    pub scan_timeout: Duration,
    /// Limit for establishing the link.
    pub connect_timeout: Duration,
    /// Limit for a single read or write.
    pub io_timeout: Duration,
}

impl SessionConfig {
    /// Default idle timeout (60 seconds).
    pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
    /// Default settle delay (300 ms).
    pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(300);
    /// Default scan timeout (5 seconds).
    pub const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default connect timeout (10 seconds).
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    /// Default read/write timeout (5 seconds).
    pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);
    /// Default name filter.
    pub const DEFAULT_DEVICE_NAME: &'static str = "EKG";

    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discovery name filter.
    pub fn with_device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = name.into();
        self
    }

    /// Set a known address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Set the idle timeout.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the schedule settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set the scan timeout.
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the read/write timeout.
    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    /// Check that every timeout and the settle delay are non-zero.
    pub fn validate(&self) -> Result<()> {
        let timeouts = [
            ("idle_timeout", self.idle_timeout),
            ("settle_delay", self.settle_delay),
            ("scan_timeout", self.scan_timeout),
            ("connect_timeout", self.connect_timeout),
            ("io_timeout", self.io_timeout),
        ];

        for (name, value) in timeouts {
            if value.is_zero() {
                return Err(Error::invalid_argument(name, format!("{:?}", value)));
            }
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device_name: Self::DEFAULT_DEVICE_NAME.to_string(),
            address: None,
            idle_timeout: Self::DEFAULT_IDLE_TIMEOUT,
            settle_delay: Self::DEFAULT_SETTLE_DELAY,
            scan_timeout: Self::DEFAULT_SCAN_TIMEOUT,
            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            io_timeout: Self::DEFAULT_IO_TIMEOUT,
        }
    }
}
