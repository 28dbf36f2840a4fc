//! Error types for the stagg-rust-ble crate.

use thiserror::Error;

/// The transport primitive that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportOp {
    /// Establishing the link.
    Connect,
    /// Closing the link.
    Disconnect,
    /// Reading the config characteristic.
    Read,
    /// Writing the config characteristic.
    Write,
    /// Enabling notifications on the config characteristic.
    Subscribe,
}

impl std::fmt::Display for TransportOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Disconnect => write!(f, "disconnect"),
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
            Self::Subscribe => write!(f, "subscribe"),
        }
    }
}

/// The main error type for this crate.
#[derive(Error, Debug)]
pub enum Error {
    /// Bluetooth-related error from the underlying BLE library.
    #[error("Bluetooth error: {0}")]
    Bluetooth(#[from] btleplug::Error),

    /// Bluetooth is not available or is disabled on this system.
    #[error("Bluetooth not available or disabled")]
    BluetoothUnavailable,

    /// Discovery found no kettle matching the name filter.
    #[error("Device not found: {name}")]
    DeviceNotFound {
        /// The name filter that was searched for.
        name: String,
    },

    /// Operation requires a connection but the session has none.
    #[error("Kettle not connected")]
    NotConnected,

    /// Connecting to a known address failed. The address has been forgotten
    /// and will be re-resolved on the next acquire.
    #[error("Kettle unavailable at {address}: {reason}")]
    Unavailable {
        /// The address the connect was attempted against.
        address: String,
        /// Description of why the connection failed.
        reason: String,
    },

    /// A connect/read/write reported by the transport failed.
    #[error("Transport {operation} failed: {reason}")]
    TransportFailure {
        /// Which primitive failed.
        operation: TransportOp,
        /// Description of the failure.
        reason: String,
    },

    /// A transport call did not complete in time.
    #[error("Transport {operation} timed out")]
    Timeout {
        /// Which primitive timed out.
        operation: TransportOp,
    },

    /// A once/daily schedule change failed after its disable write landed.
    ///
    /// The kettle's schedule is now `Off`; re-issue the whole request.
    #[error("Schedule change failed at step {failed_step}, kettle schedule left Off: {source}")]
    ScheduleTransitionPartial {
        /// One-based index of the write that failed.
        failed_step: usize,
        /// The error that stopped the second write.
        #[source]
        source: Box<Error>,
    },

    /// Invalid data was received from the kettle.
    #[error("Invalid data received: {context}")]
    InvalidData {
        /// Description of what was invalid about the data.
        context: String,
    },

    /// A value outside a field's valid domain was provided.
    #[error("Invalid argument: {name} = {value}")]
    InvalidArgument {
        /// The name of the parameter.
        name: String,
        /// The invalid value that was provided.
        value: String,
    },

    /// Characteristic not found on the device.
    #[error("Characteristic not found: {uuid}")]
    CharacteristicNotFound {
        /// The UUID of the characteristic that was not found.
        uuid: String,
    },

    /// An internal error occurred.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an `InvalidArgument` error.
    pub(crate) fn invalid_argument(name: &str, value: impl ToString) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            value: value.to_string(),
        }
    }

    /// Shorthand for a `TransportFailure` error.
    pub(crate) fn transport(operation: TransportOp, reason: impl ToString) -> Self {
        Self::TransportFailure {
            operation,
            reason: reason.to_string(),
        }
    }

    /// Whether this error came from the link and therefore tore the session down.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure { .. }
                | Self::Timeout { .. }
                | Self::Bluetooth(_)
                | Self::CharacteristicNotFound { .. }
        )
    }

    /// Whether retrying the operation (after re-acquiring) can succeed.
    ///
    /// Argument errors are the only ones that retrying cannot fix.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidArgument { .. } | Self::InvalidData { .. })
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
