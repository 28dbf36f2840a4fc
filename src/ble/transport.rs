//! btleplug-backed [`Transport`].
//!
//! Opens a GATT connection, locates the main config characteristic and
//! performs reads, acknowledged writes and notification delivery on it.

use async_trait::async_trait;
use btleplug::api::{Central, Characteristic, Peripheral as _, ScanFilter, WriteType};
use btleplug::platform::{Adapter, Peripheral};
use futures::stream::StreamExt;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::ble::link::{NotificationCallback, Transport};
use crate::ble::uuids::MAIN_CONFIG_UUID;
use crate::config::SessionConfig;
use crate::error::{Error, Result, TransportOp};

/// How often to poll the adapter while waiting for an unknown address to appear.
const PERIPHERAL_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// An open connection to a kettle.
#[derive(Clone)]
pub struct BtleLink {
    peripheral: Peripheral,
    characteristic: Characteristic,
    listener: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl BtleLink {
    /// The underlying peripheral.
    pub fn peripheral(&self) -> &Peripheral {
        &self.peripheral
    }

    fn stop_listener(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for BtleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleLink")
            .field("peripheral", &self.peripheral.id())
            .field("characteristic", &self.characteristic.uuid)
            .finish()
    }
}

/// GATT transport over a btleplug adapter.
pub struct BtleTransport {
    adapter: Adapter,
    connect_timeout: Duration,
    io_timeout: Duration,
}

impl BtleTransport {
    /// Create a transport on `adapter` with the timeouts from `config`.
    pub fn new(adapter: Adapter, config: &SessionConfig) -> Self {
        Self {
            adapter,
            connect_timeout: config.connect_timeout,
            io_timeout: config.io_timeout,
        }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Find a peripheral by platform address or peripheral id.
    async fn find_peripheral(&self, address: &str) -> Result<Option<Peripheral>> {
        let peripherals = self.adapter.peripherals().await?;

        Ok(peripherals.into_iter().find(|p| {
            p.address().to_string().eq_ignore_ascii_case(address)
                || p.id().to_string().eq_ignore_ascii_case(address)
        }))
    }

    /// Find a peripheral, scanning briefly if the adapter has not seen it yet.
    async fn locate(&self, address: &str) -> Result<Peripheral> {
        if let Some(peripheral) = self.find_peripheral(address).await? {
            return Ok(peripheral);
        }

        debug!("{} not cached by adapter, scanning", address);
        self.adapter.start_scan(ScanFilter::default()).await?;

        let found = tokio::time::timeout(self.connect_timeout, async {
            loop {
                if let Some(peripheral) = self.find_peripheral(address).await? {
                    return Ok::<_, Error>(peripheral);
                }
                tokio::time::sleep(PERIPHERAL_POLL_INTERVAL).await;
            }
        })
        .await;

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        match found {
            Ok(result) => result,
            Err(_) => Err(Error::transport(
                TransportOp::Connect,
                format!("peripheral {} not found", address),
            )),
        }
    }
}

/// Run a btleplug call with a time limit, mapping failures to transport errors.
async fn bounded<T, F>(operation: TransportOp, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, btleplug::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(Error::transport(operation, e)),
        Err(_) => Err(Error::Timeout { operation }),
    }
}

/// Pick the main config characteristic out of a discovered set.
fn find_config_characteristic(
    characteristics: impl IntoIterator<Item = Characteristic>,
) -> Result<Characteristic> {
    characteristics
        .into_iter()
        .find(|c| c.uuid == MAIN_CONFIG_UUID)
        .ok_or_else(|| Error::CharacteristicNotFound {
            uuid: MAIN_CONFIG_UUID.to_string(),
        })
}

/// Pass `result` through, dropping the link first when it is an error so a
/// half-set-up connection is not left open.
async fn or_disconnect<T, D>(result: Result<T>, disconnect: D) -> Result<T>
where
    D: Future<Output = Result<()>>,
{
    if let Err(e) = &result {
        debug!("Connection setup failed ({}), disconnecting", e);
        if let Err(e) = disconnect.await {
            warn!("Disconnect after failed setup failed: {}", e);
        }
    }
    result
}

#[async_trait]
impl Transport for BtleTransport {
    type Handle = BtleLink;

    async fn connect(&self, address: &str) -> Result<BtleLink> {
        let peripheral = self.locate(address).await?;

        if !peripheral.is_connected().await.unwrap_or(false) {
            bounded(
                TransportOp::Connect,
                self.connect_timeout,
                peripheral.connect(),
            )
            .await?;
        }

        let setup = async {
            bounded(
                TransportOp::Connect,
                self.connect_timeout,
                peripheral.discover_services(),
            )
            .await?;
            find_config_characteristic(peripheral.characteristics())
        }
        .await;

        let characteristic = or_disconnect(
            setup,
            bounded(
                TransportOp::Disconnect,
                self.io_timeout,
                peripheral.disconnect(),
            ),
        )
        .await?;

        info!("Connected to kettle at {}", address);

        Ok(BtleLink {
            peripheral,
            characteristic,
            listener: Arc::new(Mutex::new(None)),
        })
    }

    async fn disconnect(&self, handle: &BtleLink) -> Result<()> {
        handle.stop_listener();

        bounded(
            TransportOp::Disconnect,
            self.io_timeout,
            handle.peripheral.disconnect(),
        )
        .await?;

        info!("Disconnected from kettle");
        Ok(())
    }

    async fn read(&self, handle: &BtleLink) -> Result<Vec<u8>> {
        let data = bounded(
            TransportOp::Read,
            self.io_timeout,
            handle.peripheral.read(&handle.characteristic),
        )
        .await?;

        trace!("Read {} bytes: {:02X?}", data.len(), data);
        Ok(data)
    }

    async fn write(&self, handle: &BtleLink, data: &[u8]) -> Result<()> {
        bounded(
            TransportOp::Write,
            self.io_timeout,
            handle
                .peripheral
                .write(&handle.characteristic, data, WriteType::WithResponse),
        )
        .await?;

        trace!("Wrote {} bytes: {:02X?}", data.len(), data);
        Ok(())
    }

    async fn subscribe(&self, handle: &BtleLink, callback: NotificationCallback) -> Result<()> {
        bounded(
            TransportOp::Subscribe,
            self.io_timeout,
            handle.peripheral.subscribe(&handle.characteristic),
        )
        .await?;

        let mut notifications = bounded(
            TransportOp::Subscribe,
            self.io_timeout,
            handle.peripheral.notifications(),
        )
        .await?;

        let task = tokio::spawn(async move {
            debug!("Notification listener started");
            while let Some(notification) = notifications.next().await {
                if notification.uuid != MAIN_CONFIG_UUID {
                    continue;
                }
                trace!(
                    "Notification: {} bytes, data: {:02X?}",
                    notification.value.len(),
                    notification.value
                );
                callback(notification.value.as_slice());
            }
            debug!("Notification listener stopped");
        });

        if let Some(previous) = handle.listener.lock().replace(task) {
            previous.abort();
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btleplug::api::CharPropFlags;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn characteristic(uuid: Uuid) -> Characteristic {
        Characteristic {
            uuid,
            service_uuid: crate::ble::uuids::KETTLE_SERVICE_UUID,
            properties: CharPropFlags::READ | CharPropFlags::WRITE | CharPropFlags::NOTIFY,
            descriptors: BTreeSet::new(),
        }
    }

    #[test]
    fn test_find_config_characteristic() {
        let other = Uuid::from_u128(0x1234);
        let found =
            find_config_characteristic(vec![characteristic(other), characteristic(MAIN_CONFIG_UUID)])
                .unwrap();
        assert_eq!(found.uuid, MAIN_CONFIG_UUID);

        let err = find_config_characteristic(vec![characteristic(other)]).unwrap_err();
        assert!(matches!(err, Error::CharacteristicNotFound { .. }));
    }

    #[tokio::test]
    async fn test_failed_setup_disconnects() {
        let disconnects = AtomicUsize::new(0);
        let disconnect = async {
            disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        };

        let result: Result<()> = or_disconnect(
            Err(Error::CharacteristicNotFound {
                uuid: MAIN_CONFIG_UUID.to_string(),
            }),
            disconnect,
        )
        .await;

        assert!(matches!(result, Err(Error::CharacteristicNotFound { .. })));
        assert_eq!(disconnects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_disconnect_keeps_setup_error() {
        let result: Result<()> = or_disconnect(
            Err(Error::Timeout {
                operation: TransportOp::Connect,
            }),
            async {
                Err(Error::Timeout {
                    operation: TransportOp::Disconnect,
                })
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(Error::Timeout {
                operation: TransportOp::Connect
            })
        ));
    }

    #[tokio::test]
    async fn test_successful_setup_stays_connected() {
        let disconnects = AtomicUsize::new(0);
        let result = or_disconnect(Ok(7), async {
            disconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(disconnects.load(Ordering::SeqCst), 0);
    }
}
