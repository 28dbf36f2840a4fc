//! BLE scanning functionality.
//!
//! Provides the btleplug-backed [`Discovery`] used to find kettles.

use async_trait::async_trait;
use btleplug::api::{Central, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager};
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

use crate::ble::link::{DiscoveredDevice, Discovery};
use crate::ble::uuids::{is_kettle_name, is_kettle_service};
use crate::error::{Error, Result};

/// Get the first Bluetooth adapter on this system.
///
/// # Errors
///
/// Returns an error if Bluetooth is not available.
pub async fn default_adapter() -> Result<Adapter> {
    let manager = Manager::new()
        .await
        .map_err(|_e| Error::BluetoothUnavailable)?;

    let adapters = manager.adapters().await.map_err(Error::Bluetooth)?;

    let adapter = adapters
        .into_iter()
        .next()
        .ok_or(Error::BluetoothUnavailable)?;

    info!(
        "Using Bluetooth adapter: {:?}",
        adapter.adapter_info().await.ok()
    );

    Ok(adapter)
}

/// Whether an advertisement passes the filter.
///
/// With a filter only the name counts. Without one, a kettle-like name or
/// an advertised kettle service is enough, so unnamed kettles still show up.
fn advert_matches(name: Option<&str>, services: &[Uuid], filter: Option<&str>) -> bool {
    match (name, filter) {
        (Some(name), Some(filter)) => name.to_lowercase().contains(&filter.to_lowercase()),
        (_, Some(_)) => false,
        (name, None) => name.is_some_and(is_kettle_name) || services.iter().any(is_kettle_service),
    }
}

/// Order devices strongest signal first; devices without RSSI go last.
fn sort_by_signal(devices: &mut [DiscoveredDevice]) {
    devices.sort_by_key(|d| std::cmp::Reverse(d.rssi.unwrap_or(i16::MIN)));
}

/// BLE scanner for discovering kettles.
pub struct BleScanner {
    /// The BLE adapter to use for scanning.
    adapter: Adapter,
}

impl BleScanner {
    /// Create a new BLE scanner on the default adapter.
    ///
    /// # Errors
    ///
    /// Returns an error if Bluetooth is not available.
    pub async fn new() -> Result<Self> {
        Ok(Self::with_adapter(default_adapter().await?))
    }

    /// Create a new BLE scanner with a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self { adapter }
    }

    /// Get the underlying adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Collect matching peripherals the adapter currently knows about.
    async fn collect(&self, name_filter: Option<&str>) -> Result<Vec<DiscoveredDevice>> {
        let mut devices = Vec::new();

        for peripheral in self.adapter.peripherals().await? {
            let properties = match peripheral.properties().await {
                Ok(Some(p)) => p,
                _ => continue,
            };

            if !advert_matches(
                properties.local_name.as_deref(),
                &properties.services,
                name_filter,
            ) {
                trace!("Skipping {:?}", properties.local_name);
                continue;
            }

            devices.push(DiscoveredDevice {
                address: peripheral.address().to_string(),
                name: properties.local_name,
                rssi: properties.rssi,
            });
        }

        sort_by_signal(&mut devices);
        Ok(devices)
    }
}

#[async_trait]
impl Discovery for BleScanner {
    async fn scan(
        &self,
        timeout: Duration,
        name_filter: Option<String>,
    ) -> Result<Vec<DiscoveredDevice>> {
        info!("Scanning for kettles ({:?})", timeout);

        self.adapter
            .start_scan(ScanFilter::default())
            .await
            .map_err(Error::Bluetooth)?;

        tokio::time::sleep(timeout).await;

        if let Err(e) = self.adapter.stop_scan().await {
            warn!("Failed to stop scan: {}", e);
        }

        let devices = self.collect(name_filter.as_deref()).await?;
        debug!("Scan found {} matching devices", devices.len());

        Ok(devices)
    }

    async fn resolve_by_name(&self, name: &str, timeout: Duration) -> Result<String> {
        let devices = self.scan(timeout, Some(name.to_string())).await?;

        match devices.into_iter().next() {
            Some(device) => {
                info!(
                    "Resolved {} to {} ({:?} dBm)",
                    name, device.address, device.rssi
                );
                Ok(device.address)
            }
            None => Err(Error::DeviceNotFound {
                name: name.to_string(),
            }),
        }
    }
}
