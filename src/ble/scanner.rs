//! BLE discovery and inspection on the first Bluetooth adapter.

use std::time::Duration;

use btleplug::api::{
    Central, CentralEvent, CharPropFlags, Characteristic, Manager as _, Peripheral as _,
    ScanFilter,
};
use btleplug::platform::{Adapter, Manager, Peripheral};
use futures::future::join_all;
use futures::StreamExt;
use thiserror::Error;
use tokio::time::{timeout, Instant};

use super::model::{
    format_value, settle, BleCharacteristic, BleDevice, BleService, Capabilities, Discovery,
};

/// Default time allowed for connecting to and inspecting one device.
pub const DEFAULT_INSPECT_TIMEOUT_SECS: u64 = 20;

/// Time spent scanning when inspecting devices that are not known yet.
const LOOKUP_SCAN_SECS: u64 = 3;

/// BLE errors that stop a whole run. Per-device failures are stored on the
/// device instead.
#[derive(Error, Debug)]
pub enum BleError {
    #[error("Bluetooth error: {0}")]
    Btle(#[from] btleplug::Error),
    #[error("No Bluetooth adapter found")]
    NoAdapter,
}

/// The first Bluetooth adapter and the peripherals it reported.
pub struct Bluetooth {
    adapter: Adapter,
}

impl Bluetooth {
    pub async fn new() -> Result<Self, BleError> {
        let manager = Manager::new().await?;
        let adapter = manager
            .adapters()
            .await?
            .into_iter()
            .next()
            .ok_or(BleError::NoAdapter)?;
        if let Ok(info) = adapter.adapter_info().await {
            tracing::debug!("Using adapter {}", info);
        }
        Ok(Self { adapter })
    }

    /// Scan for `duration`, logging every detection, then collect what the
    /// adapter found. With `filter`, only named devices are kept.
    pub async fn discover(&self, duration: Duration, filter: bool) -> Result<Discovery, BleError> {
        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let deadline = Instant::now() + duration;
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.next()).await {
            if let CentralEvent::DeviceDiscovered(id) = event {
                if let Ok(peripheral) = self.adapter.peripheral(&id).await {
                    let (name, services) = match peripheral.properties().await {
                        Ok(Some(props)) => (props.local_name, props.services),
                        _ => (None, Vec::new()),
                    };
                    println!(
                        "discovered {} {} {:?}",
                        name.as_deref().unwrap_or("-"),
                        peripheral.address(),
                        services
                    );
                }
            }
        }
        self.adapter.stop_scan().await?;

        let devices = self.known_devices().await?;
        let discovery = Discovery::from_devices(devices, filter);
        tracing::info!(
            "Discovery: {} devices, {} after filtering",
            discovery.raw_count,
            discovery.len()
        );
        Ok(discovery)
    }

    /// Devices for explicit addresses. Addresses the adapter does not know
    /// yet trigger one short scan; addresses still unknown after that are
    /// reported with an error.
    pub async fn lookup(&self, addresses: &[String]) -> Result<Discovery, BleError> {
        let mut known = self.known_devices().await?;
        let missing = |known: &[BleDevice]| {
            addresses
                .iter()
                .any(|a| !known.iter().any(|d| d.address.eq_ignore_ascii_case(a)))
        };
        if missing(&known) {
            self.adapter.start_scan(ScanFilter::default()).await?;
            tokio::time::sleep(Duration::from_secs(LOOKUP_SCAN_SECS)).await;
            self.adapter.stop_scan().await?;
            known = self.known_devices().await?;
        }

        let devices = addresses
            .iter()
            .map(|address| {
                known
                    .iter()
                    .find(|d| d.address.eq_ignore_ascii_case(address))
                    .cloned()
                    .unwrap_or_else(|| {
                        let mut device = BleDevice::new(None, address.clone());
                        device.set_not_found();
                        device
                    })
            })
            .map(|d| {
                // Explicit addresses stay keyed by address
                BleDevice { name: None, ..d }
            })
            .collect();
        Ok(Discovery::from_devices(devices, false))
    }

    async fn known_devices(&self) -> Result<Vec<BleDevice>, BleError> {
        let mut devices = Vec::new();
        for peripheral in self.adapter.peripherals().await? {
            let name = match peripheral.properties().await {
                Ok(Some(props)) => props.local_name,
                _ => None,
            };
            devices.push(BleDevice::new(name, peripheral.address().to_string()));
        }
        Ok(devices)
    }

    async fn find(&self, address: &str) -> Result<Option<Peripheral>, BleError> {
        Ok(self
            .adapter
            .peripherals()
            .await?
            .into_iter()
            .find(|p| p.address().to_string().eq_ignore_ascii_case(address)))
    }

    /// Inspect all devices concurrently. A device that fails, times out or
    /// is no longer known to the adapter gets the error text stored; the
    /// others are unaffected.
    pub async fn inspect_all(
        &self,
        discovery: &mut Discovery,
        read_values: bool,
        limit: Duration,
    ) -> Result<(), BleError> {
        let mut tasks = Vec::new();
        let mut lost = Vec::new();
        for (key, device) in &discovery.devices {
            if device.error.is_some() {
                continue;
            }
            let Some(peripheral) = self.find(&device.address).await? else {
                lost.push(key.clone());
                continue;
            };
            let key = key.clone();
            tasks.push(async move {
                println!("+ get services: start {}", key);
                let result = settle(timeout(limit, inspect(&peripheral, read_values)).await);
                let _ = peripheral.disconnect().await;
                println!("+ get services: done {}", key);
                (key, result)
            });
        }

        for key in lost {
            tracing::warn!("{} disappeared before inspection", key);
            if let Some(device) = discovery.devices.get_mut(&key) {
                device.set_not_found();
            }
        }

        for (key, result) in join_all(tasks).await {
            if let Err(e) = &result {
                tracing::warn!("Inspecting {} failed: {}", key, e);
            }
            if let Some(device) = discovery.devices.get_mut(&key) {
                device.set_inspection(result);
            }
        }
        Ok(())
    }
}

/// Connect, discover services and optionally read every readable characteristic.
async fn inspect(peripheral: &Peripheral, read_values: bool) -> Result<Vec<BleService>, btleplug::Error> {
    if !peripheral.is_connected().await? {
        peripheral.connect().await?;
    }
    peripheral.discover_services().await?;

    let mut services = Vec::new();
    for service in peripheral.services() {
        let mut characteristics = Vec::new();
        for characteristic in &service.characteristics {
            let mut c = BleCharacteristic::new(
                characteristic.uuid,
                capabilities(characteristic.properties),
            );
            if read_values && c.can_read() {
                c.value = Some(read(peripheral, characteristic).await);
            }
            characteristics.push(c);
        }
        services.push(BleService::new(service.uuid, characteristics));
    }
    Ok(services)
}

/// Read a characteristic; failures come back as `Error: ...` text.
async fn read(peripheral: &Peripheral, characteristic: &Characteristic) -> String {
    let limit = Duration::from_secs(DEFAULT_INSPECT_TIMEOUT_SECS);
    match settle(timeout(limit, peripheral.read(characteristic)).await) {
        Ok(bytes) => format_value(&bytes),
        Err(e) => format!("Error: {}", e),
    }
}

fn capabilities(flags: CharPropFlags) -> Capabilities {
    Capabilities {
        read: flags.contains(CharPropFlags::READ),
        write: flags.intersects(CharPropFlags::WRITE | CharPropFlags::WRITE_WITHOUT_RESPONSE),
        notify: flags.contains(CharPropFlags::NOTIFY),
        indicate: flags.contains(CharPropFlags::INDICATE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_from_flags() {
        let caps = capabilities(CharPropFlags::READ | CharPropFlags::NOTIFY);
        assert_eq!(
            caps,
            Capabilities {
                read: true,
                notify: true,
                ..Default::default()
            }
        );
        assert!(capabilities(CharPropFlags::WRITE_WITHOUT_RESPONSE).write);
        assert!(capabilities(CharPropFlags::INDICATE).indicate);
    }
}
