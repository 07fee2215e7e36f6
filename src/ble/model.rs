//! What discovery and inspection found, independent of the BLE backend.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use uuid::Uuid;

use crate::config::describe;

/// Error stored on a device the adapter does not know (any more).
pub const DEVICE_NOT_FOUND: &str = "Device not found";

/// Characteristic capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub read: bool,
    pub write: bool,
    pub notify: bool,
    pub indicate: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BleCharacteristic {
    pub uuid: Uuid,
    pub capabilities: Capabilities,
    /// Value read during inspection: the formatted bytes or `Error: ...`.
    pub value: Option<String>,
}

impl BleCharacteristic {
    pub fn new(uuid: Uuid, capabilities: Capabilities) -> Self {
        Self {
            uuid,
            capabilities,
            value: None,
        }
    }

    /// Description when the UUID is known, else the UUID itself.
    pub fn id(&self) -> String {
        display_id(&self.uuid)
    }

    pub fn can_read(&self) -> bool {
        self.capabilities.read
    }

    pub fn can_write(&self) -> bool {
        self.capabilities.write
    }

    pub fn can_notify(&self) -> bool {
        self.capabilities.notify
    }

    pub fn can_indicate(&self) -> bool {
        self.capabilities.indicate
    }

    /// `"can read write"` style summary.
    pub fn capability_summary(&self) -> String {
        let names = [
            (self.can_read(), "read"),
            (self.can_write(), "write"),
            (self.can_notify(), "notify"),
            (self.can_indicate(), "indicate"),
        ];
        let present: Vec<&str> = names.iter().filter(|(on, _)| *on).map(|(_, n)| *n).collect();
        format!("can {}", present.join(" "))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BleService {
    pub uuid: Uuid,
    pub characteristics: BTreeMap<String, BleCharacteristic>,
}

impl BleService {
    pub fn new(uuid: Uuid, characteristics: impl IntoIterator<Item = BleCharacteristic>) -> Self {
        Self {
            uuid,
            characteristics: characteristics.into_iter().map(|c| (c.id(), c)).collect(),
        }
    }

    pub fn id(&self) -> String {
        display_id(&self.uuid)
    }
}

/// A peripheral seen during discovery, plus whatever inspection found.
#[derive(Debug, Clone, PartialEq)]
pub struct BleDevice {
    pub name: Option<String>,
    pub address: String,
    pub services: BTreeMap<String, BleService>,
    /// Why inspection failed: `Timeout` or the BLE error text.
    pub error: Option<String>,
}

impl BleDevice {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name,
            address: address.into(),
            services: BTreeMap::new(),
            error: None,
        }
    }

    /// Discovery key: the name when there is one, else the address.
    pub fn key(&self) -> String {
        match &self.name {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.address.clone(),
        }
    }

    pub fn has_name(&self) -> bool {
        is_named(self.name.as_deref())
    }

    /// Mark a device that cannot be inspected because the adapter lost it.
    pub fn set_not_found(&mut self) {
        self.set_inspection(Err(DEVICE_NOT_FOUND.to_string()));
    }

    /// Store an inspection outcome; failures become the device's error string.
    pub fn set_inspection(&mut self, result: Result<Vec<BleService>, String>) {
        match result {
            Ok(services) => {
                self.error = None;
                self.services = services.into_iter().map(|s| (s.id(), s)).collect();
            }
            Err(error) => {
                self.error = Some(error);
                self.services.clear();
            }
        }
    }
}

/// Named devices, excluding the placeholder name some stacks report.
pub fn is_named(name: Option<&str>) -> bool {
    matches!(name, Some(n) if !n.is_empty() && n != "Unknown")
}

/// Discovered devices keyed by [`BleDevice::key`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Discovery {
    /// Number of devices seen before filtering.
    pub raw_count: usize,
    pub devices: BTreeMap<String, BleDevice>,
}

impl Discovery {
    /// Build from everything seen; with `filter`, keep named devices only.
    pub fn from_devices(devices: Vec<BleDevice>, filter: bool) -> Self {
        let raw_count = devices.len();
        let devices = devices
            .into_iter()
            .filter(|d| !filter || d.has_name())
            .map(|d| (d.key(), d))
            .collect();
        Self { raw_count, devices }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Indented tree of devices, services and characteristics.
    pub fn dump(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} devices:", self.devices.len())?;
        for (key, device) in &self.devices {
            writeln!(f, "- Entry {}:", key)?;
            write!(
                f,
                "\tDevice {} {}",
                device.name.as_deref().unwrap_or("-"),
                device.address
            )?;
            if let Some(error) = &device.error {
                write!(f, " {}", error)?;
            }
            writeln!(f, ":")?;
            for (service_id, service) in &device.services {
                writeln!(f, "\t- Service {} ({}):", service_id, service.uuid)?;
                for (id, characteristic) in &service.characteristics {
                    writeln!(f, "\t\t- {}: {}", id, characteristic.capability_summary())?;
                    if let Some(value) = &characteristic.value {
                        writeln!(f, "\t\t\t{}", value)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Collapse a timed-out or failed BLE operation into the error text we store.
pub fn settle<T, E: fmt::Display, L>(result: Result<Result<T, E>, L>) -> Result<T, String> {
    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("Timeout".to_string()),
    }
}

/// Bytes as hex, followed by the text when they are printable UTF-8.
pub fn format_value(bytes: &[u8]) -> String {
    let mut out = String::new();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{:02x}", b);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        if !text.is_empty() && text.chars().all(|c| !c.is_control()) {
            let _ = write!(out, " \"{}\"", text);
        }
    }
    out
}

fn display_id(uuid: &Uuid) -> String {
    describe(uuid)
        .map(str::to_string)
        .unwrap_or_else(|| uuid.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{lissabon_service, LISSABON_BRIGHTNESS};

    fn brightness() -> BleCharacteristic {
        let mut c = BleCharacteristic::new(
            Uuid::parse_str(LISSABON_BRIGHTNESS).unwrap(),
            Capabilities {
                read: true,
                write: true,
                ..Default::default()
            },
        );
        c.value = Some(format_value(&[0x80]));
        c
    }

    #[test]
    fn test_filter_keeps_named_devices() {
        let devices = vec![
            BleDevice::new(Some("lissabon-kitchen".to_string()), "AA:BB:CC:00:00:01"),
            BleDevice::new(Some("Unknown".to_string()), "AA:BB:CC:00:00:02"),
            BleDevice::new(None, "AA:BB:CC:00:00:03"),
        ];
        let filtered = Discovery::from_devices(devices.clone(), true);
        assert_eq!(filtered.raw_count, 3);
        assert_eq!(filtered.len(), 1);
        assert!(filtered.devices.contains_key("lissabon-kitchen"));

        let all = Discovery::from_devices(devices, false);
        assert_eq!(all.len(), 3);
        assert!(all.devices.contains_key("AA:BB:CC:00:00:03"));
    }

    #[test]
    fn test_capabilities() {
        let c = brightness();
        assert!(c.can_read() && c.can_write());
        assert!(!c.can_notify() && !c.can_indicate());
        assert_eq!(c.capability_summary(), "can read write");
        assert_eq!(c.id(), "iotsa/lissabon brightness");
    }

    #[test]
    fn test_unknown_uuid_uses_uuid_as_id() {
        let uuid = Uuid::parse_str("12345678-1234-5678-1234-567812345678").unwrap();
        let c = BleCharacteristic::new(uuid, Capabilities::default());
        assert_eq!(c.id(), "12345678-1234-5678-1234-567812345678");
        assert_eq!(c.capability_summary(), "can ");
    }

    #[test]
    fn test_settle() {
        assert_eq!(settle::<u8, String, ()>(Ok(Ok(3))), Ok(3));
        assert_eq!(
            settle::<u8, String, ()>(Ok(Err("Device not found".to_string()))),
            Err("Device not found".to_string())
        );
        assert_eq!(settle::<u8, String, ()>(Err(())), Err("Timeout".to_string()));
    }

    #[test]
    fn test_set_inspection() {
        let mut device = BleDevice::new(Some("strip".to_string()), "AA");
        device.set_inspection(Err("Timeout".to_string()));
        assert_eq!(device.error.as_deref(), Some("Timeout"));

        let service = BleService::new(lissabon_service(), [brightness()]);
        device.set_inspection(Ok(vec![service]));
        assert!(device.error.is_none());
        assert!(device.services.contains_key("iotsa/lissabon lighting service"));
    }

    #[test]
    fn test_lost_device_reports_not_found() {
        let mut lost = BleDevice::new(Some("strip".to_string()), "AA:BB");
        lost.set_inspection(Ok(vec![BleService::new(lissabon_service(), [brightness()])]));
        lost.set_not_found();
        assert_eq!(lost.error.as_deref(), Some("Device not found"));
        assert!(lost.services.is_empty());

        let discovery = Discovery::from_devices(vec![lost], false);
        assert_eq!(
            discovery.dump().lines().nth(2),
            Some("\tDevice strip AA:BB Device not found:")
        );
    }

    #[test]
    fn test_format_value() {
        assert_eq!(format_value(&[0x01, 0xff]), "01 ff");
        assert_eq!(format_value(b"ok"), "6f 6b \"ok\"");
        assert_eq!(format_value(&[]), "");
    }

    #[test]
    fn test_dump() {
        let mut device = BleDevice::new(Some("strip".to_string()), "AA:BB");
        device.set_inspection(Ok(vec![BleService::new(lissabon_service(), [brightness()])]));
        let mut failed = BleDevice::new(Some("sensor".to_string()), "CC:DD");
        failed.set_inspection(Err("Timeout".to_string()));

        let discovery = Discovery::from_devices(vec![device, failed], true);
        let dump = discovery.dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines[0], "2 devices:");
        assert_eq!(lines[1], "- Entry sensor:");
        assert_eq!(lines[2], "\tDevice sensor CC:DD Timeout:");
        assert_eq!(lines[3], "- Entry strip:");
        assert_eq!(
            lines[5],
            "\t- Service iotsa/lissabon lighting service (6b2f0001-38bc-4204-a506-1d3546ad3688):"
        );
        assert_eq!(lines[6], "\t\t- iotsa/lissabon brightness: can read write");
        assert_eq!(lines[7], "\t\t\t80");
    }
}
