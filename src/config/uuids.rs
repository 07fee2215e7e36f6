//! Names of the BLE services and characteristics iotsa and lissabon devices expose.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use uuid::Uuid;

pub const LISSABON_SERVICE: &str = "6b2f0001-38bc-4204-a506-1d3546ad3688";
pub const LISSABON_IS_ON: &str = "6b2f0002-38bc-4204-a506-1d3546ad3688";
pub const LISSABON_IDENTIFY: &str = "6b2f0003-38bc-4204-a506-1d3546ad3688";
pub const LISSABON_BRIGHTNESS: &str = "6b2f0004-38bc-4204-a506-1d3546ad3688";
pub const LISSABON_TEMPERATURE: &str = "6b2f0005-38bc-4204-a506-1d3546ad3688";

/// Mapping from UUID to a human-readable description.
pub static UUID_NAMES: Lazy<HashMap<Uuid, &'static str>> = Lazy::new(|| {
    let entries = [
        // iotsa RGB LED
        ("3b000001-1226-4a53-9d24-afa50c0163a3", "iotsa RGB LED service"),
        ("3b000002-1226-4a53-9d24-afa50c0163a3", "iotsa RGB LED value"),
        // iotsa battery extras
        ("e4d90002-250f-46e6-90a4-ab98f01a0587", "iotsa USB voltage level"),
        ("e4d90003-250f-46e6-90a4-ab98f01a0587", "iotsa soft reboot"),
        // Lissabon lighting
        (LISSABON_SERVICE, "iotsa/lissabon lighting service"),
        (LISSABON_IS_ON, "iotsa/lissabon light on"),
        (LISSABON_IDENTIFY, "iotsa/lissabon identify fixture"),
        (LISSABON_BRIGHTNESS, "iotsa/lissabon brightness"),
        (LISSABON_TEMPERATURE, "iotsa/lissabon temperature"),
        // Standard services the devices also expose
        ("00001800-0000-1000-8000-00805f9b34fb", "Generic Access"),
        ("00001801-0000-1000-8000-00805f9b34fb", "Generic Attribute"),
        ("0000180f-0000-1000-8000-00805f9b34fb", "Battery Service"),
        ("00002a00-0000-1000-8000-00805f9b34fb", "Device Name"),
        ("00002a19-0000-1000-8000-00805f9b34fb", "Battery Level"),
    ];

    let mut m = HashMap::new();
    for (uuid, name) in entries {
        if let Ok(uuid) = Uuid::parse_str(uuid) {
            m.insert(uuid, name);
        }
    }
    m
});

/// Description of a known UUID.
pub fn describe(uuid: &Uuid) -> Option<&'static str> {
    UUID_NAMES.get(uuid).copied()
}

/// The lissabon lighting service UUID.
pub fn lissabon_service() -> Uuid {
    Uuid::parse_str(LISSABON_SERVICE).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_entries_parse() {
        assert_eq!(UUID_NAMES.len(), 14);
    }

    #[test]
    fn test_describe() {
        let uuid = Uuid::parse_str("6B2F0004-38BC-4204-A506-1D3546AD3688").unwrap();
        assert_eq!(describe(&uuid), Some("iotsa/lissabon brightness"));
        assert_eq!(describe(&lissabon_service()), Some("iotsa/lissabon lighting service"));
        assert_eq!(describe(&Uuid::nil()), None);
    }
}
