//! BLE discovery and inspection of lissabon and iotsa devices.

mod model;
mod scanner;

pub use model::{
    format_value, is_named, settle, BleCharacteristic, BleDevice, BleService, Capabilities,
    Discovery, DEVICE_NOT_FOUND,
};
pub use scanner::{BleError, Bluetooth, DEFAULT_INSPECT_TIMEOUT_SECS};
