//! RGBW light sensor.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DeviceError, IotsaModule, LightMeter};
use crate::iotsa::IotsaDevice;

/// One reading of the sensor's `rgbw` module.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorReading {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub w: f64,
    pub lux: f64,
    pub cct: f64,
}

impl SensorReading {
    /// Column names in CSV order.
    pub const FIELDS: [&'static str; 6] = ["r", "g", "b", "w", "lux", "cct"];

    /// Look up a reading by its field name.
    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "r" => Some(self.r),
            "g" => Some(self.g),
            "b" => Some(self.b),
            "w" => Some(self.w),
            "lux" => Some(self.lux),
            "cct" => Some(self.cct),
            _ => None,
        }
    }

    /// All fields as `(name, value)` pairs.
    pub fn fields(&self) -> [(&'static str, f64); 6] {
        [
            ("r", self.r),
            ("g", self.g),
            ("b", self.b),
            ("w", self.w),
            ("lux", self.lux),
            ("cct", self.cct),
        ]
    }
}

/// An iotsa RGBW light sensor.
pub struct Sensor {
    device: IotsaDevice,
}

/// The sensor needs no setup beyond the accessibility check.
impl IotsaModule for Sensor {
    const KIND: &'static str = "Sensor";

    fn from_device(device: IotsaDevice) -> Self {
        Self { device }
    }

    fn device(&self) -> &IotsaDevice {
        &self.device
    }
}

impl Sensor {
    /// Current reading.
    pub async fn get(&self) -> Result<SensorReading, DeviceError> {
        Ok(self.device.get("rgbw").await?)
    }

    /// Raw `rgbw` module properties, including any the reading does not model.
    pub async fn get_all(&self) -> Result<Map<String, Value>, DeviceError> {
        Ok(self.device.get_all("rgbw").await?)
    }
}

#[async_trait]
impl LightMeter for Sensor {
    async fn measure(&self) -> Result<SensorReading, DeviceError> {
        self.get().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iotsa::stub::StubServer;
    use crate::iotsa::IotsaConfig;

    #[test]
    fn test_reading_defaults_missing_fields() {
        let reading: SensorReading =
            serde_json::from_str(r#"{"lux": 12.5, "cct": 2900, "unknown": "x"}"#).unwrap();
        assert_eq!(reading.lux, 12.5);
        assert_eq!(reading.cct, 2900.0);
        assert_eq!(reading.r, 0.0);
    }

    #[test]
    fn test_reading_field_lookup() {
        let reading = SensorReading {
            r: 1.0,
            g: 2.0,
            b: 3.0,
            w: 4.0,
            lux: 5.0,
            cct: 6.0,
        };
        assert_eq!(reading.get("w"), Some(4.0));
        assert_eq!(reading.get("cct"), Some(6.0));
        assert_eq!(reading.get("x"), None);
        let names: Vec<_> = reading.fields().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, SensorReading::FIELDS);
    }

    #[tokio::test]
    async fn test_get_reads_rgbw_module() {
        let server = StubServer::start(|request, _| {
            if request.path == "/api/rgbw" {
                (
                    200,
                    r#"{"r": 10, "g": 20, "b": 30, "w": 40, "lux": 120.5, "cct": 3200}"#
                        .to_string(),
                )
            } else {
                (200, "{}".to_string())
            }
        })
        .await;
        let config = IotsaConfig::default().with_port(server.port);
        let sensor = Sensor::open("127.0.0.1", config).await.unwrap();

        let reading = sensor.measure().await.unwrap();
        assert_eq!(reading.g, 20.0);
        assert_eq!(reading.lux, 120.5);
        assert_eq!(reading.cct, 3200.0);

        let raw = sensor.get_all().await.unwrap();
        assert_eq!(raw.len(), 6);

        // Only the accessibility check and the two reads; closing is local
        sensor.close().await.unwrap();
        let paths: Vec<_> = server.requests().into_iter().map(|r| r.path).collect();
        assert_eq!(paths, vec!["/api/config", "/api/rgbw", "/api/rgbw"]);
    }
}
