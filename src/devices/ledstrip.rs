//! RGBW ledstrip running the lissabon ledstrip firmware.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{DeviceError, IotsaModule, LightOutput};
use crate::color::Rgbw;
use crate::iotsa::IotsaDevice;

/// How long the strip is asked to stay awake while calibrating.
pub const POSTPONE_SLEEP_MILLIS: u64 = 120_000;

/// Colorspace settings reported by the strip.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LedstripInfo {
    pub white_temperature: Option<f64>,
    pub white_brightness: Option<f64>,
    pub max_level_correct_color: Option<f64>,
    pub in_calibration_mode: Option<i64>,
}

/// An iotsa ledstrip in calibration mode.
///
/// While open, the strip shows exactly the `calibrationData` it was last
/// given and its battery sleep is postponed.
pub struct Ledstrip {
    device: IotsaDevice,
}

#[async_trait]
impl IotsaModule for Ledstrip {
    const KIND: &'static str = "Ledstrip";

    fn from_device(device: IotsaDevice) -> Self {
        Self { device }
    }

    fn device(&self) -> &IotsaDevice {
        &self.device
    }

    /// Keep the strip from going to sleep during a run.
    async fn post_open(&self) -> Result<(), DeviceError> {
        self.device
            .set("battery", "postponeSleep", POSTPONE_SLEEP_MILLIS)
            .await?;
        Ok(())
    }

    async fn pre_close(&self) -> Result<(), DeviceError> {
        self.device.set("ledstrip", "inCalibrationMode", 0).await?;
        Ok(())
    }

    /// Let the strip sleep again.
    async fn post_close(&self) -> Result<(), DeviceError> {
        self.device.set("battery", "postponeSleep", 0).await?;
        Ok(())
    }
}

impl Ledstrip {
    /// Read the strip's colorspace settings.
    pub async fn info(&self) -> Result<LedstripInfo, DeviceError> {
        Ok(self.device.get("ledstrip").await?)
    }

    /// Show `color` on the whole strip.
    ///
    /// Channels are clipped to `[0, 1]`. A failed request is retried once.
    pub async fn set_color(&self, color: Rgbw) -> Result<(), DeviceError> {
        let body = json!({
            "calibrationData": color.to_array(),
            "inCalibrationMode": 1,
        });

        if let Err(e) = self.device.set_many("ledstrip", &body).await {
            tracing::warn!("{}: set color failed ({}), retrying", self.hostname(), e);
            self.device.set_many("ledstrip", &body).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl LightOutput for Ledstrip {
    async fn set_color(&self, color: Rgbw) -> Result<(), DeviceError> {
        Ledstrip::set_color(self, color).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iotsa::stub::StubServer;
    use crate::iotsa::IotsaConfig;
    use serde_json::Value;

    fn body(json: &str) -> Value {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_open_postpones_sleep() {
        let server = StubServer::start(|_, _| (200, "{}".to_string())).await;
        let config = IotsaConfig::default().with_port(server.port);
        let _strip = Ledstrip::open("127.0.0.1", config).await.unwrap();

        let requests = server.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].path, "/api/battery");
        assert_eq!(body(&requests[1].body), json!({"postponeSleep": 120000}));
    }

    #[tokio::test]
    async fn test_set_color_clips_channels() {
        let server = StubServer::start(|_, _| (200, "{}".to_string())).await;
        let config = IotsaConfig::default().with_port(server.port);
        let strip = Ledstrip::open("127.0.0.1", config).await.unwrap();

        strip
            .set_color(Rgbw::new(1.5, -0.2, 0.5, 0.25))
            .await
            .unwrap();

        let requests = server.requests();
        let put = requests.last().unwrap();
        assert_eq!(put.path, "/api/ledstrip");
        assert_eq!(
            body(&put.body),
            json!({"calibrationData": [1.0, 0.0, 0.5, 0.25], "inCalibrationMode": 1})
        );
    }

    #[tokio::test]
    async fn test_set_color_retries_once() {
        // Requests 0 and 1 belong to open(); the first ledstrip PUT fails
        let server = StubServer::start(|_, index| {
            if index == 2 {
                (500, "busy".to_string())
            } else {
                (200, "{}".to_string())
            }
        })
        .await;
        let config = IotsaConfig::default().with_port(server.port);
        let strip = Ledstrip::open("127.0.0.1", config).await.unwrap();

        strip.set_color(Rgbw::white(0.5)).await.unwrap();

        let puts: Vec<_> = server
            .requests()
            .into_iter()
            .filter(|r| r.path == "/api/ledstrip")
            .collect();
        assert_eq!(puts.len(), 2);
        assert_eq!(puts[0].body, puts[1].body);
    }

    #[tokio::test]
    async fn test_set_color_gives_up_after_one_retry() {
        let server = StubServer::start(|request, _| {
            if request.path == "/api/ledstrip" {
                (503, "down".to_string())
            } else {
                (200, "{}".to_string())
            }
        })
        .await;
        let config = IotsaConfig::default().with_port(server.port);
        let strip = Ledstrip::open("127.0.0.1", config).await.unwrap();

        let err = strip.set_color(Rgbw::white(0.5)).await.unwrap_err();
        assert!(!err.is_open_failure());

        let attempts = server
            .requests()
            .iter()
            .filter(|r| r.path == "/api/ledstrip")
            .count();
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_info_and_close() {
        let server = StubServer::start(|request, _| {
            if request.method == "GET" && request.path == "/api/ledstrip" {
                (
                    200,
                    r#"{"whiteTemperature": 3800, "whiteBrightness": 0.9, "isOn": true}"#
                        .to_string(),
                )
            } else {
                (200, "{}".to_string())
            }
        })
        .await;
        let config = IotsaConfig::default().with_port(server.port);
        let strip = Ledstrip::open("127.0.0.1", config).await.unwrap();

        let info = strip.info().await.unwrap();
        assert_eq!(info.white_temperature, Some(3800.0));
        assert_eq!(info.white_brightness, Some(0.9));
        assert_eq!(info.max_level_correct_color, None);

        strip.close().await.unwrap();
        let requests = server.requests();
        let n = requests.len();
        assert_eq!(body(&requests[n - 2].body), json!({"inCalibrationMode": 0}));
        assert_eq!(body(&requests[n - 1].body), json!({"postponeSleep": 0}));
    }
}
