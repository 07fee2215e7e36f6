// Copyright 2025 Lissabon contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Lissabon Calibrate
//!
//! Calibration tools for lissabon RGBW LED strips.
//!
//! A calibration run drives an iotsa ledstrip through a sweep of requested
//! intensities or color temperatures while an iotsa RGBW light sensor
//! measures the result. Runs are stored as CSV and can be plotted as line
//! charts or on a CIE 1931 chromaticity diagram. A separate BLE tool finds
//! and inspects lissabon devices.
//!
//! ## Example
//!
//! ```rust,no_run
//! use lissabon_calibrate::calibration::{CalibrationConfig, Calibrator, Measurement};
//! use lissabon_calibrate::devices::{IotsaModule, Ledstrip, Sensor};
//! use lissabon_calibrate::iotsa::IotsaConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let sensor = Sensor::open("sensor.local", IotsaConfig::default()).await?;
//!     let ledstrip = Ledstrip::open("lissabon.local", IotsaConfig::default()).await?;
//!
//!     let config = CalibrationConfig::default()
//!         .with_measurement(Measurement::White)
//!         .with_steps(10);
//!     let table = Calibrator::new(&sensor, &ledstrip, config).run().await?;
//!     table.write_csv("calibration_data.csv")?;
//!
//!     ledstrip.close().await?;
//!     sensor.close().await?;
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod calibration;
pub mod color;
pub mod config;
pub mod data;
pub mod devices;
pub mod iotsa;
pub mod plot;
pub mod settings;

pub use calibration::{CalibrationConfig, CalibrationError, Calibrator, Measurement};
pub use color::{Colorspace, Rgbw};
pub use data::{DataError, Table};
pub use devices::{
    DeviceError, IotsaModule, Ledstrip, LightMeter, LightOutput, Sensor, SensorReading,
};
pub use iotsa::{IotsaConfig, IotsaDevice, IotsaError};
pub use plot::{ChromaticityPlot, PlotError, PlotOptions};
pub use settings::AppSettings;
