//! Ledstrip and light sensor devices.
//!
//! The calibrator only talks to the [`LightOutput`] and [`LightMeter`] traits,
//! so sweeps can run against the real iotsa devices or against test doubles.
//! Opening and closing the real devices goes through [`IotsaModule`].

mod ledstrip;
mod module;
mod sensor;

use async_trait::async_trait;
use thiserror::Error;

use crate::color::Rgbw;
use crate::iotsa::IotsaError;

pub use ledstrip::{Ledstrip, LedstripInfo, POSTPONE_SLEEP_MILLIS};
pub use module::IotsaModule;
pub use sensor::{Sensor, SensorReading};

/// Device errors.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error(transparent)]
    Iotsa(#[from] IotsaError),
    #[error("{0}")]
    Other(String),
}

impl DeviceError {
    /// Whether the device could not be opened (DNS or connection failure).
    pub fn is_open_failure(&self) -> bool {
        match self {
            DeviceError::Iotsa(e) => e.is_open_failure(),
            DeviceError::Other(_) => false,
        }
    }
}

/// Something that can be told which color to emit.
#[async_trait]
pub trait LightOutput: Send + Sync {
    async fn set_color(&self, color: Rgbw) -> Result<(), DeviceError>;
}

/// Something that can measure the light it receives.
#[async_trait]
pub trait LightMeter: Send + Sync {
    async fn measure(&self) -> Result<SensorReading, DeviceError>;
}
