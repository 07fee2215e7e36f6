//! Calibration sweeps over a ledstrip and a light sensor.

mod calibrator;

pub use calibrator::{
    CalibrationConfig, CalibrationError, Calibrator, ChannelFactors, Measurement,
    DEFAULT_INTERVAL_SECS, DEFAULT_STEPS,
};
