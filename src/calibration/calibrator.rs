//! Calibration sweeps.
//!
//! A sweep steps a requested value (intensity or color temperature) through
//! a range. For every step the ledstrip is set, the light is given time to
//! settle, and the sensor is read. Four measurements are available:
//! - **White**: the white channel alone, recording the full sensor reading
//! - **RgbwLux**: RGB-only, W-only and an even RGBW mix at the same request
//! - **Channels**: each of R, G, B and W on its own
//! - **Temperature**: a color temperature sweep, RGB mix vs transfer-to-white

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::Local;
use thiserror::Error;
use tokio::time::sleep;

use crate::color::{gamma, kelvin_to_rgb, Colorspace, Rgbw};
use crate::data::{Record, Table};
use crate::devices::{DeviceError, LightMeter, LightOutput, SensorReading};

/// Default number of steps between 0 and 1 (inclusive endpoints give 17 records).
pub const DEFAULT_STEPS: usize = 16;

/// Default settling time between setting a color and reading the sensor.
pub const DEFAULT_INTERVAL_SECS: f64 = 1.0;

/// Calibration errors.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// What a sweep measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Measurement {
    #[default]
    White,
    RgbwLux,
    Channels,
    Temperature,
}

impl Measurement {
    pub fn as_str(&self) -> &'static str {
        match self {
            Measurement::White => "white",
            Measurement::RgbwLux => "rgbw-lux",
            Measurement::Channels => "channels",
            Measurement::Temperature => "temperature",
        }
    }

    /// CSV columns produced by this measurement, in order.
    pub fn keys(&self) -> &'static [&'static str] {
        match self {
            Measurement::White => &["w_req", "r", "g", "b", "w", "lux", "cct"],
            Measurement::RgbwLux => &[
                "requested",
                "w_white",
                "rgb_white",
                "rgbw_white",
                "rgb_r",
                "rgb_g",
                "rgb_b",
                "w_lux",
                "rgb_lux",
                "rgbw_lux",
                "w_cct",
                "rgb_cct",
                "rgbw_cct",
            ],
            Measurement::Channels => &[
                "requested", "r_lux", "g_lux", "b_lux", "w_lux", "r_raw", "g_raw", "b_raw",
                "w_raw",
            ],
            Measurement::Temperature => &[
                "requested",
                "rgb_lux",
                "rgb_cct",
                "rgbw_lux",
                "rgbw_cct",
                "rgbw_w",
            ],
        }
    }

    /// Default x and y columns when plotting this measurement.
    pub fn plot_columns(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            Measurement::White => ("w_req", &["lux"]),
            Measurement::RgbwLux => ("requested", &["w_lux", "rgb_lux", "rgbw_lux"]),
            Measurement::Channels => ("requested", &["r_lux", "g_lux", "b_lux", "w_lux"]),
            Measurement::Temperature => ("requested", &["rgb_cct", "rgbw_cct"]),
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Measurement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "white" | "w" => Ok(Measurement::White),
            "rgbw-lux" | "rgbw" => Ok(Measurement::RgbwLux),
            "channels" => Ok(Measurement::Channels),
            "temperature" | "cct" => Ok(Measurement::Temperature),
            other => Err(format!(
                "unknown measurement '{}' (expected white, rgbw-lux, channels or temperature)",
                other
            )),
        }
    }
}

/// Settings for a calibration run.
#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    pub measurement: Measurement,
    /// Number of steps; the sweep visits `steps + 1` values.
    pub steps: usize,
    /// Settling time in seconds.
    pub interval_secs: f64,
    pub w_gamma: f64,
    pub rgb_gamma: f64,
    /// Color temperature the RGB channels are mixed to, `None` for equal RGB.
    pub rgb_temperature: Option<f64>,
    /// Brightness of the white LED relative to RGB white.
    pub w_brightness: Option<f64>,
    /// Extra factor on the green channel.
    pub g_hack: Option<f64>,
    /// Extra factor on the blue channel.
    pub b_hack: Option<f64>,
    /// Color temperature of the white LED (temperature sweeps).
    pub white_temperature: f64,
    /// Relative brightness of the white LED (temperature sweeps).
    pub white_brightness: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    /// Fixed brightness of temperature sweeps.
    pub brightness: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            measurement: Measurement::White,
            steps: DEFAULT_STEPS,
            interval_secs: DEFAULT_INTERVAL_SECS,
            w_gamma: 1.0,
            rgb_gamma: 1.0,
            rgb_temperature: None,
            w_brightness: None,
            g_hack: None,
            b_hack: None,
            white_temperature: 4000.0,
            white_brightness: 1.0,
            min_temperature: 2200.0,
            max_temperature: 6500.0,
            brightness: 0.5,
        }
    }
}

impl CalibrationConfig {
    pub fn with_measurement(mut self, measurement: Measurement) -> Self {
        self.measurement = measurement;
        self
    }

    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_interval(mut self, interval_secs: f64) -> Self {
        self.interval_secs = interval_secs;
        self
    }

    pub fn with_gamma(mut self, w_gamma: f64, rgb_gamma: f64) -> Self {
        self.w_gamma = w_gamma;
        self.rgb_gamma = rgb_gamma;
        self
    }

    pub fn with_rgb_temperature(mut self, kelvin: f64) -> Self {
        self.rgb_temperature = Some(kelvin);
        self
    }

    pub fn with_w_brightness(mut self, brightness: f64) -> Self {
        self.w_brightness = Some(brightness);
        self
    }

    pub fn with_hacks(mut self, g_hack: Option<f64>, b_hack: Option<f64>) -> Self {
        self.g_hack = g_hack;
        self.b_hack = b_hack;
        self
    }

    pub fn with_white_led(mut self, temperature: f64, brightness: f64) -> Self {
        self.white_temperature = temperature;
        self.white_brightness = brightness;
        self
    }

    pub fn with_temperature_range(mut self, min: f64, max: f64) -> Self {
        self.min_temperature = min;
        self.max_temperature = max;
        self
    }

    pub fn with_brightness(mut self, brightness: f64) -> Self {
        self.brightness = brightness;
        self
    }

    /// Settling time as a `Duration`. Negative, non-finite and
    /// unrepresentably large intervals are rejected.
    pub fn interval(&self) -> Result<Duration, CalibrationError> {
        Duration::try_from_secs_f64(self.interval_secs).map_err(|_| {
            CalibrationError::InvalidParameter(format!(
                "interval must be a non-negative number of seconds, got {}",
                self.interval_secs
            ))
        })
    }

    /// Check the settings before touching any device.
    pub fn validate(&self) -> Result<(), CalibrationError> {
        if self.steps == 0 {
            return Err(CalibrationError::InvalidParameter(
                "steps must be at least 1".to_string(),
            ));
        }
        self.interval()?;
        if self.w_brightness.is_some_and(|b| b <= 0.0) {
            return Err(CalibrationError::InvalidParameter(
                "w_brightness must be positive".to_string(),
            ));
        }
        if self.measurement == Measurement::Temperature
            && self.min_temperature > self.max_temperature
        {
            return Err(CalibrationError::InvalidParameter(format!(
                "min_temperature {} is above max_temperature {}",
                self.min_temperature, self.max_temperature
            )));
        }
        Ok(())
    }

    /// Per-channel multipliers applied to requested values.
    pub fn factors(&self) -> ChannelFactors {
        let mut factors = ChannelFactors::default();
        if let Some(brightness) = self.w_brightness {
            factors.w = 1.0 / brightness;
        }
        if let Some(kelvin) = self.rgb_temperature {
            let [r, g, b] = kelvin_to_rgb(kelvin);
            factors.r = r;
            factors.g = g;
            factors.b = b;
        }
        if let Some(hack) = self.g_hack {
            factors.g *= hack;
        }
        if let Some(hack) = self.b_hack {
            factors.b *= hack;
        }
        factors
    }

    /// The values a sweep visits: `i / steps` for `i` in `0..=steps`.
    pub fn requested_values(&self) -> Vec<f64> {
        (0..=self.steps)
            .map(|i| i as f64 / self.steps as f64)
            .collect()
    }

    /// Color temperatures a temperature sweep visits.
    pub fn requested_temperatures(&self) -> Vec<f64> {
        let span = self.max_temperature - self.min_temperature;
        self.requested_values()
            .into_iter()
            .map(|f| self.min_temperature + f * span)
            .collect()
    }
}

/// Multipliers for each channel, all 1 unless configured otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelFactors {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub w: f64,
}

impl Default for ChannelFactors {
    fn default() -> Self {
        Self {
            r: 1.0,
            g: 1.0,
            b: 1.0,
            w: 1.0,
        }
    }
}

/// Runs calibration sweeps against a light output and a light meter.
pub struct Calibrator<'a> {
    meter: &'a dyn LightMeter,
    output: &'a dyn LightOutput,
    config: CalibrationConfig,
}

impl<'a> Calibrator<'a> {
    pub fn new(
        meter: &'a dyn LightMeter,
        output: &'a dyn LightOutput,
        config: CalibrationConfig,
    ) -> Self {
        Self {
            meter,
            output,
            config,
        }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Run the configured sweep and return its table, parameters included.
    pub async fn run(&self) -> Result<Table, CalibrationError> {
        self.config.validate()?;
        let factors = self.config.factors();

        println!(
            "\n🎯 Running {} sweep ({} steps, {}s settling)...\n",
            self.config.measurement,
            self.config.steps + 1,
            self.config.interval_secs
        );

        let mut table = Table::new(self.config.measurement.keys());
        match self.config.measurement {
            Measurement::White => self.run_white(&mut table).await?,
            Measurement::RgbwLux => self.run_rgbw_lux(&mut table, &factors).await?,
            Measurement::Channels => self.run_channels(&mut table).await?,
            Measurement::Temperature => self.run_temperature(&mut table).await?,
        }

        self.add_parameters(&mut table, &factors);
        Ok(table)
    }

    /// Set a color, wait for it to settle, and read the sensor.
    async fn step(&self, color: Rgbw) -> Result<SensorReading, CalibrationError> {
        self.output.set_color(color).await?;
        sleep(self.config.interval()?).await;
        let reading = self.meter.measure().await?;
        tracing::debug!("set {:?} -> {:?}", color, reading);
        Ok(reading)
    }

    fn progress(&self, index: usize, requested: f64, record: &Record, lux_key: &str) {
        let value = record.get(lux_key).copied().unwrap_or(f64::NAN);
        tracing::info!(step = index, requested, "{} = {}", lux_key, value);
        println!(
            "📍 Step {}/{}: requested {:.4} -> {} {:.2}",
            index + 1,
            self.config.steps + 1,
            requested,
            lux_key,
            value
        );
    }

    async fn run_white(&self, table: &mut Table) -> Result<(), CalibrationError> {
        for (i, requested) in self.config.requested_values().into_iter().enumerate() {
            let reading = self.step(Rgbw::white(requested)).await?;

            let mut record = Record::new();
            record.insert("w_req".to_string(), requested);
            for (name, value) in reading.fields() {
                record.insert(name.to_string(), value);
            }
            self.progress(i, requested, &record, "lux");
            table.push(record);
        }
        Ok(())
    }

    async fn run_rgbw_lux(
        &self,
        table: &mut Table,
        factors: &ChannelFactors,
    ) -> Result<(), CalibrationError> {
        let rgb_gamma = self.config.rgb_gamma;
        let w_gamma = self.config.w_gamma;

        for (i, requested) in self.config.requested_values().into_iter().enumerate() {
            let mut record = Record::new();
            record.insert("requested".to_string(), requested);

            // RGB only
            let rgb = Rgbw::rgb(
                gamma(requested * factors.r, rgb_gamma),
                gamma(requested * factors.g, rgb_gamma),
                gamma(requested * factors.b, rgb_gamma),
            );
            let reading = self.step(rgb).await?;
            record.insert("rgb_white".to_string(), reading.w);
            record.insert("rgb_lux".to_string(), reading.lux);
            record.insert("rgb_cct".to_string(), reading.cct);
            record.insert("rgb_r".to_string(), reading.r);
            record.insert("rgb_g".to_string(), reading.g);
            record.insert("rgb_b".to_string(), reading.b);

            // W only
            let white = Rgbw::white(gamma(requested * factors.w, w_gamma));
            let reading = self.step(white).await?;
            record.insert("w_white".to_string(), reading.w);
            record.insert("w_lux".to_string(), reading.lux);
            record.insert("w_cct".to_string(), reading.cct);

            // Half from RGB, half from W
            let mix = Rgbw::new(
                gamma(requested * factors.r * 0.5, rgb_gamma),
                gamma(requested * factors.g * 0.5, rgb_gamma),
                gamma(requested * factors.b * 0.5, rgb_gamma),
                gamma(requested * factors.w * 0.5, w_gamma),
            );
            let reading = self.step(mix).await?;
            record.insert("rgbw_white".to_string(), reading.w);
            record.insert("rgbw_lux".to_string(), reading.lux);
            record.insert("rgbw_cct".to_string(), reading.cct);

            self.progress(i, requested, &record, "rgbw_lux");
            table.push(record);
        }
        Ok(())
    }

    async fn run_channels(&self, table: &mut Table) -> Result<(), CalibrationError> {
        let rgb_gamma = self.config.rgb_gamma;
        let w_gamma = self.config.w_gamma;

        for (i, requested) in self.config.requested_values().into_iter().enumerate() {
            let mut record = Record::new();
            record.insert("requested".to_string(), requested);

            let rgb_level = gamma(requested, rgb_gamma);
            let channels = [
                ("r", Rgbw::rgb(rgb_level, 0.0, 0.0)),
                ("g", Rgbw::rgb(0.0, rgb_level, 0.0)),
                ("b", Rgbw::rgb(0.0, 0.0, rgb_level)),
                ("w", Rgbw::white(gamma(requested, w_gamma))),
            ];
            for (name, color) in channels {
                let reading = self.step(color).await?;
                record.insert(format!("{}_lux", name), reading.lux);
                if let Some(raw) = reading.get(name) {
                    record.insert(format!("{}_raw", name), raw);
                }
            }

            self.progress(i, requested, &record, "w_lux");
            table.push(record);
        }
        Ok(())
    }

    async fn run_temperature(&self, table: &mut Table) -> Result<(), CalibrationError> {
        let rgb_gamma = self.config.rgb_gamma;
        let w_gamma = self.config.w_gamma;
        let brightness = self.config.brightness;
        let colorspace =
            Colorspace::new(self.config.white_temperature, self.config.white_brightness);

        for (i, temperature) in self.config.requested_temperatures().into_iter().enumerate() {
            let mut record = Record::new();
            record.insert("requested".to_string(), temperature);

            // RGB mix only; the hacks correct the G and B LEDs
            let [r, g, b] = kelvin_to_rgb(temperature);
            let rgb = Rgbw::rgb(
                gamma(r * brightness, rgb_gamma),
                gamma(g * brightness * self.config.g_hack.unwrap_or(1.0), rgb_gamma),
                gamma(b * brightness * self.config.b_hack.unwrap_or(1.0), rgb_gamma),
            );
            let reading = self.step(rgb).await?;
            record.insert("rgb_lux".to_string(), reading.lux);
            record.insert("rgb_cct".to_string(), reading.cct);

            // Common part moved onto the white LED
            let rgbw = colorspace.to_rgbw(temperature, brightness);
            let color = Rgbw::new(
                gamma(rgbw.r, rgb_gamma),
                gamma(rgbw.g, rgb_gamma),
                gamma(rgbw.b, rgb_gamma),
                gamma(rgbw.w, w_gamma),
            );
            let reading = self.step(color).await?;
            record.insert("rgbw_lux".to_string(), reading.lux);
            record.insert("rgbw_cct".to_string(), reading.cct);
            record.insert("rgbw_w".to_string(), rgbw.w);

            self.progress(i, temperature, &record, "rgbw_cct");
            table.push(record);
        }
        Ok(())
    }

    fn add_parameters(&self, table: &mut Table, factors: &ChannelFactors) {
        let config = &self.config;
        table.set_parameter("measurement", config.measurement.as_str());
        table.set_parameter("interval", config.interval_secs);
        table.set_parameter("w_gamma", config.w_gamma);
        table.set_parameter("rgb_gamma", config.rgb_gamma);
        table.set_parameter("rgb_temperature", config.rgb_temperature);
        table.set_parameter("r_factor", factors.r);
        table.set_parameter("g_factor", factors.g);
        table.set_parameter("b_factor", factors.b);
        table.set_parameter("w_factor", factors.w);
        if config.measurement == Measurement::Temperature {
            table.set_parameter("white_temperature", config.white_temperature);
            table.set_parameter("white_brightness", config.white_brightness);
            table.set_parameter("brightness", config.brightness);
        }
        table.set_parameter("timestamp", Local::now().to_rfc3339());
    }
}
