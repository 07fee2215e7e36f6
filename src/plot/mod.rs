//! PNG plots of calibration tables, drawn with plotters into an RGB image.
//!
//! Text uses an embedded DejaVu Sans unless [`PlotOptions::with_font`]
//! names another TrueType font.

mod chromaticity;
mod lines;
mod style;

use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbImage};
use thiserror::Error;

pub use chromaticity::{ChromaticityPlot, CHROMATICITY_TITLE, SPECTRAL_LOCUS};
pub use lines::{plot_lines, LINE_PLOT_TITLE};
pub use style::Marker;

/// Plotting errors.
#[derive(Error, Debug)]
pub enum PlotError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid font {0}")]
    Font(String),
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("Column '{0}' not in data")]
    MissingColumn(String),
    #[error("Nothing to plot: {0}")]
    NoData(String),
}

/// Image size and an optional font replacing the embedded one.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub width: u32,
    pub height: u32,
    pub font: Option<PathBuf>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 750,
            font: None,
        }
    }
}

impl PlotOptions {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_font(mut self, font: Option<PathBuf>) -> Self {
        self.font = font;
        self
    }
}

/// Write a plot as PNG, whatever the file extension.
pub fn save_png(image: &RgbImage, path: impl AsRef<Path>) -> Result<(), PlotError> {
    image.save_with_format(path.as_ref(), ImageFormat::Png)?;
    tracing::info!("Saved plot to {}", path.as_ref().display());
    Ok(())
}
