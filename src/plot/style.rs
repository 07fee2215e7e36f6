//! Shared plot styling: fonts, series colors, markers and the bitmap
//! rendering entry point.

use std::error::Error;

use image::{Rgb, RgbImage};
use once_cell::sync::Lazy;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use super::{PlotError, PlotOptions};

/// Family name of the embedded font; also what plotters uses when no
/// family is given.
pub(crate) const DEFAULT_FAMILY: &str = "sans-serif";

/// Family name a user-supplied font is registered under.
pub(crate) const CUSTOM_FAMILY: &str = "lissabon-custom";

static EMBEDDED_FONT: &[u8] = include_bytes!("../../resources/DejaVuSans.ttf");

static DEFAULT_FONT: Lazy<Result<(), String>> = Lazy::new(|| {
    register_font(DEFAULT_FAMILY, FontStyle::Normal, EMBEDDED_FONT).map_err(|_| "embedded font is not a valid TTF".to_string())
});

pub(crate) const TITLE_SIZE: i32 = 24;
pub(crate) const LABEL_SIZE: i32 = 15;
pub(crate) const TICK_SIZE: i32 = 13;
pub(crate) const NOTE_SIZE: i32 = 11;

/// Series colors, matplotlib's default cycle.
pub(crate) const PALETTE: [Rgb<u8>; 10] = [
    Rgb([31, 119, 180]),
    Rgb([255, 127, 14]),
    Rgb([44, 160, 44]),
    Rgb([214, 39, 40]),
    Rgb([148, 103, 189]),
    Rgb([140, 86, 75]),
    Rgb([227, 119, 194]),
    Rgb([127, 127, 127]),
    Rgb([188, 189, 34]),
    Rgb([23, 190, 207]),
];

/// Point markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    Plus,
    Star,
    Dot,
}

impl Marker {
    /// Pixel path of the marker centered on `(x, y)`. `None` is the short
    /// line used for legend entries of unmarked series.
    pub(crate) fn path(self, (x, y): (i32, i32)) -> Vec<(i32, i32)> {
        match self {
            Marker::None => vec![(x - 10, y), (x + 10, y)],
            Marker::Plus => vec![(x - 5, y), (x + 5, y), (x, y), (x, y - 5), (x, y + 5)],
            Marker::Star => vec![
                (x - 5, y),
                (x + 5, y),
                (x, y),
                (x, y - 5),
                (x, y + 5),
                (x, y),
                (x - 4, y - 4),
                (x + 4, y + 4),
                (x, y),
                (x - 4, y + 4),
                (x + 4, y - 4),
            ],
            Marker::Dot => vec![(x - 1, y), (x + 1, y)],
        }
    }

    pub(crate) fn style(self, color: RGBColor) -> ShapeStyle {
        match self {
            Marker::Dot => color.stroke_width(6),
            _ => color.stroke_width(1),
        }
    }
}

pub(crate) fn plot_color(color: Rgb<u8>) -> RGBColor {
    RGBColor(color[0], color[1], color[2])
}

pub(crate) fn series_color(index: usize) -> Rgb<u8> {
    PALETTE[index % PALETTE.len()]
}

/// Register the font the plot should use and return its family name.
pub(crate) fn font_family(options: &PlotOptions) -> Result<&'static str, PlotError> {
    DEFAULT_FONT.clone().map_err(PlotError::Font)?;
    let Some(path) = &options.font else {
        return Ok(DEFAULT_FAMILY);
    };
    let data: &'static [u8] = Box::leak(std::fs::read(path)?.into_boxed_slice());
    register_font(CUSTOM_FAMILY, FontStyle::Normal, data)
        .map_err(|_| PlotError::Font(format!("{}: not a valid TTF font", path.display())))?;
    Ok(CUSTOM_FAMILY)
}

/// Draw on a white bitmap of the configured size.
pub(crate) fn render<F>(options: &PlotOptions, draw: F) -> Result<RgbImage, PlotError>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> Result<(), Box<dyn Error>>,
{
    let (width, height) = (options.width, options.height);
    let mut buffer = vec![255u8; width as usize * height as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
        let drawn = root
            .fill(&WHITE)
            .map_err(Box::<dyn Error>::from)
            .and_then(|_| draw(&root))
            .and_then(|_| root.present().map_err(Box::<dyn Error>::from));
        drawn.map_err(|e| PlotError::Draw(e.to_string()))?;
    }
    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| PlotError::Draw(format!("bad buffer for {}x{} image", width, height)))
}

/// Boxed lines of text with the box's bottom-right corner at `corner`.
pub(crate) fn draw_text_box(
    root: &DrawingArea<BitMapBackend<'_>, Shift>,
    lines: &[String],
    corner: (i32, i32),
    family: &str,
) -> Result<(), Box<dyn Error>> {
    if lines.is_empty() {
        return Ok(());
    }
    let style = (family, TICK_SIZE).into_font().color(&BLACK);
    let mut width = 0;
    let mut line_height = 0;
    for line in lines {
        let (w, h) = root.estimate_text_size(line, &style)?;
        width = width.max(w as i32);
        line_height = line_height.max(h as i32 + 3);
    }

    let pad = 6;
    let (x1, y1) = corner;
    let x0 = x1 - width - 2 * pad;
    let y0 = y1 - line_height * lines.len() as i32 - 2 * pad;
    root.draw(&Rectangle::new([(x0, y0), (x1, y1)], WHITE.mix(0.8).filled()))?;
    root.draw(&Rectangle::new([(x0, y0), (x1, y1)], BLACK.stroke_width(1)))?;
    for (i, line) in lines.iter().enumerate() {
        let position = (x0 + pad, y0 + pad + line_height * i as i32);
        root.draw(&Text::new(line.as_str(), position, style.clone()))?;
    }
    Ok(())
}

/// Data range with 5% padding on both sides, widened when degenerate.
pub(crate) fn padded_range(values: impl IntoIterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min.is_finite() {
        return (0.0, 1.0);
    }
    if max - min < f64::EPSILON {
        let half = if min.abs() > 0.0 { min.abs() * 0.1 } else { 0.5 };
        return (min - half, max + half);
    }
    let pad = (max - min) * 0.05;
    (min - pad, max + pad)
}
