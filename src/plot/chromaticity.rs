//! CIE 1931 xy chromaticity diagram with the Planckian locus.

use image::{Rgb, RgbImage};
use plotters::prelude::*;

use super::style::{
    font_family, plot_color, render, series_color, Marker, LABEL_SIZE, NOTE_SIZE, TICK_SIZE,
    TITLE_SIZE,
};
use super::{PlotError, PlotOptions};
use crate::color::{cct_to_xy, rgb_to_xy, MAX_CCT, MIN_CCT};
use crate::data::Table;
use crate::devices::SensorReading;

pub const CHROMATICITY_TITLE: &str = "CCT color";

/// CIE 1931 2° spectral locus: wavelength (nm), x, y.
pub const SPECTRAL_LOCUS: [(u32, f64, f64); 44] = [
    (380, 0.1741, 0.0050),
    (390, 0.1738, 0.0049),
    (400, 0.1733, 0.0048),
    (410, 0.1726, 0.0048),
    (420, 0.1714, 0.0051),
    (430, 0.1689, 0.0069),
    (440, 0.1644, 0.0109),
    (450, 0.1566, 0.0177),
    (460, 0.1440, 0.0297),
    (470, 0.1241, 0.0578),
    (475, 0.1096, 0.0868),
    (480, 0.0913, 0.1327),
    (485, 0.0687, 0.2007),
    (490, 0.0454, 0.2950),
    (495, 0.0235, 0.4127),
    (500, 0.0082, 0.5384),
    (505, 0.0039, 0.6548),
    (510, 0.0139, 0.7502),
    (515, 0.0389, 0.8120),
    (520, 0.0743, 0.8338),
    (525, 0.1142, 0.8262),
    (530, 0.1547, 0.8059),
    (535, 0.1929, 0.7816),
    (540, 0.2296, 0.7543),
    (545, 0.2658, 0.7243),
    (550, 0.3016, 0.6923),
    (555, 0.3373, 0.6589),
    (560, 0.3731, 0.6245),
    (565, 0.4087, 0.5896),
    (570, 0.4441, 0.5547),
    (575, 0.4788, 0.5202),
    (580, 0.5125, 0.4866),
    (585, 0.5448, 0.4544),
    (590, 0.5752, 0.4242),
    (595, 0.6029, 0.3965),
    (600, 0.6270, 0.3725),
    (610, 0.6658, 0.3340),
    (620, 0.6915, 0.3083),
    (630, 0.7079, 0.2920),
    (640, 0.7190, 0.2809),
    (650, 0.7260, 0.2740),
    (660, 0.7300, 0.2700),
    (680, 0.7334, 0.2666),
    (700, 0.7347, 0.2653),
];

const INK: Rgb<u8> = Rgb([0, 0, 0]);
const LOCUS_COLOR: Rgb<u8> = Rgb([110, 110, 110]);
const PLANCKIAN_COLOR: Rgb<u8> = Rgb([200, 60, 30]);

/// Planckian locus temperatures labelled on the diagram.
const CCT_LABELS: [f64; 6] = [2000.0, 2700.0, 4000.0, 6500.0, 10000.0, 25000.0];

const DEVICE_LABEL: &str = "Device-converted";
const COMPUTED_LABEL: &str = "Computed from RGB";

#[derive(Debug, Clone)]
struct Series {
    label: String,
    marker: Marker,
    color: Rgb<u8>,
    connected: bool,
    points: Vec<(f64, f64)>,
}

/// Chromaticity diagram; add points and series, then render.
#[derive(Debug, Clone, Default)]
pub struct ChromaticityPlot {
    series: Vec<Series>,
}

impl ChromaticityPlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    /// Number of plotted points, all series together.
    pub fn point_count(&self) -> usize {
        self.series.iter().map(|s| s.points.len()).sum()
    }

    fn series_mut(&mut self, label: &str, marker: Marker, color: Rgb<u8>) -> &mut Series {
        let index = match self.series.iter().position(|s| s.label == label) {
            Some(index) => index,
            None => {
                self.series.push(Series {
                    label: label.to_string(),
                    marker,
                    color,
                    connected: false,
                    points: Vec::new(),
                });
                self.series.len() - 1
            }
        };
        &mut self.series[index]
    }

    /// Plot a sensor reading twice: the device's own CCT on the Planckian
    /// locus (`+`) and its raw RGB converted to xy (`*`).
    pub fn add_measurement(&mut self, reading: &SensorReading) {
        if reading.cct > 0.0 {
            let xy = cct_to_xy(reading.cct);
            self.series_mut(DEVICE_LABEL, Marker::Plus, INK).points.push(xy);
        }
        if let Some(xy) = rgb_to_xy(reading.r, reading.g, reading.b) {
            self.series_mut(COMPUTED_LABEL, Marker::Star, INK).points.push(xy);
        }
    }

    /// Plot color temperatures as points on the Planckian locus.
    pub fn add_cct_points(&mut self, label: &str, color: Rgb<u8>, ccts: &[f64]) {
        let series = self.series_mut(label, Marker::Plus, color);
        series
            .points
            .extend(ccts.iter().filter(|c| **c > 0.0).map(|c| cct_to_xy(*c)));
    }

    /// Polyline through RGB triples converted to xy. Black triples are skipped.
    pub fn add_series(&mut self, label: &str, marker: Marker, color: Rgb<u8>, values: &[[f64; 3]]) {
        let points = values
            .iter()
            .filter_map(|[r, g, b]| rgb_to_xy(*r, *g, *b))
            .collect();
        self.series.push(Series {
            label: label.to_string(),
            marker,
            color,
            connected: true,
            points,
        });
    }

    /// Collect what a calibration table has to say about color: sensor
    /// readings (`r`, `g`, `b`, `cct`) and every `*_cct` column.
    pub fn from_table(table: &Table) -> Result<Self, PlotError> {
        let mut plot = Self::new();

        if ["r", "g", "b", "cct"].iter().all(|k| table.has_column(k)) {
            for record in &table.records {
                let field = |k: &str| record.get(k).copied().unwrap_or(0.0);
                let reading = SensorReading {
                    r: field("r"),
                    g: field("g"),
                    b: field("b"),
                    w: field("w"),
                    lux: field("lux"),
                    cct: field("cct"),
                };
                plot.add_measurement(&reading);
            }
        } else {
            let cct_columns = table.keys.iter().filter(|k| k.ends_with("_cct"));
            for (i, key) in cct_columns.enumerate() {
                plot.add_cct_points(key, series_color(i), &table.column(key));
            }
        }

        if plot.is_empty() {
            return Err(PlotError::NoData(
                "table has no sensor RGB or CCT values".to_string(),
            ));
        }
        Ok(plot)
    }

    /// Draw the spectral locus, the Planckian locus with a few labelled
    /// temperatures, and every series with its legend entry.
    pub fn render(&self, options: &PlotOptions) -> Result<RgbImage, PlotError> {
        let family = font_family(options)?;
        let locus_color = plot_color(LOCUS_COLOR);
        let planckian_color = plot_color(PLANCKIAN_COLOR);

        render(options, |root| {
            let mut chart = ChartBuilder::on(root)
                .caption(CHROMATICITY_TITLE, (family, TITLE_SIZE).into_font())
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(60)
                .build_cartesian_2d(0.0..0.8, 0.0..0.9)?;

            chart
                .configure_mesh()
                .x_desc("CIE x")
                .y_desc("CIE y")
                .axis_desc_style((family, LABEL_SIZE))
                .label_style((family, TICK_SIZE))
                .draw()?;

            // Spectral locus, closed by the line of purples
            let mut locus: Vec<(f64, f64)> =
                SPECTRAL_LOCUS.iter().map(|(_, x, y)| (*x, *y)).collect();
            locus.push(locus[0]);
            chart.draw_series(LineSeries::new(locus, &locus_color))?;
            let note = (family, NOTE_SIZE).into_font().color(&locus_color);
            chart.draw_series(
                SPECTRAL_LOCUS
                    .iter()
                    .filter(|(nm, _, _)| nm % 20 == 0 && *nm >= 460)
                    .map(|(nm, x, y)| {
                        EmptyElement::at((*x, *y)) + Text::new(nm.to_string(), (4, -6), note.clone())
                    }),
            )?;

            chart.draw_series(LineSeries::new(planckian_locus(200), &planckian_color))?;
            let note = (family, NOTE_SIZE).into_font().color(&planckian_color);
            chart.draw_series(CCT_LABELS.iter().map(|cct| {
                EmptyElement::at(cct_to_xy(*cct))
                    + Circle::new((0, 0), 3, planckian_color.filled())
                    + Text::new(format!("{}K", cct), (-10, 6), note.clone())
            }))?;

            for series in &self.series {
                let color = plot_color(series.color);
                if series.connected {
                    chart.draw_series(LineSeries::new(series.points.iter().copied(), &color))?;
                }
                let marker = series.marker;
                let style = marker.style(color);
                let points = series
                    .points
                    .iter()
                    .filter(|_| marker != Marker::None)
                    .map(|p| EmptyElement::at(*p) + PathElement::new(marker.path((0, 0)), style));
                chart
                    .draw_series(points)?
                    .label(series.label.as_str())
                    .legend(move |(x, y)| PathElement::new(marker.path((x + 10, y)), style));
            }

            if !self.series.is_empty() {
                chart
                    .configure_series_labels()
                    .position(SeriesLabelPosition::UpperRight)
                    .label_font((family, TICK_SIZE))
                    .background_style(WHITE.mix(0.8))
                    .border_style(BLACK)
                    .draw()?;
            }
            Ok(())
        })
    }
}

/// Planckian locus sampled evenly in mired between the supported CCT limits.
fn planckian_locus(samples: usize) -> Vec<(f64, f64)> {
    let (hi, lo) = (1e6 / MIN_CCT, 1e6 / MAX_CCT);
    (0..samples)
        .map(|i| {
            let mired = lo + (hi - lo) * i as f64 / (samples - 1).max(1) as f64;
            cct_to_xy(1e6 / mired)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Record;

    fn reading(r: f64, g: f64, b: f64, cct: f64) -> SensorReading {
        SensorReading {
            r,
            g,
            b,
            cct,
            ..Default::default()
        }
    }

    #[test]
    fn test_measurement_adds_device_and_computed_points() {
        let mut plot = ChromaticityPlot::new();
        plot.add_measurement(&reading(1.0, 0.8, 0.6, 3000.0));
        plot.add_measurement(&reading(1.0, 1.0, 1.0, 6500.0));
        assert_eq!(plot.series.len(), 2);
        assert_eq!(plot.point_count(), 4);

        // Sensor that saw nothing contributes nothing
        plot.add_measurement(&reading(0.0, 0.0, 0.0, 0.0));
        assert_eq!(plot.point_count(), 4);
    }

    #[test]
    fn test_planckian_locus_runs_warm_to_cold() {
        let locus = planckian_locus(50);
        assert_eq!(locus.len(), 50);
        let (first, last) = (locus[0], locus[49]);
        // Coldest first: bluish, small x
        assert!(first.0 < last.0);
        assert!(last.0 > 0.5);
    }

    #[test]
    fn test_from_table_uses_cct_columns() {
        let mut table = Table::new(&["requested", "rgb_lux", "rgb_cct", "rgbw_cct"]);
        for t in [3000.0, 4000.0] {
            let mut record = Record::new();
            record.insert("requested".to_string(), t);
            record.insert("rgb_cct".to_string(), t + 100.0);
            record.insert("rgbw_cct".to_string(), t - 50.0);
            table.push(record);
        }
        let plot = ChromaticityPlot::from_table(&table).unwrap();
        assert_eq!(plot.series.len(), 2);
        assert_eq!(plot.point_count(), 4);

        let empty = Table::new(&["requested", "w_lux"]);
        assert!(matches!(
            ChromaticityPlot::from_table(&empty),
            Err(PlotError::NoData(_))
        ));
    }

    #[test]
    fn test_render_draws_loci_and_series() {
        let mut plot = ChromaticityPlot::new();
        let green = Rgb([0, 200, 0]);
        plot.add_series("mix", Marker::Dot, green, &[[1.0, 0.5, 0.2], [0.5, 0.5, 1.0]]);
        plot.add_measurement(&reading(1.0, 0.9, 0.8, 4000.0));

        let options = PlotOptions::default().with_size(500, 500);
        let image = plot.render(&options).unwrap();
        assert_eq!(image.dimensions(), (500, 500));
        let count = |c: Rgb<u8>| image.pixels().filter(|p| **p == c).count();
        assert!(count(LOCUS_COLOR) > 100);
        assert!(count(PLANCKIAN_COLOR) > 50);
        assert!(count(green) > 10);
    }

    #[test]
    fn test_render_labels_with_default_options() {
        let mut plot = ChromaticityPlot::new();
        plot.add_measurement(&reading(1.0, 0.9, 0.8, 4000.0));
        let image = plot.render(&PlotOptions::default()).unwrap();
        let (width, height) = image.dimensions();
        let paper = Rgb([255, 255, 255]);
        let ink = |xs: std::ops::Range<u32>, ys: std::ops::Range<u32>| {
            ys.flat_map(|y| xs.clone().map(move |x| (x, y)))
                .filter(|(x, y)| *image.get_pixel(*x, *y) != paper)
                .count()
        };

        // Title band
        assert!(ink(0..width, 0..40) > 100);
        // Legend box in the empty upper-right of the diagram
        assert!(ink(width * 3 / 4..width, 40..height / 4) > 200);
    }
}
