//! Line chart of table columns.

use image::RgbImage;
use plotters::prelude::*;

use super::style::{
    draw_text_box, font_family, padded_range, plot_color, render, series_color, Marker,
    LABEL_SIZE, TICK_SIZE, TITLE_SIZE,
};
use super::{PlotError, PlotOptions};
use crate::data::Table;

pub const LINE_PLOT_TITLE: &str = "LUX output for different inputs";

/// Parameters left out of the parameter box.
const HIDDEN_PARAMETERS: [&str; 2] = ["measurement", "interval"];

/// One line per `ylabels` column against `xlabel`, with a legend and a box
/// listing the run parameters.
pub fn plot_lines(
    table: &Table,
    xlabel: &str,
    ylabels: &[String],
    options: &PlotOptions,
) -> Result<RgbImage, PlotError> {
    if ylabels.is_empty() {
        return Err(PlotError::NoData("no y columns selected".to_string()));
    }
    for key in std::iter::once(xlabel).chain(ylabels.iter().map(String::as_str)) {
        if !table.has_column(key) {
            return Err(PlotError::MissingColumn(key.to_string()));
        }
    }

    let series: Vec<(&String, Vec<(f64, f64)>)> = ylabels
        .iter()
        .map(|y| (y, table.column_pairs(xlabel, y)))
        .collect();
    if series.iter().all(|(_, points)| points.is_empty()) {
        return Err(PlotError::NoData(format!(
            "no records with {} and any of {}",
            xlabel,
            ylabels.join(", ")
        )));
    }

    tracing::debug!("x_values {:?}", table.column(xlabel));
    for (label, points) in &series {
        let ys: Vec<f64> = points.iter().map(|(_, y)| *y).collect();
        tracing::debug!("y_values {}: {:?}", label, ys);
    }

    let (x0, x1) = padded_range(series.iter().flat_map(|(_, p)| p.iter().map(|(x, _)| *x)));
    let (y0, y1) = padded_range(series.iter().flat_map(|(_, p)| p.iter().map(|(_, y)| *y)));
    let y_desc = ylabels.join(", ");
    let parameter_lines: Vec<String> = table
        .parameters
        .iter()
        .filter(|(name, _)| !HIDDEN_PARAMETERS.contains(&name.as_str()))
        .map(|(name, value)| format!("{} = {}", name, value))
        .collect();
    let family = font_family(options)?;

    render(options, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(LINE_PLOT_TITLE, (family, TITLE_SIZE).into_font())
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d(x0..x1, y0..y1)?;

        chart
            .configure_mesh()
            .x_desc(xlabel)
            .y_desc(y_desc.as_str())
            .axis_desc_style((family, LABEL_SIZE))
            .label_style((family, TICK_SIZE))
            .draw()?;

        for (i, (label, points)) in series.iter().enumerate() {
            let color = plot_color(series_color(i));
            chart
                .draw_series(LineSeries::new(points.iter().copied(), &color))?
                .label(label.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(Marker::None.path((x + 10, y)), color.stroke_width(2))
                });
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((family, TICK_SIZE))
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        let (xs, ys) = chart.plotting_area().get_pixel_range();
        draw_text_box(root, &parameter_lines, (xs.end - 10, ys.end - 10), family)?;
        Ok(())
    })
}
