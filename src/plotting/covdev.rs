use anyhow::Result;
use plotters::prelude::*;

use super::panels::{thin_points, ChromPanel};
use super::{COLOR_ALIEN, COLOR_GRID, COLOR_RED, COLOR_WHEAT, N_COLS};
use crate::regions::RegionConfig;
use crate::statistics::percentile;
use crate::types::DeviationRecord;

/// Draw a faceted coverage deviation plot.
///
/// Undefined and non-finite scores are left out. The shared y-axis runs from
/// 0 to a little above the 99th percentile of the plotted scores, and never
/// below the gain threshold.
pub fn draw_coverage_deviation<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    records: &[DeviationRecord],
    panels: &[ChromPanel],
    thresholds: &RegionConfig,
    panel_px: usize,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let (title_area, chart_area) = root.split_vertically(60);
    title_area.titled(
        "Introgression line coverage deviation",
        ("sans-serif", 22).into_font().color(&BLACK),
    )?;

    let n_rows = (panels.len() + N_COLS - 1) / N_COLS;
    let panel_areas = chart_area.split_evenly((n_rows, N_COLS));

    let mut scores: Vec<f64> = panels
        .iter()
        .flat_map(|p| p.indices.iter())
        .filter_map(|&i| records[i].score.value())
        .filter(|v| v.is_finite())
        .collect();
    scores.sort_by(|a, b| a.total_cmp(b));
    let y_max = (percentile(&scores, 0.99) * 1.1).max(thresholds.gain_threshold * 1.2);
    let y_max = if y_max.is_finite() && y_max > 0.0 { y_max } else { 2.0 };

    for (idx, panel) in panels.iter().enumerate() {
        if idx >= panel_areas.len() {
            break;
        }

        let points: Vec<(f64, f64, bool)> = panel
            .indices
            .iter()
            .filter_map(|&i| {
                let r = &records[i];
                let y = r.score.value().filter(|v| v.is_finite())?;
                Some((r.pos as f64 / 1_000_000.0, y.min(y_max), r.class.is_alien()))
            })
            .collect();

        let x_min = points.first().map_or(0.0, |p| p.0);
        let x_max = points.last().map_or(1.0, |p| p.0);
        let x_margin = (x_max - x_min).max(0.1) * 0.02;
        let x_range = (x_min - x_margin)..(x_max + x_margin);

        let first_col = idx % N_COLS == 0;
        let mut chart = ChartBuilder::on(&panel_areas[idx])
            .caption(&panel.chrom, ("sans-serif", 14).into_font().color(&BLACK))
            .margin(5)
            .x_label_area_size(25)
            .y_label_area_size(if first_col { 50 } else { 30 })
            .build_cartesian_2d(x_range.clone(), 0.0..y_max)?;

        chart
            .configure_mesh()
            .x_desc("Position (Mb)")
            .y_desc(if first_col { "cov_dev" } else { "" })
            .x_label_style(("sans-serif", 10))
            .y_label_style(("sans-serif", 10))
            .light_line_style(COLOR_GRID.mix(0.3))
            .draw()?;

        for (alien, color) in [(false, COLOR_WHEAT), (true, COLOR_ALIEN)] {
            let series: Vec<(f64, f64)> = points
                .iter()
                .filter(|p| p.2 == alien)
                .map(|p| (p.0, p.1))
                .collect();
            let series = thin_points(series, panel_px);
            chart.draw_series(
                series
                    .iter()
                    .map(|&(x, y)| Circle::new((x, y), 2, color.mix(0.7).filled())),
            )?;
        }

        chart.draw_series(LineSeries::new(
            vec![(x_range.start, 1.0), (x_range.end, 1.0)],
            BLACK.mix(0.6).stroke_width(1),
        ))?;

        for level in [thresholds.gain_threshold, thresholds.loss_threshold] {
            if level > 0.0 && level < y_max {
                chart.draw_series(DashedLineSeries::new(
                    vec![(x_range.start, level), (x_range.end, level)],
                    5,
                    3,
                    COLOR_RED.mix(0.5).into(),
                ))?;
            }
        }
    }

    Ok(())
}
