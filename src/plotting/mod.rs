mod covdev;
mod panels;

use anyhow::Result;
use plotters::prelude::*;
use std::path::Path;
use std::sync::Once;

pub use crate::output::PlotFormat;
use crate::regions::RegionConfig;
use crate::types::DeviationRecord;

static FONT_INIT: Once = Once::new();

/// Register an embedded font for the ab_glyph backend (no-op after first call).
fn ensure_fonts() {
    FONT_INIT.call_once(|| {
        let font_data: &'static [u8] =
            include_bytes!("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        for style in [FontStyle::Normal, FontStyle::Bold] {
            if plotters::style::register_font("sans-serif", style, font_data).is_err() {
                log::warn!("failed to register plot font; labels may be missing");
            }
        }
    });
}

/// Configuration for plot generation.
#[derive(Debug, Clone)]
pub struct PlotConfig {
    pub width: u32,
    pub row_height: u32,
    pub format: PlotFormat,
    pub max_chromosomes: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 1800,
            row_height: 260,
            format: PlotFormat::Png,
            max_chromosomes: 24,
        }
    }
}

pub const COLOR_WHEAT: RGBColor = RGBColor(46, 134, 171);
pub const COLOR_ALIEN: RGBColor = RGBColor(162, 59, 114);
pub const COLOR_RED: RGBColor = RGBColor(220, 50, 50);
pub const COLOR_GRID: RGBColor = RGBColor(200, 200, 200);

const N_COLS: usize = 3;

/// Draw coverage deviation along each chromosome, one panel per chromosome.
pub fn plot_coverage_deviation(
    records: &[DeviationRecord],
    path: &Path,
    config: &PlotConfig,
    thresholds: &RegionConfig,
) -> Result<()> {
    ensure_fonts();
    let panels = panels::chrom_panels(records, config.max_chromosomes);
    if panels.is_empty() {
        anyhow::bail!("No data to plot");
    }

    let n_rows = (panels.len() + N_COLS - 1) / N_COLS;
    let height = config.row_height * n_rows as u32 + 80;
    let panel_px = panels::panel_pixel_width(config.width, N_COLS);

    match config.format {
        PlotFormat::Png => {
            let root = BitMapBackend::new(path, (config.width, height)).into_drawing_area();
            covdev::draw_coverage_deviation(&root, records, &panels, thresholds, panel_px)?;
            root.present()?;
        }
        PlotFormat::Svg => {
            let root = SVGBackend::new(path, (config.width, height)).into_drawing_area();
            covdev::draw_coverage_deviation(&root, records, &panels, thresholds, panel_px)?;
            root.present()?;
        }
    }

    log::debug!("plot saved to {}", path.display());
    Ok(())
}
