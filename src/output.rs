use crate::types::{DeviationRecord, Score};
use anyhow::{Context, Result};
use csv::{QuoteStyle, WriterBuilder};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How undefined scores are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum UndefinedPolicy {
    /// Write `0`, indistinguishable from a measured zero in downstream tools.
    #[default]
    Zero,
    /// Write `NA`.
    Na,
}

/// Output format for plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PlotFormat {
    Png,
    Svg,
}

impl PlotFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PlotFormat::Png => "png",
            PlotFormat::Svg => "svg",
        }
    }
}

/// `{prefix}_cov_dev_{window_size}.tsv`
pub fn output_file_name(prefix: &str, window_size: &str) -> String {
    format!("{}_cov_dev_{}.tsv", prefix, window_size)
}

/// Resolve the output path, placing the file in `dir` when one is given.
pub fn output_path(dir: Option<&Path>, prefix: &str, window_size: &str) -> PathBuf {
    let name = output_file_name(prefix, window_size);
    match dir {
        Some(dir) => dir.join(name),
        None => PathBuf::from(name),
    }
}

/// Render a float so that parsing the text gives back the same value.
///
/// Integral values keep a trailing `.0`; infinities are `inf`/`-inf`.
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        "nan".to_string()
    } else if v == f64::INFINITY {
        "inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-inf".to_string()
    } else {
        format!("{:?}", v)
    }
}

pub fn format_score(score: Score, policy: UndefinedPolicy) -> String {
    match (score, policy) {
        (Score::Value(v), _) => format_float(v),
        (Score::Undefined, UndefinedPolicy::Zero) => "0".to_string(),
        (Score::Undefined, UndefinedPolicy::Na) => "NA".to_string(),
    }
}

/// Write the deviation table: a `chr/position/cov_dev` header and one row per record.
pub fn write_deviations<W: Write>(records: &[DeviationRecord], writer: W, policy: UndefinedPolicy) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .from_writer(writer);

    wtr.write_record(["chr", "position", "cov_dev"])?;

    for record in records {
        wtr.write_record([
            &record.chrom,
            &record.pos_text,
            &format_score(record.score, policy),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn write_deviations_file(records: &[DeviationRecord], path: &Path, policy: UndefinedPolicy) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    write_deviations(records, std::io::BufWriter::new(file), policy)
        .with_context(|| format!("Failed to write {}", path.display()))
}
