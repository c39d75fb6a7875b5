use crate::types::{ChromosomeClassifier, CoverageRecord, CoverageTable};
use anyhow::{Context, Result};
use flate2::read::MultiGzDecoder;
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Open a coverage table, transparently decompressing `.gz` files.
fn open_table(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open coverage table: {}", path.display()))?;
    let reader: Box<dyn Read> = if path.extension().map_or(false, |ext| ext == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(Box::new(BufReader::new(reader)))
}

/// Parse one data line: `chrom pos <ignored> depth [extra ...]`.
fn parse_line(line: &str, classifier: &ChromosomeClassifier) -> Result<CoverageRecord> {
    let mut fields = line.split_ascii_whitespace();
    let (chrom, pos, end, depth) = match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(c), Some(p), Some(e), Some(d)) => (c, p, e, d),
        _ => anyhow::bail!(
            "expected at least 4 whitespace-separated fields, found {}",
            line.split_ascii_whitespace().count()
        ),
    };

    let pos_text = pos;
    let pos: u64 = pos_text
        .parse()
        .with_context(|| format!("invalid position '{}'", pos_text))?;
    let depth: f64 = depth
        .parse()
        .with_context(|| format!("invalid depth '{}'", depth))?;

    Ok(CoverageRecord {
        chrom: chrom.to_string(),
        pos,
        pos_text: pos_text.to_string(),
        end: end.to_string(),
        depth,
        class: classifier.classify(chrom),
    })
}

/// Read coverage rows from any buffered source.
///
/// Blank lines and `#` comment/header lines are skipped; any other line
/// that does not parse is an error naming its 1-based line number.
pub fn read_coverage<R: BufRead>(
    reader: R,
    name: &str,
    classifier: &ChromosomeClassifier,
    pb: Option<&ProgressBar>,
) -> Result<CoverageTable> {
    let mut records = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("{}: failed to read line {}", name, i + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let record = parse_line(trimmed, classifier)
            .with_context(|| format!("{}: malformed row at line {}", name, i + 1))?;
        records.push(record);

        if let Some(pb) = pb {
            if records.len() % 100_000 == 0 {
                pb.set_position(records.len() as u64);
            }
        }
    }

    if let Some(pb) = pb {
        pb.set_position(records.len() as u64);
    }

    log::debug!("{}: {} rows", name, records.len());

    Ok(CoverageTable {
        name: name.to_string(),
        records,
    })
}

/// Read a coverage table from a file path (plain text or gzip).
pub fn load_coverage_table(
    path: &Path,
    classifier: &ChromosomeClassifier,
    pb: Option<&ProgressBar>,
) -> Result<CoverageTable> {
    let reader = open_table(path)?;
    read_coverage(reader, &path.display().to_string(), classifier, pb)
}
