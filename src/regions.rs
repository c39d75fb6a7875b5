use crate::output::format_float;
use crate::types::DeviationRecord;
use anyhow::{Context, Result};
use csv::Writer;
use std::cmp::Ordering;
use std::path::Path;

/// Direction of a copy-number change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyState {
    Gain,
    Loss,
}

impl CopyState {
    pub fn label(&self) -> &'static str {
        match self {
            CopyState::Gain => "gain",
            CopyState::Loss => "loss",
        }
    }
}

/// Thresholds and merging rules for region calling.
#[derive(Debug, Clone)]
pub struct RegionConfig {
    pub gain_threshold: f64,
    pub loss_threshold: f64,
    /// Largest gap in bp bridged across neutral windows.
    pub merge_distance: u64,
    pub min_windows: usize,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            gain_threshold: 1.5,
            loss_threshold: 0.5,
            merge_distance: 0,
            min_windows: 1,
        }
    }
}

impl RegionConfig {
    /// Classify a score; undefined and non-finite scores are never flagged.
    pub fn classify(&self, score: Option<f64>) -> Option<CopyState> {
        match score {
            Some(v) if v.is_finite() && v >= self.gain_threshold => Some(CopyState::Gain),
            Some(v) if v.is_finite() && v <= self.loss_threshold => Some(CopyState::Loss),
            _ => None,
        }
    }
}

/// A run of windows sharing one copy state.
#[derive(Debug, Clone, PartialEq)]
pub struct FlaggedRegion {
    pub chrom: String,
    pub start: u64,
    pub end: u64,
    pub n_windows: usize,
    pub state: CopyState,
    pub mean_score: f64,
    /// Highest score for gains, lowest for losses.
    pub extreme_score: f64,
}

struct OpenRegion<'a> {
    chrom: &'a str,
    state: CopyState,
    start: u64,
    end: u64,
    last_row: usize,
    scores: Vec<f64>,
}

impl OpenRegion<'_> {
    fn close(self) -> FlaggedRegion {
        let n = self.scores.len();
        let mean_score = self.scores.iter().sum::<f64>() / n as f64;
        let extreme_score = match self.state {
            CopyState::Gain => self.scores.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            CopyState::Loss => self.scores.iter().copied().fold(f64::INFINITY, f64::min),
        };
        FlaggedRegion {
            chrom: self.chrom.to_string(),
            start: self.start,
            end: self.end,
            n_windows: n,
            state: self.state,
            mean_score,
            extreme_score,
        }
    }
}

/// Group flagged windows into gain/loss regions.
///
/// Rows are walked in table order. A flagged row joins the open region if it
/// is on the same chromosome with the same state and either directly follows
/// the region's last row or lies at most `merge_distance` bp past its end.
/// A row positioned before the region's end never extends it.
pub fn identify_regions(records: &[DeviationRecord], config: &RegionConfig) -> Vec<FlaggedRegion> {
    let mut regions = Vec::new();
    let mut open: Option<OpenRegion> = None;

    for (i, r) in records.iter().enumerate() {
        let state = config.classify(r.score.value());

        if let Some(cur) = open.take() {
            let same_chrom = cur.chrom == r.chrom;
            let extends = match state {
                Some(s) if same_chrom && s == cur.state && r.pos >= cur.end => {
                    i == cur.last_row + 1 || r.pos - cur.end <= config.merge_distance
                }
                _ => false,
            };
            let keep_open = extends || (same_chrom && state.is_none());

            if extends {
                let mut cur = cur;
                cur.end = r.pos;
                cur.last_row = i;
                cur.scores.push(r.score.or_zero());
                open = Some(cur);
                continue;
            } else if keep_open {
                open = Some(cur);
                continue;
            } else {
                regions.push(cur.close());
            }
        }

        if let Some(s) = state {
            open = Some(OpenRegion {
                chrom: &r.chrom,
                state: s,
                start: r.pos,
                end: r.pos,
                last_row: i,
                scores: vec![r.score.or_zero()],
            });
        }
    }

    if let Some(cur) = open {
        regions.push(cur.close());
    }

    regions.retain(|reg| reg.n_windows >= config.min_windows);
    regions.sort_by(|a, b| natural_chrom_cmp(&a.chrom, &b.chrom).then(a.start.cmp(&b.start)));
    regions
}

/// Write regions to a CSV file.
pub fn write_regions_csv(regions: &[FlaggedRegion], path: &Path) -> Result<()> {
    let mut wtr = Writer::from_path(path)
        .with_context(|| format!("Failed to create regions file: {}", path.display()))?;

    wtr.write_record([
        "chrom",
        "start",
        "end",
        "n_windows",
        "state",
        "mean_score",
        "extreme_score",
    ])?;

    for reg in regions {
        wtr.write_record([
            &reg.chrom,
            &reg.start.to_string(),
            &reg.end.to_string(),
            &reg.n_windows.to_string(),
            &reg.state.label().to_string(),
            &format_float(reg.mean_score),
            &format_float(reg.extreme_score),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Print a formatted summary table of regions to stderr.
pub fn report_regions(regions: &[FlaggedRegion]) {
    eprintln!();
    eprintln!("{}", "=".repeat(80));
    eprintln!("Copy-number change regions");
    eprintln!("{}", "=".repeat(80));
    eprintln!();

    if regions.is_empty() {
        eprintln!("No gain or loss regions found.");
        eprintln!();
        eprintln!("{}", "=".repeat(80));
        return;
    }

    let n_gain = regions.iter().filter(|r| r.state == CopyState::Gain).count();
    eprintln!(
        "Found {} region(s): {} gain, {} loss",
        regions.len(),
        n_gain,
        regions.len() - n_gain
    );
    eprintln!();

    eprintln!(
        "{:<12} {:>12} {:>12} {:>10} {:>6} {:>12} {:>12}",
        "chrom", "start", "end", "n_windows", "state", "mean", "extreme"
    );
    eprintln!("{}", "-".repeat(80));

    for reg in regions {
        eprintln!(
            "{:<12} {:>12} {:>12} {:>10} {:>6} {:>12.3} {:>12.3}",
            reg.chrom,
            reg.start,
            reg.end,
            reg.n_windows,
            reg.state.label(),
            reg.mean_score,
            reg.extreme_score,
        );
    }

    eprintln!();
    eprintln!("{}", "=".repeat(80));
}

/// Split a chromosome name into its number and the remaining suffix,
/// ignoring a leading `chr`/`Chr`/`CHR`: `chr3B` -> `(Some(3), "B")`.
fn chrom_sort_key(chrom: &str) -> (Option<u64>, &str) {
    let stripped = chrom
        .strip_prefix("chr")
        .or_else(|| chrom.strip_prefix("Chr"))
        .or_else(|| chrom.strip_prefix("CHR"))
        .unwrap_or(chrom);
    let digits = stripped.len() - stripped.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    match stripped[..digits].parse::<u64>() {
        Ok(n) => (Some(n), &stripped[digits..]),
        Err(_) => (None, chrom),
    }
}

/// Natural chromosome order: 1A < 1B < 1D < 2A < ... < 7D < 10A, then
/// unnumbered names lexicographically.
pub fn natural_chrom_cmp(a: &str, b: &str) -> Ordering {
    match (chrom_sort_key(a), chrom_sort_key(b)) {
        ((Some(an), a_rest), (Some(bn), b_rest)) => an.cmp(&bn).then_with(|| a_rest.cmp(b_rest)),
        ((Some(_), _), (None, _)) => Ordering::Less,
        ((None, _), (Some(_), _)) => Ordering::Greater,
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChromosomeClass, Score};
    use approx::assert_relative_eq;

    fn rec(chrom: &str, pos: u64, score: f64) -> DeviationRecord {
        DeviationRecord {
            chrom: chrom.to_string(),
            pos,
            pos_text: pos.to_string(),
            class: ChromosomeClass::WheatBackground,
            score: Score::Value(score),
            parent: None,
        }
    }

    #[test]
    fn test_classify_thresholds() {
        let cfg = RegionConfig::default();
        assert_eq!(cfg.classify(Some(1.5)), Some(CopyState::Gain));
        assert_eq!(cfg.classify(Some(0.5)), Some(CopyState::Loss));
        assert_eq!(cfg.classify(Some(1.0)), None);
        assert_eq!(cfg.classify(None), None);
        assert_eq!(cfg.classify(Some(f64::INFINITY)), None);
    }

    #[test]
    fn test_adjacent_windows_merge() {
        let records = vec![
            rec("1A", 0, 1.0),
            rec("1A", 100, 2.0),
            rec("1A", 200, 3.0),
            rec("1A", 300, 1.0),
            rec("1A", 400, 0.2),
        ];
        let regions = identify_regions(&records, &RegionConfig::default());
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].state, CopyState::Gain);
        assert_eq!((regions[0].start, regions[0].end), (100, 200));
        assert_eq!(regions[0].n_windows, 2);
        assert_relative_eq!(regions[0].mean_score, 2.5);
        assert_eq!(regions[0].extreme_score, 3.0);
        assert_eq!(regions[1].state, CopyState::Loss);
        assert_eq!(regions[1].extreme_score, 0.2);
    }

    #[test]
    fn test_merge_distance_bridges_neutral_windows() {
        let records = vec![rec("1A", 100, 2.0), rec("1A", 200, 1.0), rec("1A", 300, 2.0)];

        let split = identify_regions(&records, &RegionConfig::default());
        assert_eq!(split.len(), 2);

        let cfg = RegionConfig {
            merge_distance: 200,
            ..Default::default()
        };
        let merged = identify_regions(&records, &cfg);
        assert_eq!(merged.len(), 1);
        assert_eq!((merged[0].start, merged[0].end, merged[0].n_windows), (100, 300, 2));
    }

    #[test]
    fn test_row_before_region_end_does_not_extend_it() {
        let cfg = RegionConfig {
            merge_distance: 500,
            ..Default::default()
        };
        let records = vec![rec("1A", 300, 2.0), rec("1A", 400, 1.0), rec("1A", 100, 2.0)];
        let regions = identify_regions(&records, &cfg);
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].start, regions[0].end), (100, 100));
        assert_eq!((regions[1].start, regions[1].end), (300, 300));
    }

    #[test]
    fn test_opposite_state_and_chromosome_break_regions() {
        let cfg = RegionConfig {
            merge_distance: 1_000_000,
            ..Default::default()
        };
        let records = vec![
            rec("1A", 100, 2.0),
            rec("1A", 200, 0.1),
            rec("1A", 300, 2.0),
            rec("1B", 100, 2.0),
        ];
        let regions = identify_regions(&records, &cfg);
        assert_eq!(regions.len(), 4);
    }

    #[test]
    fn test_undefined_scores_are_not_flagged() {
        let mut records = vec![rec("1A", 100, 2.0), rec("1A", 200, 2.0)];
        records[1].score = Score::Undefined;
        let regions = identify_regions(&records, &RegionConfig::default());
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].n_windows, 1);
    }

    #[test]
    fn test_min_windows_filter() {
        let records = vec![rec("1A", 100, 2.0), rec("1A", 200, 1.0), rec("1A", 300, 2.0), rec("1A", 400, 2.0)];
        let cfg = RegionConfig {
            min_windows: 2,
            ..Default::default()
        };
        let regions = identify_regions(&records, &cfg);
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].start, 300);
    }

    #[test]
    fn test_regions_sorted_in_natural_order() {
        let records = vec![rec("2A", 1, 2.0), rec("10A", 1, 2.0), rec("1D", 1, 2.0), rec("1A", 1, 2.0)];
        let regions = identify_regions(&records, &RegionConfig::default());
        let chroms: Vec<&str> = regions.iter().map(|r| r.chrom.as_str()).collect();
        assert_eq!(chroms, vec!["1A", "1D", "2A", "10A"]);
    }

    #[test]
    fn test_natural_chrom_cmp() {
        assert_eq!(natural_chrom_cmp("1A", "1B"), Ordering::Less);
        assert_eq!(natural_chrom_cmp("1D", "2A"), Ordering::Less);
        assert_eq!(natural_chrom_cmp("chr2B", "chr10A"), Ordering::Less);
        assert_eq!(natural_chrom_cmp("Un", "7D"), Ordering::Greater);
        assert_eq!(natural_chrom_cmp("C1", "C2"), Ordering::Less);
        assert_eq!(natural_chrom_cmp("chr1", "chr2"), Ordering::Less);
    }

    #[test]
    fn test_write_regions_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("regions.csv");
        let regions = identify_regions(&[rec("3B", 500, 4.0)], &RegionConfig::default());
        write_regions_csv(&regions, &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "chrom,start,end,n_windows,state,mean_score,extreme_score\n3B,500,500,1,gain,4.0,4.0\n"
        );
    }
}
