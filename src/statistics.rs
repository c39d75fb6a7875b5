use crate::types::{ChromosomeClass, DeviationRecord, Parent};

/// Median of an unsorted slice; `None` when empty.
///
/// Even-length input averages the two middle values. Any NaN makes the
/// median NaN.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    if values.iter().any(|v| v.is_nan()) {
        return Some(f64::NAN);
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(median_sorted(&sorted))
}

fn median_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Nearest-rank percentile of an already sorted slice, `p` in [0, 1].
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let rank = (p * sorted.len() as f64).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

/// Counts and score distribution for one run.
#[derive(Debug, Clone, Default)]
pub struct ScoreSummary {
    pub n_rows: usize,
    pub n_alien: usize,
    pub n_wheat: usize,
    pub n_parent1: usize,
    pub n_parent2: usize,
    pub n_undefined: usize,
    /// Number of defined, finite scores the distribution below is taken over.
    pub n_finite: usize,
    pub mean: f64,
    pub median: f64,
    pub p05: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
}

impl ScoreSummary {
    pub fn from_records(records: &[DeviationRecord]) -> Self {
        let mut summary = ScoreSummary {
            n_rows: records.len(),
            ..Default::default()
        };

        let mut finite = Vec::with_capacity(records.len());
        for r in records {
            match r.class {
                ChromosomeClass::Alien => summary.n_alien += 1,
                ChromosomeClass::WheatBackground => summary.n_wheat += 1,
            }
            match r.parent {
                Some(Parent::First) => summary.n_parent1 += 1,
                Some(Parent::Second) => summary.n_parent2 += 1,
                None => {}
            }
            match r.score.value() {
                Some(v) if v.is_finite() => finite.push(v),
                Some(_) => {}
                None => summary.n_undefined += 1,
            }
        }

        summary.n_finite = finite.len();
        if finite.is_empty() {
            summary.mean = f64::NAN;
            summary.median = f64::NAN;
            summary.p05 = f64::NAN;
            summary.p95 = f64::NAN;
            summary.min = f64::NAN;
            summary.max = f64::NAN;
            return summary;
        }

        finite.sort_by(|a, b| a.total_cmp(b));
        summary.mean = finite.iter().sum::<f64>() / finite.len() as f64;
        summary.median = median_sorted(&finite);
        summary.p05 = percentile(&finite, 0.05);
        summary.p95 = percentile(&finite, 0.95);
        summary.min = finite[0];
        summary.max = finite[finite.len() - 1];
        summary
    }

    /// Print the summary to stderr.
    pub fn report(&self) {
        eprintln!("  Rows scored: {} ({} alien, {} wheat)", self.n_rows, self.n_alien, self.n_wheat);
        eprintln!(
            "  Wheat rows vs parent 1: {}, vs parent 2: {}",
            self.n_parent1, self.n_parent2
        );
        eprintln!("  Undefined scores: {}", self.n_undefined);
        if self.n_finite == 0 {
            eprintln!("  No finite scores");
            return;
        }
        eprintln!("  Mean cov_dev: {:.3}", self.mean);
        eprintln!("  Median cov_dev: {:.3}", self.median);
        eprintln!("  5th percentile: {:.3}", self.p05);
        eprintln!("  95th percentile: {:.3}", self.p95);
        eprintln!("  Min / max: {:.3} / {:.3}", self.min, self.max);
    }
}
