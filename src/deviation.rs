//! Per-row coverage deviation scoring.
//!
//! Alien rows are scaled by the IL's alien median. Wheat-background rows are
//! normalised against each sample's own wheat median and then expressed
//! relative to whichever parent the IL tracks more closely.

use crate::alignment::{check_alignment, JoinMode};
use crate::types::{BaselineMedians, ChromosomeClass, CoverageRecord, CoverageTable, DeviationRecord, Parent, Score};
use anyhow::Result;
use indicatif::ProgressBar;
use rayon::prelude::*;

/// `num / den`, or 0 when the denominator is zero.
fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// Relative deviation of the IL from one parent: `|1 - il_norm / parent_norm|`.
///
/// A zero parent can never be the closer match, so it is infinitely far.
pub fn relative_deviation(il_norm: f64, parent_norm: f64) -> f64 {
    if parent_norm == 0.0 {
        f64::INFINITY
    } else {
        (1.0 - il_norm / parent_norm).abs()
    }
}

/// Score an alien-chromosome row against the IL alien median.
pub fn score_alien(il_depth: f64, medians: &BaselineMedians) -> Score {
    if medians.alien_il == 0.0 {
        Score::Undefined
    } else {
        Score::Value(il_depth / medians.alien_il)
    }
}

/// Depths of one wheat-background window after removing each sample's scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedDepths {
    pub il: f64,
    pub parent1: f64,
    pub parent2: f64,
}

impl NormalizedDepths {
    pub fn new(il_depth: f64, wp1_depth: f64, wp2_depth: f64, medians: &BaselineMedians) -> Self {
        Self {
            il: ratio_or_zero(il_depth, medians.wheat_il),
            parent1: ratio_or_zero(wp1_depth, medians.wheat_parent1),
            parent2: ratio_or_zero(wp2_depth, medians.wheat_parent2),
        }
    }

    /// Pick the parent the IL deviates least from and return the IL's ratio to it.
    ///
    /// Parent 1 wins ties. Parent 2 is used only when parent 1 is zero or
    /// strictly further away; if both are zero the score is undefined.
    pub fn closest_parent_ratio(&self) -> (Score, Option<Parent>) {
        let dev1 = relative_deviation(self.il, self.parent1);
        let dev2 = relative_deviation(self.il, self.parent2);

        if dev1 <= dev2 && self.parent1 != 0.0 {
            (Score::Value(self.il / self.parent1), Some(Parent::First))
        } else if self.parent2 != 0.0 {
            (Score::Value(self.il / self.parent2), Some(Parent::Second))
        } else {
            (Score::Undefined, None)
        }
    }
}

/// Score a wheat-background row against the closer of the two parents.
pub fn score_wheat(
    il_depth: f64,
    wp1_depth: f64,
    wp2_depth: f64,
    medians: &BaselineMedians,
) -> (Score, Option<Parent>) {
    NormalizedDepths::new(il_depth, wp1_depth, wp2_depth, medians).closest_parent_ratio()
}

/// Score one aligned row. Parent rows are only read for wheat-background rows.
pub fn score_row(
    il: &CoverageRecord,
    wp1: &CoverageRecord,
    wp2: &CoverageRecord,
    medians: &BaselineMedians,
) -> DeviationRecord {
    let (score, parent) = match il.class {
        ChromosomeClass::Alien => (score_alien(il.depth, medians), None),
        ChromosomeClass::WheatBackground => score_wheat(il.depth, wp1.depth, wp2.depth, medians),
    };

    DeviationRecord {
        chrom: il.chrom.clone(),
        pos: il.pos,
        pos_text: il.pos_text.clone(),
        class: il.class,
        score,
        parent,
    }
}

/// Score every IL row, in IL order.
///
/// The tables are checked against `mode` first, so a misaligned parent is
/// reported before any scoring is done.
pub fn score_tables(
    il: &CoverageTable,
    parent1: &CoverageTable,
    parent2: &CoverageTable,
    medians: &BaselineMedians,
    mode: JoinMode,
    pb: Option<&ProgressBar>,
) -> Result<Vec<DeviationRecord>> {
    check_alignment(il, parent1, parent2, mode)?;

    let records = il
        .records
        .par_iter()
        .zip(parent1.records.par_iter())
        .zip(parent2.records.par_iter())
        .map(|((a, b), c)| {
            if let Some(pb) = pb {
                pb.inc(1);
            }
            score_row(a, b, c, medians)
        })
        .collect();

    Ok(records)
}
