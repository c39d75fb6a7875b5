use crate::statistics::median;
use crate::types::{BaselineMedians, ChromosomeClass, CoverageTable};
use anyhow::Result;

/// Median used when a class has no rows in the IL.
const EMPTY_CLASS_MEDIAN: f64 = 1.0;

/// Compute the four per-run baselines from the complete input tables.
///
/// The IL alien and wheat medians fall back to 1 when the class is absent.
/// A parent without wheat-background rows is only an error when the IL has
/// wheat-background rows to compare against it.
pub fn estimate_baselines(
    il: &CoverageTable,
    parent1: &CoverageTable,
    parent2: &CoverageTable,
) -> Result<BaselineMedians> {
    let alien_il = median(&il.depths_of(ChromosomeClass::Alien)).unwrap_or_else(|| {
        log::debug!("{}: no alien rows, alien median defaults to {}", il.name, EMPTY_CLASS_MEDIAN);
        EMPTY_CLASS_MEDIAN
    });

    let il_wheat = il.depths_of(ChromosomeClass::WheatBackground);
    let needs_parents = !il_wheat.is_empty();
    let wheat_il = median(&il_wheat).unwrap_or_else(|| {
        log::debug!("{}: no wheat rows, wheat median defaults to {}", il.name, EMPTY_CLASS_MEDIAN);
        EMPTY_CLASS_MEDIAN
    });

    let wheat_parent1 = parent_wheat_median(parent1, needs_parents)?;
    let wheat_parent2 = parent_wheat_median(parent2, needs_parents)?;

    let medians = BaselineMedians {
        alien_il,
        wheat_il,
        wheat_parent1,
        wheat_parent2,
    };

    for (label, value) in [
        ("IL alien", medians.alien_il),
        ("IL wheat", medians.wheat_il),
        ("parent 1 wheat", medians.wheat_parent1),
        ("parent 2 wheat", medians.wheat_parent2),
    ] {
        if value == 0.0 {
            log::warn!("{} median depth is zero; affected scores fall back to 0", label);
        } else if value.is_nan() {
            log::warn!("{} median depth is NaN; affected scores will be NaN", label);
        }
    }

    Ok(medians)
}

fn parent_wheat_median(parent: &CoverageTable, required: bool) -> Result<f64> {
    match median(&parent.depths_of(ChromosomeClass::WheatBackground)) {
        Some(m) => Ok(m),
        None if required => anyhow::bail!(
            "{}: no wheat-background rows; cannot compute the parental wheat median",
            parent.name
        ),
        None => Ok(EMPTY_CLASS_MEDIAN),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChromosomeClassifier, CoverageRecord};
    use approx::assert_relative_eq;

    fn table(name: &str, rows: &[(&str, u64, f64)]) -> CoverageTable {
        let classifier = ChromosomeClassifier::default();
        CoverageTable {
            name: name.to_string(),
            records: rows
                .iter()
                .map(|&(chrom, pos, depth)| CoverageRecord {
                    chrom: chrom.to_string(),
                    pos,
                    pos_text: pos.to_string(),
                    end: String::new(),
                    depth,
                    class: classifier.classify(chrom),
                })
                .collect(),
        }
    }

    #[test]
    fn test_medians_by_class() {
        let il = table("il", &[("C1", 1, 10.0), ("C1", 2, 30.0), ("1A", 1, 5.0), ("1A", 2, 7.0), ("1B", 1, 9.0)]);
        let p1 = table("p1", &[("C1", 1, 100.0), ("1A", 1, 4.0), ("1A", 2, 6.0)]);
        let p2 = table("p2", &[("1A", 1, 15.0), ("1A", 2, 15.0), ("1B", 1, 45.0)]);

        let m = estimate_baselines(&il, &p1, &p2).unwrap();
        assert_relative_eq!(m.alien_il, 20.0);
        assert_relative_eq!(m.wheat_il, 7.0);
        assert_relative_eq!(m.wheat_parent1, 5.0);
        assert_relative_eq!(m.wheat_parent2, 15.0);
    }

    #[test]
    fn test_no_alien_rows_defaults_to_one() {
        let il = table("il", &[("1A", 1, 5.0)]);
        let p = table("p", &[("1A", 1, 5.0)]);
        let m = estimate_baselines(&il, &p, &p).unwrap();
        assert_eq!(m.alien_il, 1.0);
    }

    #[test]
    fn test_all_alien_il_does_not_need_parent_wheat_rows() {
        let il = table("il", &[("C1", 1, 40.0), ("C2", 1, 20.0)]);
        let p = table("p", &[("C1", 1, 3.0)]);
        let m = estimate_baselines(&il, &p, &p).unwrap();
        assert_relative_eq!(m.alien_il, 30.0);
        assert_eq!(m.wheat_il, 1.0);
        assert_eq!(m.wheat_parent1, 1.0);
    }

    #[test]
    fn test_parent_without_wheat_rows_is_an_error() {
        let il = table("il", &[("1A", 1, 5.0)]);
        let p1 = table("p1", &[("1A", 1, 5.0)]);
        let p2 = table("p2", &[("C1", 1, 5.0)]);
        let err = estimate_baselines(&il, &p1, &p2).unwrap_err();
        assert!(err.to_string().contains("p2"));
    }

    #[test]
    fn test_zero_median_is_kept() {
        let il = table("il", &[("C1", 1, 0.0), ("1A", 1, 0.0)]);
        let p = table("p", &[("1A", 1, 0.0)]);
        let m = estimate_baselines(&il, &p, &p).unwrap();
        assert_eq!(m.alien_il, 0.0);
        assert_eq!(m.wheat_il, 0.0);
    }

    #[test]
    fn test_nan_depth_propagates_to_median() {
        let il = table("il", &[("C1", 1, 4.0), ("C1", 2, f64::NAN), ("1A", 1, 2.0)]);
        let p = table("p", &[("1A", 1, 2.0)]);
        let m = estimate_baselines(&il, &p, &p).unwrap();
        assert!(m.alien_il.is_nan());
        assert_eq!(m.wheat_il, 2.0);
    }
}
