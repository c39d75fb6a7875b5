use crate::types::CoverageTable;
use anyhow::Result;

/// How rows of the IL table are matched to rows of the parent tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum JoinMode {
    /// Row `i` of every table must have the same chromosome and position.
    Keyed,
    /// Row `i` of every table is assumed to describe the same window.
    Positional,
}

/// Check that both parent tables can be paired row-by-row with the IL table.
pub fn check_alignment(
    il: &CoverageTable,
    parent1: &CoverageTable,
    parent2: &CoverageTable,
    mode: JoinMode,
) -> Result<()> {
    for parent in [parent1, parent2] {
        match mode {
            JoinMode::Keyed => check_keyed(il, parent)?,
            JoinMode::Positional => {
                if parent.len() < il.len() {
                    anyhow::bail!(
                        "{} has {} rows but {} has {}; every IL row needs a parent row",
                        parent.name,
                        parent.len(),
                        il.name,
                        il.len()
                    );
                }
                if parent.len() > il.len() {
                    log::warn!(
                        "{} has {} more rows than {}; extra rows are ignored",
                        parent.name,
                        parent.len() - il.len(),
                        il.name
                    );
                }
            }
        }
    }
    Ok(())
}

fn check_keyed(il: &CoverageTable, parent: &CoverageTable) -> Result<()> {
    if parent.len() != il.len() {
        anyhow::bail!(
            "{} has {} rows but {} has {}",
            parent.name,
            parent.len(),
            il.name,
            il.len()
        );
    }

    let mismatch = il
        .records
        .iter()
        .zip(&parent.records)
        .position(|(a, b)| a.key() != b.key());

    if let Some(i) = mismatch {
        let (a, b) = (&il.records[i], &parent.records[i]);
        anyhow::bail!(
            "row {} is {}:{} in {} but {}:{} in {}",
            i + 1,
            a.chrom,
            a.pos,
            il.name,
            b.chrom,
            b.pos,
            parent.name
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChromosomeClassifier, CoverageRecord};

    fn table(name: &str, rows: &[(&str, u64)]) -> CoverageTable {
        let classifier = ChromosomeClassifier::default();
        CoverageTable {
            name: name.to_string(),
            records: rows
                .iter()
                .map(|&(chrom, pos)| CoverageRecord {
                    chrom: chrom.to_string(),
                    pos,
                    pos_text: pos.to_string(),
                    end: String::new(),
                    depth: 1.0,
                    class: classifier.classify(chrom),
                })
                .collect(),
        }
    }

    #[test]
    fn test_identical_keys_pass_both_modes() {
        let il = table("il", &[("1A", 1), ("1A", 2), ("C1", 1)]);
        let p = table("p", &[("1A", 1), ("1A", 2), ("C1", 1)]);
        assert!(check_alignment(&il, &p, &p, JoinMode::Keyed).is_ok());
        assert!(check_alignment(&il, &p, &p, JoinMode::Positional).is_ok());
    }

    #[test]
    fn test_keyed_reports_first_mismatch() {
        let il = table("il", &[("1A", 1), ("1A", 2)]);
        let p1 = table("p1", &[("1A", 1), ("1A", 2)]);
        let p2 = table("p2", &[("1A", 1), ("1B", 2)]);
        let err = check_alignment(&il, &p1, &p2, JoinMode::Keyed).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("row 2"), "{}", msg);
        assert!(msg.contains("1B:2 in p2"), "{}", msg);
    }

    #[test]
    fn test_keyed_rejects_length_difference() {
        let il = table("il", &[("1A", 1)]);
        let p = table("p", &[("1A", 1), ("1A", 2)]);
        assert!(check_alignment(&il, &p, &p, JoinMode::Keyed).is_err());
    }

    #[test]
    fn test_positional_ignores_keys() {
        let il = table("il", &[("1A", 1), ("1A", 2)]);
        let p = table("p", &[("7D", 9), ("7D", 10), ("7D", 11)]);
        assert!(check_alignment(&il, &p, &p, JoinMode::Positional).is_ok());
    }

    #[test]
    fn test_positional_rejects_short_parent() {
        let il = table("il", &[("1A", 1), ("1A", 2)]);
        let p1 = table("p1", &[("1A", 1), ("1A", 2)]);
        let p2 = table("p2", &[("1A", 1)]);
        let err = check_alignment(&il, &p1, &p2, JoinMode::Positional).unwrap_err();
        assert!(err.to_string().contains("p2 has 1 rows"));
    }
}
