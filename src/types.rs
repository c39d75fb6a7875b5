/// Whether a chromosome belongs to the donor genome or the wheat background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChromosomeClass {
    Alien,
    WheatBackground,
}

impl ChromosomeClass {
    pub fn is_alien(&self) -> bool {
        matches!(self, ChromosomeClass::Alien)
    }
}

/// Assigns a `ChromosomeClass` from a chromosome name.
///
/// Alien chromosomes are recognised by a fixed name prefix (case-sensitive);
/// every other name is wheat background.
#[derive(Debug, Clone)]
pub struct ChromosomeClassifier {
    pub alien_prefix: String,
}

impl Default for ChromosomeClassifier {
    fn default() -> Self {
        Self {
            alien_prefix: "C".to_string(),
        }
    }
}

impl ChromosomeClassifier {
    pub fn new(alien_prefix: impl Into<String>) -> Self {
        Self {
            alien_prefix: alien_prefix.into(),
        }
    }

    pub fn classify(&self, chrom: &str) -> ChromosomeClass {
        if chrom.starts_with(self.alien_prefix.as_str()) {
            ChromosomeClass::Alien
        } else {
            ChromosomeClass::WheatBackground
        }
    }
}

/// One row of a coverage table.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageRecord {
    pub chrom: String,
    pub pos: u64,
    /// Position exactly as written in the input, echoed back on output.
    pub pos_text: String,
    /// Third column, carried through unparsed.
    pub end: String,
    pub depth: f64,
    pub class: ChromosomeClass,
}

impl CoverageRecord {
    pub fn key(&self) -> (&str, u64) {
        (&self.chrom, self.pos)
    }
}

/// A parsed coverage table in file order.
#[derive(Debug, Clone, Default)]
pub struct CoverageTable {
    pub name: String,
    pub records: Vec<CoverageRecord>,
}

impl CoverageTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Depths of all records of the given class, in table order.
    pub fn depths_of(&self, class: ChromosomeClass) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.class == class)
            .map(|r| r.depth)
            .collect()
    }

    pub fn count_of(&self, class: ChromosomeClass) -> usize {
        self.records.iter().filter(|r| r.class == class).count()
    }
}

/// Per-run depth baselines, fixed before any row is scored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineMedians {
    /// Alien-chromosome median depth in the IL (`T_median`).
    pub alien_il: f64,
    /// Wheat-background median depth in the IL.
    pub wheat_il: f64,
    pub wheat_parent1: f64,
    pub wheat_parent2: f64,
}

/// Which wheat parent a wheat-background score was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parent {
    First,
    Second,
}

/// A coverage deviation score.
///
/// `Undefined` marks rows where every usable baseline was zero; it is written
/// as `0` by default, matching the historical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    Value(f64),
    Undefined,
}

impl Score {
    pub fn value(&self) -> Option<f64> {
        match self {
            Score::Value(v) => Some(*v),
            Score::Undefined => None,
        }
    }

    /// The score with undefined collapsed to zero.
    pub fn or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Score::Undefined)
    }
}

/// Output row: one per input row, in input order.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationRecord {
    pub chrom: String,
    pub pos: u64,
    pub pos_text: String,
    pub class: ChromosomeClass,
    pub score: Score,
    /// Parent used for a wheat-background row; `None` for alien rows and
    /// for wheat rows with no usable parent.
    pub parent: Option<Parent>,
}
