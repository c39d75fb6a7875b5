//! Coverage deviation scoring for wheat introgression lines.
//!
//! Each window of an introgression line (IL) is scored against a baseline:
//! alien-chromosome windows against the IL's own alien median depth, and
//! wheat-background windows against whichever wheat parent the IL tracks most
//! closely after each sample is normalised by its wheat median depth.

pub mod alignment;
pub mod baseline;
pub mod coverage_reader;
pub mod deviation;
pub mod output;
pub mod regions;
pub mod statistics;
pub mod types;

#[cfg(feature = "plotting")]
pub mod plotting;
