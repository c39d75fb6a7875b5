use std::collections::HashMap;

use crate::regions::natural_chrom_cmp;
use crate::types::DeviationRecord;

/// Rows belonging to one chromosome panel.
pub struct ChromPanel {
    pub chrom: String,
    /// Indices into the records slice, sorted by position.
    pub indices: Vec<usize>,
}

/// Group records by chromosome, at most `max_chroms` panels in natural order.
pub fn chrom_panels(records: &[DeviationRecord], max_chroms: usize) -> Vec<ChromPanel> {
    let mut by_chrom: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        by_chrom.entry(r.chrom.as_str()).or_default().push(i);
    }

    let mut panels: Vec<ChromPanel> = by_chrom
        .into_iter()
        .map(|(chrom, mut indices)| {
            indices.sort_by_key(|&i| records[i].pos);
            ChromPanel {
                chrom: chrom.to_string(),
                indices,
            }
        })
        .collect();
    panels.sort_by(|a, b| natural_chrom_cmp(&a.chrom, &b.chrom));
    panels.truncate(max_chroms);
    panels
}

/// Drawable pixel width per panel after ~60px of axis and margin overhead.
pub fn panel_pixel_width(total_width: u32, n_cols: usize) -> usize {
    (total_width as usize / n_cols.max(1)).saturating_sub(60)
}

/// Thin an x-sorted point series to at most two points per pixel column.
///
/// Each bucket keeps its lowest and highest point so spikes and dips
/// survive. Series that already fit are returned unchanged.
pub fn thin_points(points: Vec<(f64, f64)>, n_buckets: usize) -> Vec<(f64, f64)> {
    let n = points.len();
    if n_buckets == 0 || n <= 2 * n_buckets {
        return points;
    }

    let x_min = points[0].0;
    let x_range = points[n - 1].0 - x_min;
    if x_range <= 0.0 {
        return vec![points[0], points[n - 1]];
    }
    let bucket_width = x_range / n_buckets as f64;

    // (low, high) per bucket
    let mut buckets: Vec<Option<((f64, f64), (f64, f64))>> = vec![None; n_buckets];
    for &(x, y) in &points {
        let bi = (((x - x_min) / bucket_width) as usize).min(n_buckets - 1);
        buckets[bi] = Some(match buckets[bi] {
            None => ((x, y), (x, y)),
            Some((lo, hi)) => (
                if y < lo.1 { (x, y) } else { lo },
                if y > hi.1 { (x, y) } else { hi },
            ),
        });
    }

    let mut out = Vec::with_capacity(2 * n_buckets);
    for (lo, hi) in buckets.into_iter().flatten() {
        if lo == hi {
            out.push(lo);
        } else if lo.0 <= hi.0 {
            out.push(lo);
            out.push(hi);
        } else {
            out.push(hi);
            out.push(lo);
        }
    }
    out
}
