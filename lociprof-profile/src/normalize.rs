//! Post-hoc rescaling of a finished profile table.

use std::collections::BTreeMap;

use log::{debug, info};

use crate::profile::ProfileTable;

/// Percentage of all observations that lies at or above the genome-wide cutoff.
pub const TOP_PERCENT: usize = 1;

/// A pure pass over a profile table.
pub trait ProfileNormalizer {
    fn normalize(&self, table: &ProfileTable) -> ProfileTable;
}

///
/// Genome-wide rescaling: every score is multiplied by `target_scale / cutoff`, where
/// `cutoff` is the integer score at which the top 1% of all observations begins, and
/// clipped to `target_scale`.
///
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenomeNormalizer {
    pub target_scale: f64,
}

impl GenomeNormalizer {
    pub fn new(target_scale: f64) -> Self {
        GenomeNormalizer { target_scale }
    }

    /// The percentile cutoff of `table`, falling back to its maximum when the
    /// percentile truncates to zero. `None` for an empty or all-zero table.
    pub fn cutoff(table: &ProfileTable) -> Option<f64> {
        let mut histogram: BTreeMap<i64, usize> = BTreeMap::new();
        let mut total = 0usize;
        let mut max = 0.0f64;
        for score in table.scores() {
            *histogram.entry(score.trunc() as i64).or_default() += 1;
            total += 1;
            max = max.max(score);
        }
        if total == 0 {
            return None;
        }

        let top = (total * TOP_PERCENT).div_ceil(100).max(1);
        let mut seen = 0usize;
        let mut cutoff = 0i64;
        for (&value, &count) in histogram.iter().rev() {
            seen += count;
            if seen >= top {
                cutoff = value;
                break;
            }
        }

        if cutoff > 0 {
            Some(cutoff as f64)
        } else if max > 0.0 {
            Some(max)
        } else {
            None
        }
    }
}

impl ProfileNormalizer for GenomeNormalizer {
    fn normalize(&self, table: &ProfileTable) -> ProfileTable {
        let Some(cutoff) = Self::cutoff(table) else {
            info!("Genome-wide normalization skipped: table has no positive scores");
            return table.clone();
        };
        let factor = self.target_scale / cutoff;
        info!(
            "Genome-wide normalization: cutoff {:.2}, scaling by {:.4}",
            cutoff, factor
        );

        let mut out = table.clone();
        for row in &mut out.rows {
            for score in &mut row.scores {
                *score = (*score * factor).min(self.target_scale);
            }
        }
        out
    }
}

/// Per-row rescaling so that each row's maximum equals `target_scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneNormalizer {
    pub target_scale: f64,
}

impl GeneNormalizer {
    pub fn new(target_scale: f64) -> Self {
        GeneNormalizer { target_scale }
    }
}

impl ProfileNormalizer for GeneNormalizer {
    fn normalize(&self, table: &ProfileTable) -> ProfileTable {
        let mut out = table.clone();
        let mut flat = 0usize;
        for row in &mut out.rows {
            let max = row.max_score();
            if max <= 0.0 {
                flat += 1;
                continue;
            }
            let divisor = max / self.target_scale;
            for score in &mut row.scores {
                *score /= divisor;
            }
        }
        debug!("Per-row normalization left {} all-zero rows untouched", flat);
        out
    }
}

/// Apply the configured passes, genome-wide first.
pub fn normalize_table(
    table: ProfileTable,
    genome_norm: Option<f64>,
    gene_norm: Option<f64>,
) -> ProfileTable {
    let table = match genome_norm {
        Some(scale) => GenomeNormalizer::new(scale).normalize(&table),
        None => table,
    };
    match gene_norm {
        Some(scale) => GeneNormalizer::new(scale).normalize(&table),
        None => table,
    }
}
