//! Splitting loci into fixed-count bin sequences.

use std::collections::BTreeMap;

use lociprof_core::models::{ChromSizes, Strand};

use crate::annotation::GeneLocus;
use crate::config::Geometry;
use crate::errors::{ProfileError, Result};

/// One sub-interval of a locus, 0-based half-open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bin {
    pub start: u32,
    pub end: u32,
}

impl Bin {
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Length-weighted average of `accumulated` over this bin; zero-length bins score 0.
    pub fn average(&self, accumulated: f64) -> f64 {
        match self.len() {
            0 => 0.0,
            len => accumulated / len as f64,
        }
    }

    /// Overlapping length with `[start, end)`.
    pub fn overlap(&self, start: u32, end: u32) -> u32 {
        self.end.min(end).saturating_sub(self.start.max(start))
    }
}

///
/// Split `[start, end)` into `n` bins.
///
/// Boundaries are `floor(start + step * i)` with a real-valued `step = (end - start) / n`,
/// each computed independently.
///
pub fn split_region(start: u32, end: u32, n: usize) -> Vec<Bin> {
    if n == 0 {
        return Vec::new();
    }
    let step = end.saturating_sub(start) as f64 / n as f64;
    let boundary = |i: usize| (start as f64 + step * i as f64).floor() as u32;

    (0..n)
        .map(|i| Bin {
            start: boundary(i),
            end: boundary(i + 1),
        })
        .collect()
}

/// A locus with its bins, always in ascending genomic order.
#[derive(Debug, Clone, PartialEq)]
pub struct LocusBins {
    pub name: String,
    pub chrom: String,
    pub strand: Strand,
    /// Reported coordinates of the locus.
    pub start: u32,
    pub end: u32,
    pub bins: Vec<Bin>,
}

impl LocusBins {
    pub fn first_start(&self) -> u32 {
        self.bins.first().map_or(self.start, |b| b.start)
    }

    pub fn last_end(&self) -> u32 {
        self.bins.last().map_or(self.end, |b| b.end)
    }
}

/// Binned loci keyed by chromosome, each list sorted by first bin start.
pub type BinnedLoci = BTreeMap<String, Vec<LocusBins>>;

/// Order one chromosome's loci by (first bin start, last bin end, name).
pub fn sort_loci(loci: &mut [LocusBins]) {
    loci.sort_by(|a, b| {
        (a.first_start(), a.last_end(), &a.name).cmp(&(b.first_start(), b.last_end(), &b.name))
    });
}

/// Applies a [Geometry] to loci.
pub struct LocusBinner<'a> {
    geometry: Geometry,
    chrom_sizes: Option<&'a ChromSizes>,
}

impl<'a> LocusBinner<'a> {
    pub fn new(geometry: Geometry, chrom_sizes: Option<&'a ChromSizes>) -> Result<Self> {
        if geometry.needs_chrom_sizes() && chrom_sizes.is_none() {
            return Err(ProfileError::Config(
                "chromosome sizes are required to clip TSS windows and flanks".to_string(),
            ));
        }
        Ok(LocusBinner {
            geometry,
            chrom_sizes,
        })
    }

    pub fn total_bins(&self) -> usize {
        self.geometry.total_bins()
    }

    fn chrom_len(&self, chrom: &str) -> Result<u32> {
        self.chrom_sizes
            .and_then(|sizes| sizes.get(chrom))
            .ok_or_else(|| ProfileError::UnknownChromosome(chrom.to_string()))
    }

    fn ensure_nonempty(locus: &GeneLocus) -> Result<()> {
        if locus.start >= locus.end {
            return Err(ProfileError::EmptyLocus {
                name: locus.name.clone(),
                chrom: locus.chrom.clone(),
                start: locus.start,
                end: locus.end,
            });
        }
        Ok(())
    }

    /// Compute the bin sequence of one locus.
    pub fn bin_locus(&self, locus: &GeneLocus) -> Result<LocusBins> {
        let (start, end, bins) = match self.geometry {
            Geometry::Region { bins } => {
                Self::ensure_nonempty(locus)?;
                (locus.start, locus.end, split_region(locus.start, locus.end, bins))
            }
            Geometry::Tss {
                upstream,
                downstream,
                bins,
            } => {
                let len = self.chrom_len(&locus.chrom)?;
                let (before, after) = match locus.strand {
                    Strand::Forward => (upstream, downstream),
                    Strand::Reverse => (downstream, upstream),
                };
                let lo = locus.tss.saturating_sub(before).min(len);
                let hi = locus.tss.saturating_add(after).min(len);
                (lo, hi, split_region(lo, hi, bins))
            }
            Geometry::GeneBody {
                upstream,
                up_bins,
                gene_bins,
                downstream,
                down_bins,
            } => {
                Self::ensure_nonempty(locus)?;
                // on the minus strand upstream lies past the genomic end
                let ((left, left_bins), (right, right_bins)) = match locus.strand {
                    Strand::Forward => ((upstream, up_bins), (downstream, down_bins)),
                    Strand::Reverse => ((downstream, down_bins), (upstream, up_bins)),
                };

                let mut bins = Vec::with_capacity(self.total_bins());
                if left_bins > 0 {
                    bins.extend(split_region(
                        locus.start.saturating_sub(left),
                        locus.start,
                        left_bins,
                    ));
                }
                bins.extend(split_region(locus.start, locus.end, gene_bins));
                if right_bins > 0 {
                    let len = self.chrom_len(&locus.chrom)?;
                    bins.extend(split_region(
                        locus.end.min(len),
                        locus.end.saturating_add(right).min(len),
                        right_bins,
                    ));
                }
                (locus.start, locus.end, bins)
            }
        };

        Ok(LocusBins {
            name: locus.name.clone(),
            chrom: locus.chrom.clone(),
            strand: locus.strand,
            start,
            end,
            bins,
        })
    }

    ///
    /// Bin every locus and group the results by chromosome. Within a chromosome loci are
    /// ordered by (first bin start, last bin end, name).
    ///
    pub fn bin_all(&self, loci: &[GeneLocus]) -> Result<BinnedLoci> {
        let mut grouped = BinnedLoci::new();
        for locus in loci {
            let binned = self.bin_locus(locus)?;
            grouped.entry(binned.chrom.clone()).or_default().push(binned);
        }
        for chrom_loci in grouped.values_mut() {
            sort_loci(chrom_loci);
        }
        Ok(grouped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn locus(name: &str, start: u32, end: u32, strand: Strand) -> GeneLocus {
        GeneLocus {
            name: name.to_string(),
            chrom: "chr1".to_string(),
            start,
            end,
            strand,
            tss: match strand {
                Strand::Forward => start,
                Strand::Reverse => end,
            },
        }
    }

    #[fixture]
    fn sizes() -> ChromSizes {
        ChromSizes::from_iter([("chr1".to_string(), 1000u32)])
    }

    fn spans(bins: &[Bin]) -> Vec<(u32, u32)> {
        bins.iter().map(|b| (b.start, b.end)).collect()
    }

    #[rstest]
    #[case(100, 200, 2, vec![(100, 150), (150, 200)])]
    #[case(0, 10, 3, vec![(0, 3), (3, 6), (6, 10)])]
    #[case(5, 7, 4, vec![(5, 5), (5, 6), (6, 6), (6, 7)])]
    #[case(10, 10, 2, vec![(10, 10), (10, 10)])]
    fn test_split_region(
        #[case] start: u32,
        #[case] end: u32,
        #[case] n: usize,
        #[case] expected: Vec<(u32, u32)>,
    ) {
        assert_eq!(spans(&split_region(start, end, n)), expected);
    }

    #[rstest]
    fn test_split_lengths_sum_to_region() {
        for n in 1..50 {
            let bins = split_region(17, 1234, n);
            assert_eq!(bins.len(), n);
            let total: u32 = bins.iter().map(Bin::len).sum();
            assert!(total.abs_diff(1234 - 17) <= n as u32);
            assert!(bins.windows(2).all(|w| w[0].end <= w[1].end));
        }
    }

    #[rstest]
    fn test_region_geometry() {
        let binner = LocusBinner::new(Geometry::Region { bins: 2 }, None).unwrap();
        let binned = binner.bin_locus(&locus("r", 100, 200, Strand::Reverse)).unwrap();
        assert_eq!(spans(&binned.bins), vec![(100, 150), (150, 200)]);
        assert_eq!((binned.start, binned.end), (100, 200));
    }

    #[rstest]
    fn test_zero_length_region_is_error() {
        let binner = LocusBinner::new(Geometry::Region { bins: 2 }, None).unwrap();
        let err = binner.bin_locus(&locus("r", 100, 100, Strand::Forward)).unwrap_err();
        assert!(matches!(err, ProfileError::EmptyLocus { .. }));
    }

    #[rstest]
    #[case(Strand::Forward, 500, (400, 700))]
    #[case(Strand::Reverse, 500, (300, 600))]
    #[case(Strand::Forward, 50, (0, 250))]
    #[case(Strand::Forward, 900, (800, 1000))]
    #[case(Strand::Reverse, 1200, (1000, 1000))]
    fn test_tss_window(
        sizes: ChromSizes,
        #[case] strand: Strand,
        #[case] tss: u32,
        #[case] expected: (u32, u32),
    ) {
        let geometry = Geometry::Tss {
            upstream: 100,
            downstream: 200,
            bins: 4,
        };
        let binner = LocusBinner::new(geometry, Some(&sizes)).unwrap();
        let mut point = locus("t", tss, tss, strand);
        point.tss = tss;

        let binned = binner.bin_locus(&point).unwrap();
        assert_eq!((binned.start, binned.end), expected);
        assert_eq!(binned.bins.len(), 4);
        assert_eq!(binned.first_start(), expected.0);
        assert_eq!(binned.last_end(), expected.1);
    }

    #[rstest]
    fn test_gene_body_forward(sizes: ChromSizes) {
        let geometry = Geometry::GeneBody {
            upstream: 50,
            up_bins: 1,
            gene_bins: 2,
            downstream: 100,
            down_bins: 2,
        };
        let binner = LocusBinner::new(geometry, Some(&sizes)).unwrap();
        let binned = binner.bin_locus(&locus("g", 100, 300, Strand::Forward)).unwrap();
        assert_eq!(
            spans(&binned.bins),
            vec![(50, 100), (100, 200), (200, 300), (300, 350), (350, 400)]
        );
    }

    #[rstest]
    fn test_gene_body_reverse_swaps_flanks(sizes: ChromSizes) {
        let geometry = Geometry::GeneBody {
            upstream: 50,
            up_bins: 1,
            gene_bins: 2,
            downstream: 100,
            down_bins: 2,
        };
        let binner = LocusBinner::new(geometry, Some(&sizes)).unwrap();
        let binned = binner.bin_locus(&locus("g", 100, 300, Strand::Reverse)).unwrap();
        assert_eq!(
            spans(&binned.bins),
            vec![(0, 50), (50, 100), (100, 200), (200, 300), (300, 350)]
        );
    }

    #[rstest]
    fn test_flanks_are_clipped(sizes: ChromSizes) {
        let geometry = Geometry::GeneBody {
            upstream: 500,
            up_bins: 2,
            gene_bins: 1,
            downstream: 500,
            down_bins: 2,
        };
        let binner = LocusBinner::new(geometry, Some(&sizes)).unwrap();
        let binned = binner.bin_locus(&locus("g", 100, 900, Strand::Forward)).unwrap();
        assert_eq!(
            spans(&binned.bins),
            vec![(0, 50), (50, 100), (100, 900), (900, 950), (950, 1000)]
        );
    }

    #[rstest]
    fn test_flank_on_unknown_chromosome(sizes: ChromSizes) {
        let geometry = Geometry::GeneBody {
            upstream: 0,
            up_bins: 0,
            gene_bins: 2,
            downstream: 10,
            down_bins: 1,
        };
        let binner = LocusBinner::new(geometry, Some(&sizes)).unwrap();
        let mut gene = locus("g", 100, 300, Strand::Forward);
        gene.chrom = "chrUn".to_string();
        let err = binner.bin_locus(&gene).unwrap_err();
        assert!(matches!(err, ProfileError::UnknownChromosome(c) if c == "chrUn"));
    }

    #[rstest]
    fn test_missing_sizes_is_config_error() {
        let geometry = Geometry::Tss {
            upstream: 10,
            downstream: 10,
            bins: 2,
        };
        assert!(matches!(
            LocusBinner::new(geometry, None),
            Err(ProfileError::Config(_))
        ));
    }

    #[rstest]
    fn test_bin_all_groups_and_sorts() {
        let binner = LocusBinner::new(Geometry::Region { bins: 1 }, None).unwrap();
        let mut other = locus("z", 5, 10, Strand::Forward);
        other.chrom = "chr2".to_string();
        let loci = vec![
            locus("b", 300, 400, Strand::Forward),
            other,
            locus("a", 100, 200, Strand::Forward),
            locus("c", 100, 150, Strand::Reverse),
        ];

        let grouped = binner.bin_all(&loci).unwrap();
        let chroms: Vec<&String> = grouped.keys().collect();
        assert_eq!(chroms, vec!["chr1", "chr2"]);
        let names: Vec<&str> = grouped["chr1"].iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
