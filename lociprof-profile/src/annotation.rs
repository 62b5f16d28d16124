//! Transcript annotations and their reduction to profiling loci.

use fxhash::{FxHashMap, FxHashSet};
use log::{info, warn};

use lociprof_core::models::{Strand, TranscriptAnnotation, TranscriptRecord};

/// How transcripts become loci.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocusMode {
    /// Every transcript (or region) is its own locus.
    PerTranscript,
    /// Transcripts of one gene are merged per chromosome and strand.
    PerGene,
}

/// A locus ready for binning. For TSS points `start == end == tss`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneLocus {
    pub name: String,
    pub chrom: String,
    pub start: u32,
    pub end: u32,
    pub strand: Strand,
    pub tss: u32,
}

impl GeneLocus {
    fn from_transcript(tx: &TranscriptAnnotation) -> Self {
        GeneLocus {
            name: tx.id.clone(),
            chrom: tx.chrom.clone(),
            start: tx.start,
            end: tx.end,
            strand: tx.strand,
            tss: tx.tss_position(),
        }
    }

    fn span(name: &str, chrom: &str, strand: Strand, start: u32, end: u32) -> Self {
        GeneLocus {
            name: name.to_string(),
            chrom: chrom.to_string(),
            start,
            end,
            strand,
            tss: match strand {
                Strand::Forward => start,
                Strand::Reverse => end,
            },
        }
    }

    fn point(name: &str, chrom: &str, strand: Strand, tss: u32) -> Self {
        GeneLocus {
            name: name.to_string(),
            chrom: chrom.to_string(),
            start: tss,
            end: tss,
            strand,
            tss,
        }
    }
}

/// Validated transcripts, built once and borrowed when loci are derived.
#[derive(Debug, Clone, Default)]
pub struct AnnotationIndex {
    transcripts: Vec<TranscriptAnnotation>,
}

impl AnnotationIndex {
    ///
    /// Build the index from reader output. Records missing a chromosome, strand or
    /// coordinates are dropped with a warning; they never abort a run.
    ///
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = TranscriptRecord>,
    {
        let mut transcripts = Vec::new();
        let mut dropped = 0usize;
        for record in records {
            match TranscriptAnnotation::try_from(record) {
                Ok(tx) => transcripts.push(tx),
                Err(e) => {
                    warn!("Skipping annotation record. {}", e);
                    dropped += 1;
                }
            }
        }
        info!(
            "Loaded {} transcripts ({} malformed records dropped)",
            transcripts.len(),
            dropped
        );
        AnnotationIndex { transcripts }
    }

    pub fn len(&self) -> usize {
        self.transcripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty()
    }

    ///
    /// Derive the loci to profile.
    ///
    /// # Arguments
    /// - mode: one locus per transcript, or merged per gene
    /// - tss_points: in per-gene mode, collapse each gene to its distinct TSS positions
    ///   instead of merging spans
    /// - restrict_to: when non-empty, keep only transcripts whose id or gene name is listed
    ///
    /// The result is sorted by (chromosome, start, end, strand, name).
    ///
    pub fn loci(
        &self,
        mode: LocusMode,
        tss_points: bool,
        restrict_to: Option<&FxHashSet<String>>,
    ) -> Vec<GeneLocus> {
        let selected = self.transcripts.iter().filter(|tx| match restrict_to {
            Some(names) if !names.is_empty() => {
                names.contains(&tx.id) || names.contains(&tx.gene_name)
            }
            _ => true,
        });

        let mut loci = match mode {
            LocusMode::PerTranscript => selected.map(GeneLocus::from_transcript).collect(),
            LocusMode::PerGene => merge_by_gene(selected, tss_points),
        };

        loci.sort_by(|a, b| {
            (&a.chrom, a.start, a.end, a.strand, &a.name)
                .cmp(&(&b.chrom, b.start, b.end, b.strand, &b.name))
        });
        loci
    }
}

type GeneKey<'a> = (&'a str, &'a str, Strand);

fn merge_by_gene<'a, I>(transcripts: I, tss_points: bool) -> Vec<GeneLocus>
where
    I: Iterator<Item = &'a TranscriptAnnotation>,
{
    // gene -> chromosome -> strand
    let mut groups: FxHashMap<GeneKey<'a>, Vec<&'a TranscriptAnnotation>> = FxHashMap::default();
    for tx in transcripts {
        groups
            .entry((tx.gene_name.as_str(), tx.chrom.as_str(), tx.strand))
            .or_default()
            .push(tx);
    }

    let mut loci = Vec::new();
    for ((gene, chrom, strand), members) in groups {
        if tss_points {
            let mut positions: Vec<u32> = members.iter().map(|tx| tx.tss_position()).collect();
            positions.sort_unstable();
            positions.dedup();
            loci.extend(
                positions
                    .into_iter()
                    .map(|tss| GeneLocus::point(gene, chrom, strand, tss)),
            );
        } else {
            let spans = members.iter().map(|tx| (tx.start, tx.end)).collect();
            loci.extend(
                union_spans(spans)
                    .into_iter()
                    .map(|(start, end)| GeneLocus::span(gene, chrom, strand, start, end)),
            );
        }
    }
    loci
}

/// Merge spans into a minimal set of disjoint intervals.
///
/// Sorts by start, then sweeps to merge spans where `next.start <= current.end`.
fn union_spans(mut spans: Vec<(u32, u32)>) -> Vec<(u32, u32)> {
    spans.sort_unstable();

    let mut merged: Vec<(u32, u32)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(current) if start <= current.1 => current.1 = current.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn tx(id: &str, gene: &str, chrom: &str, start: u32, end: u32, strand: Strand) -> TranscriptRecord {
        TranscriptRecord {
            id: Some(id.to_string()),
            chrom: Some(chrom.to_string()),
            start: Some(start),
            end: Some(end),
            strand: Some(strand),
            gene_name: Some(gene.to_string()),
            tss: None,
        }
    }

    #[fixture]
    fn index() -> AnnotationIndex {
        AnnotationIndex::from_records(vec![
            tx("a.1", "A", "chr1", 100, 300, Strand::Forward),
            tx("a.2", "A", "chr1", 250, 500, Strand::Forward),
            tx("a.3", "A", "chr1", 800, 900, Strand::Forward),
            tx("a.4", "A", "chr1", 100, 200, Strand::Forward),
            tx("b.1", "B", "chr2", 1000, 2000, Strand::Reverse),
            tx("b.2", "B", "chr2", 1200, 2000, Strand::Reverse),
            tx("c.1", "C", "chr1", 50, 80, Strand::Reverse),
        ])
    }

    #[rstest]
    fn test_per_transcript_loci_are_sorted(index: AnnotationIndex) {
        let loci = index.loci(LocusMode::PerTranscript, false, None);
        let names: Vec<&str> = loci.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["c.1", "a.4", "a.1", "a.2", "a.3", "b.1", "b.2"]);
    }

    #[rstest]
    fn test_gene_spans_are_unioned(index: AnnotationIndex) {
        let loci = index.loci(LocusMode::PerGene, false, None);
        let spans: Vec<(&str, u32, u32)> = loci
            .iter()
            .map(|l| (l.name.as_str(), l.start, l.end))
            .collect();
        assert_eq!(
            spans,
            vec![
                ("C", 50, 80),
                ("A", 100, 500),
                ("A", 800, 900),
                ("B", 1000, 2000),
            ]
        );
        // merged minus-strand spans anchor their TSS on the span end
        assert_eq!(loci[3].tss, 2000);
    }

    #[rstest]
    fn test_gene_tss_points_are_distinct(index: AnnotationIndex) {
        let loci = index.loci(LocusMode::PerGene, true, None);
        let points: Vec<(&str, u32)> = loci.iter().map(|l| (l.name.as_str(), l.tss)).collect();
        assert_eq!(points, vec![("C", 80), ("A", 100), ("A", 250), ("A", 800), ("B", 2000)]);
        assert!(loci.iter().all(|l| l.start == l.end));
    }

    #[rstest]
    fn test_restrict_by_gene_or_transcript(index: AnnotationIndex) {
        let names: FxHashSet<String> = ["B".to_string(), "a.3".to_string()].into_iter().collect();
        let loci = index.loci(LocusMode::PerTranscript, false, Some(&names));
        let ids: Vec<&str> = loci.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(ids, vec!["a.3", "b.1", "b.2"]);
    }

    #[rstest]
    fn test_empty_restrict_set_keeps_everything(index: AnnotationIndex) {
        let names = FxHashSet::default();
        assert_eq!(index.loci(LocusMode::PerTranscript, false, Some(&names)).len(), 7);
    }

    #[rstest]
    fn test_malformed_records_are_dropped() {
        let mut broken = tx("x.1", "X", "chr1", 10, 20, Strand::Forward);
        broken.strand = None;
        let mut no_chrom = tx("y.1", "Y", "chr1", 10, 20, Strand::Forward);
        no_chrom.chrom = None;

        let index = AnnotationIndex::from_records(vec![
            broken,
            no_chrom,
            tx("z.1", "Z", "chr1", 10, 20, Strand::Forward),
        ]);
        assert_eq!(index.len(), 1);
        let names: Vec<String> = index
            .loci(LocusMode::PerTranscript, false, None)
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert_eq!(names, vec!["z.1".to_string()]);
    }

    #[rstest]
    #[case(vec![], vec![])]
    #[case(vec![(5, 10), (1, 3)], vec![(1, 3), (5, 10)])]
    #[case(vec![(1, 5), (5, 8)], vec![(1, 8)])]
    #[case(vec![(1, 10), (2, 3), (4, 12)], vec![(1, 12)])]
    fn test_union_spans(#[case] spans: Vec<(u32, u32)>, #[case] expected: Vec<(u32, u32)>) {
        assert_eq!(union_spans(spans), expected);
    }
}
