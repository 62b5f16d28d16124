//! Streaming merge-join of binned loci against a sorted coverage stream.
//!
//! The coverage stream must be sorted by chromosome block, then by start within a block.
//! Loci are visited one chromosome at a time in the order the stream presents them; the
//! working buffer only holds intervals that may still overlap the current or a later locus
//! on the current chromosome, so memory follows local interval density rather than input size.
//! Loci on chromosomes the stream never reaches are emitted last as all-zero rows.

use std::collections::VecDeque;

use log::debug;

use lociprof_core::models::CoverageInterval;

use crate::binning::{Bin, BinnedLoci, LocusBins, sort_loci};
use crate::errors::Result;
use crate::profile::ProfileRow;

// ──────────────────────────────────────────────
// Bin sweep
// ──────────────────────────────────────────────

///
/// Average `intervals` over `bins` with a two-pointer sweep.
///
/// Both inputs must be sorted ascending by start and bins must not overlap. The result
/// has one score per bin, in the same (genomic) order as `bins`; bins no interval
/// reached score 0.
///
pub fn sweep_bins<'a, I>(bins: &[Bin], intervals: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a CoverageInterval>,
{
    let mut scores = Vec::with_capacity(bins.len());
    let mut intervals = intervals.into_iter().peekable();
    let mut acc = 0.0;

    while let (Some(bin), Some(iv)) = (bins.get(scores.len()), intervals.peek()) {
        if iv.start >= bin.end {
            scores.push(bin.average(acc));
            acc = 0.0;
        } else if iv.end <= bin.start {
            intervals.next();
        } else {
            acc += bin.overlap(iv.start, iv.end) as f64 * iv.score;
            if iv.end > bin.end {
                // interval continues into the next bin
                scores.push(bin.average(acc));
                acc = 0.0;
            } else {
                intervals.next();
            }
        }
    }

    if let Some(bin) = bins.get(scores.len()) {
        scores.push(bin.average(acc));
    }
    scores.resize(bins.len(), 0.0);
    scores
}

// ──────────────────────────────────────────────
// Aggregator state machine
// ──────────────────────────────────────────────

#[derive(Debug)]
enum State {
    /// Look at the next interval and pick the chromosome to work on.
    ReadChromHeader,
    /// Drop buffered intervals that end before the next locus.
    Evict,
    /// Read intervals until the buffer reaches past the next locus.
    Fill,
    /// Average the buffer over the next locus's bins.
    Sweep,
    EmitRow(ProfileRow),
    /// Skip the rest of the current chromosome's block.
    AdvanceChromosome,
    /// Emit zero rows for loci on chromosomes the stream never visited.
    Drain,
    Done,
}

/// Counters describing a finished (or in-progress) aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    /// Rows for loci whose chromosome appeared in the stream.
    pub matched_rows: usize,
    /// Zero rows for loci whose chromosome never appeared.
    pub unseen_rows: usize,
    /// Intervals read and discarded without being buffered.
    pub skipped_intervals: usize,
    /// Largest size the working buffer reached.
    pub peak_buffer: usize,
}

///
/// Joins binned loci against a sorted coverage stream, yielding one [ProfileRow] per locus.
///
/// Rows come out chromosome by chromosome in stream order, loci ascending by first bin
/// start, followed by the zero rows of unseen chromosomes in chromosome-name order. The
/// first error ends the iteration.
///
pub struct StreamAggregator<I>
where
    I: Iterator<Item = Result<CoverageInterval>>,
{
    coverage: I,
    pending: BinnedLoci,
    total_bins: usize,
    state: State,

    chrom: Option<String>,
    loci: VecDeque<LocusBins>,
    buffer: VecDeque<CoverageInterval>,
    lookahead: Option<CoverageInterval>,
    chrom_closed: bool,

    unseen: VecDeque<LocusBins>,
    stats: AggregateStats,
}

impl<I> StreamAggregator<I>
where
    I: Iterator<Item = Result<CoverageInterval>>,
{
    ///
    /// `coverage` must be sorted by chromosome block, then start. Each chromosome's loci
    /// are put in first-bin-start order here, so any grouping of loci is accepted.
    ///
    pub fn new(mut loci: BinnedLoci, total_bins: usize, coverage: I) -> Self {
        for chrom_loci in loci.values_mut() {
            sort_loci(chrom_loci);
        }
        StreamAggregator {
            coverage,
            pending: loci,
            total_bins,
            state: State::ReadChromHeader,
            chrom: None,
            loci: VecDeque::new(),
            buffer: VecDeque::new(),
            lookahead: None,
            chrom_closed: false,
            unseen: VecDeque::new(),
            stats: AggregateStats::default(),
        }
    }

    pub fn stats(&self) -> AggregateStats {
        self.stats
    }

    fn next_interval(&mut self) -> Result<Option<CoverageInterval>> {
        match self.lookahead.take() {
            Some(iv) => Ok(Some(iv)),
            None => self.coverage.next().transpose(),
        }
    }

    /// Next interval of the current chromosome, or `None` once its block has ended.
    fn next_in_chrom(&mut self) -> Result<Option<CoverageInterval>> {
        if self.chrom_closed {
            return Ok(None);
        }
        match self.next_interval()? {
            Some(iv) if Some(&iv.chrom) == self.chrom.as_ref() => Ok(Some(iv)),
            other => {
                self.lookahead = other;
                self.chrom_closed = true;
                Ok(None)
            }
        }
    }

    fn read_chrom_header(&mut self) -> Result<State> {
        let Some(iv) = self.next_interval()? else {
            return Ok(State::Drain);
        };
        let chrom = iv.chrom.clone();
        self.lookahead = Some(iv);

        match self.pending.remove(&chrom) {
            Some(loci) => {
                debug!("Aggregating {} loci on {}", loci.len(), chrom);
                self.loci = loci.into();
                self.chrom = Some(chrom);
                self.chrom_closed = false;
                self.buffer.clear();
                Ok(State::Evict)
            }
            None => {
                debug!("No loci on {}, skipping its intervals", chrom);
                self.chrom = Some(chrom);
                self.chrom_closed = false;
                Ok(State::AdvanceChromosome)
            }
        }
    }

    fn evict(&mut self) -> State {
        let Some(locus) = self.loci.front() else {
            return State::AdvanceChromosome;
        };
        let first_start = locus.first_start();
        while self.buffer.front().is_some_and(|iv| iv.end <= first_start) {
            self.buffer.pop_front();
        }
        State::Fill
    }

    fn fill(&mut self) -> Result<State> {
        let (first_start, last_end) = match self.loci.front() {
            Some(locus) => (locus.first_start(), locus.last_end()),
            None => return Ok(State::AdvanceChromosome),
        };

        while self.buffer.back().is_none_or(|iv| iv.start < last_end) {
            let Some(iv) = self.next_in_chrom()? else {
                break;
            };
            if iv.end <= first_start {
                self.stats.skipped_intervals += 1;
                continue;
            }
            self.buffer.push_back(iv);
            self.stats.peak_buffer = self.stats.peak_buffer.max(self.buffer.len());
        }
        Ok(State::Sweep)
    }

    fn sweep(&mut self) -> State {
        match self.loci.pop_front() {
            Some(locus) => {
                let scores = sweep_bins(&locus.bins, &self.buffer);
                self.stats.matched_rows += 1;
                State::EmitRow(ProfileRow::from_locus(&locus, scores))
            }
            None => State::AdvanceChromosome,
        }
    }

    fn advance_chromosome(&mut self) -> Result<State> {
        self.buffer.clear();
        while self.next_in_chrom()?.is_some() {
            self.stats.skipped_intervals += 1;
        }
        Ok(State::ReadChromHeader)
    }

    fn drain(&mut self) -> State {
        if self.unseen.is_empty() && !self.pending.is_empty() {
            for (chrom, loci) in std::mem::take(&mut self.pending) {
                debug!("{} has no coverage, emitting {} zero rows", chrom, loci.len());
                self.unseen.extend(loci);
            }
        }
        match self.unseen.pop_front() {
            Some(locus) => {
                self.stats.unseen_rows += 1;
                State::EmitRow(ProfileRow::zeros(&locus, self.total_bins))
            }
            None => State::Done,
        }
    }

    fn step(&mut self) -> Result<Option<ProfileRow>> {
        loop {
            self.state = match std::mem::replace(&mut self.state, State::Done) {
                State::ReadChromHeader => self.read_chrom_header()?,
                State::Evict => self.evict(),
                State::Fill => self.fill()?,
                State::Sweep => self.sweep(),
                State::EmitRow(row) => {
                    self.state = State::Evict;
                    return Ok(Some(row));
                }
                State::AdvanceChromosome => self.advance_chromosome()?,
                State::Drain => match self.drain() {
                    State::EmitRow(row) => {
                        self.state = State::Drain;
                        return Ok(Some(row));
                    }
                    next => next,
                },
                State::Done => return Ok(None),
            };
        }
    }
}

impl<I> Iterator for StreamAggregator<I>
where
    I: Iterator<Item = Result<CoverageInterval>>,
{
    type Item = Result<ProfileRow>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(row) => row.map(Ok),
            Err(e) => {
                self.state = State::Done;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lociprof_core::models::Strand;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use crate::binning::split_region;

    fn iv(chrom: &str, start: u32, end: u32, score: f64) -> CoverageInterval {
        CoverageInterval::new(chrom, start, end, score)
    }

    fn locus(name: &str, chrom: &str, start: u32, end: u32, n: usize, strand: Strand) -> LocusBins {
        LocusBins {
            name: name.to_string(),
            chrom: chrom.to_string(),
            strand,
            start,
            end,
            bins: split_region(start, end, n),
        }
    }

    fn binned(loci: Vec<LocusBins>) -> BinnedLoci {
        let mut grouped = BinnedLoci::new();
        for l in loci {
            grouped.entry(l.chrom.clone()).or_default().push(l);
        }
        grouped
    }

    fn run(loci: Vec<LocusBins>, total_bins: usize, coverage: Vec<CoverageInterval>) -> Vec<ProfileRow> {
        StreamAggregator::new(binned(loci), total_bins, coverage.into_iter().map(Ok))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn rounded(scores: &[f64]) -> Vec<f64> {
        scores.iter().map(|s| (s * 100.0).round() / 100.0).collect()
    }

    #[rstest]
    fn test_sweep_partial_overlaps() {
        let bins = split_region(100, 200, 2);
        let coverage = vec![iv("chr1", 90, 120, 2.0), iv("chr1", 120, 200, 1.0)];
        assert_eq!(rounded(&sweep_bins(&bins, &coverage)), vec![1.4, 1.0]);
    }

    #[rstest]
    fn test_sweep_pads_uncovered_tail() {
        let bins = split_region(0, 40, 4);
        let coverage = vec![iv("chr1", 0, 5, 4.0)];
        assert_eq!(sweep_bins(&bins, &coverage), vec![2.0, 0.0, 0.0, 0.0]);
    }

    #[rstest]
    fn test_sweep_interval_spanning_many_bins() {
        let bins = split_region(0, 30, 3);
        let coverage = vec![iv("chr1", 5, 25, 3.0)];
        assert_eq!(sweep_bins(&bins, &coverage), vec![1.5, 3.0, 1.5]);
    }

    #[rstest]
    fn test_sweep_zero_length_bins_score_zero() {
        let bins = vec![Bin { start: 10, end: 10 }, Bin { start: 10, end: 20 }];
        let coverage = vec![iv("chr1", 0, 30, 5.0)];
        assert_eq!(sweep_bins(&bins, &coverage), vec![0.0, 5.0]);
    }

    #[rstest]
    fn test_sweep_no_intervals() {
        let bins = split_region(0, 30, 3);
        let coverage: Vec<CoverageInterval> = Vec::new();
        assert_eq!(sweep_bins(&bins, &coverage), vec![0.0; 3]);
    }

    #[rstest]
    #[case(Strand::Forward, vec![1.4, 1.0])]
    #[case(Strand::Reverse, vec![1.0, 1.4])]
    fn test_concrete_locus(#[case] strand: Strand, #[case] expected: Vec<f64>) {
        let rows = run(
            vec![locus("g", "chr1", 100, 200, 2, strand)],
            2,
            vec![iv("chr1", 90, 120, 2.0), iv("chr1", 120, 200, 1.0)],
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rounded(&rows[0].scores), expected);
    }

    #[rstest]
    fn test_buffer_is_shared_by_overlapping_loci() {
        let rows = run(
            vec![
                locus("a", "chr1", 0, 100, 1, Strand::Forward),
                locus("b", "chr1", 50, 150, 1, Strand::Forward),
            ],
            1,
            vec![iv("chr1", 40, 60, 1.0), iv("chr1", 60, 160, 2.0)],
        );
        let scores: Vec<(String, f64)> = rows.into_iter().map(|r| (r.name, r.scores[0])).collect();
        assert_eq!(
            scores,
            vec![("a".to_string(), 1.0), ("b".to_string(), 1.9)]
        );
    }

    #[rstest]
    fn test_loci_given_out_of_order() {
        let rows = run(
            vec![
                locus("b", "chr1", 100, 110, 1, Strand::Forward),
                locus("a", "chr1", 0, 10, 1, Strand::Forward),
            ],
            1,
            vec![iv("chr1", 0, 10, 1.0), iv("chr1", 100, 110, 2.0)],
        );
        let scores: Vec<(String, f64)> = rows.into_iter().map(|r| (r.name, r.scores[0])).collect();
        assert_eq!(
            scores,
            vec![("a".to_string(), 1.0), ("b".to_string(), 2.0)]
        );
    }

    #[rstest]
    fn test_chromosomes_without_loci_are_skipped() {
        let mut agg = StreamAggregator::new(
            binned(vec![locus("g", "chr3", 0, 10, 1, Strand::Forward)]),
            1,
            vec![
                iv("chr1", 0, 10, 9.0),
                iv("chr2", 0, 10, 9.0),
                iv("chr3", 0, 10, 2.0),
                iv("chr4", 0, 10, 9.0),
            ]
            .into_iter()
            .map(Ok),
        );
        let rows: Vec<ProfileRow> = agg.by_ref().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].scores, vec![2.0]);
        assert_eq!(agg.stats().skipped_intervals, 3);
        assert_eq!(agg.stats().matched_rows, 1);
    }

    #[rstest]
    fn test_unseen_chromosomes_come_last() {
        let rows = run(
            vec![
                locus("z", "chrZ", 0, 10, 2, Strand::Forward),
                locus("a", "chrA", 0, 10, 2, Strand::Forward),
                locus("m", "chr1", 0, 10, 2, Strand::Forward),
            ],
            2,
            vec![iv("chr1", 0, 10, 1.0)],
        );
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["m", "a", "z"]);
        assert_eq!(rows[1].scores, vec![0.0, 0.0]);
        assert_eq!(rows[2].scores, vec![0.0, 0.0]);
    }

    #[rstest]
    fn test_empty_stream_yields_zero_rows() {
        let rows = run(vec![locus("a", "chr1", 0, 10, 3, Strand::Reverse)], 3, vec![]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].scores, vec![0.0; 3]);
    }

    #[rstest]
    fn test_error_stops_iteration() {
        let coverage: Vec<Result<CoverageInterval>> = vec![
            Ok(iv("chr1", 0, 10, 1.0)),
            Err(crate::errors::ProfileError::parse("cov", 2, "bad line")),
        ];
        let mut agg = StreamAggregator::new(
            binned(vec![locus("a", "chr1", 0, 100, 1, Strand::Forward)]),
            1,
            coverage.into_iter(),
        );
        assert!(matches!(agg.next(), Some(Err(_))));
        assert!(agg.next().is_none());
    }
}
