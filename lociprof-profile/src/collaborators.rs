//! Interfaces to the steps around the engine, with reference implementations.
//!
//! The engine itself only needs a sorted [CoverageStream]; how the stream is produced,
//! checked, or clipped is decided here.

use std::collections::VecDeque;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use fxhash::FxHashSet;
use log::{debug, info};

use lociprof_core::models::{ChromSizes, CoverageInterval};
use lociprof_core::utils::{is_header_or_blank, open_sniffed};

use crate::config::ChromSizesSource;
use crate::errors::{ProfileError, Result};
use crate::reading::CoverageReader;

/// A boxed, sorted stream of scored intervals.
pub type CoverageStream = Box<dyn Iterator<Item = Result<CoverageInterval>>>;

/// Guarantees an input is sorted by chromosome block, then start.
pub trait Sorter {
    fn ensure_sorted(&self, path: &Path) -> Result<()>;
}

/// Turns an input file into a sorted coverage stream.
pub trait CoverageConverter {
    fn bed_to_bedgraph(&self, path: &Path, chrom_sizes: Option<&ChromSizes>) -> Result<CoverageStream>;
}

/// Resolves a genome name to its chromosome lengths.
pub trait ChromSizeProvider {
    fn lookup(&self, genome: &str) -> Result<ChromSizes>;
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ──────────────────────────────────────────────
// Sorting
// ──────────────────────────────────────────────

/// Validates sort order without repairing anything; reports the first offending line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortednessCheck;

impl SortednessCheck {
    pub fn check<R: BufRead>(reader: R) -> Result<()> {
        let mut finished: FxHashSet<String> = FxHashSet::default();
        let mut current: Option<(String, u32)> = None;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if is_header_or_blank(&line) {
                continue;
            }
            let line_no = idx + 1;
            let mut fields = line.split_whitespace();
            let (Some(chrom), Some(start)) = (fields.next(), fields.next()) else {
                return Err(ProfileError::Unsorted {
                    line: line_no,
                    reason: "expected at least 2 columns".to_string(),
                });
            };
            let start: u32 = start.parse().map_err(|_| ProfileError::Unsorted {
                line: line_no,
                reason: format!("bad start '{start}'"),
            })?;

            let same_block = current.as_ref().is_some_and(|(chr, _)| chr == chrom);
            if same_block {
                if let Some((_, last)) = current.as_mut() {
                    if start < *last {
                        return Err(ProfileError::Unsorted {
                            line: line_no,
                            reason: format!("start {start} is before previous start {last} on {chrom}"),
                        });
                    }
                    *last = start;
                }
                continue;
            }

            if finished.contains(chrom) {
                return Err(ProfileError::Unsorted {
                    line: line_no,
                    reason: format!("{chrom} appears in more than one block"),
                });
            }
            if let Some((chr, _)) = current.take() {
                finished.insert(chr);
            }
            current = Some((chrom.to_string(), start));
        }
        Ok(())
    }
}

impl Sorter for SortednessCheck {
    fn ensure_sorted(&self, path: &Path) -> Result<()> {
        if path == Path::new("-") {
            return Err(ProfileError::Config(
                "sort order of stdin cannot be checked ahead of time".to_string(),
            ));
        }
        Self::check(open_sniffed(&path_arg(path))?)?;
        debug!("{} is sorted", path.display());
        Ok(())
    }
}

// ──────────────────────────────────────────────
// Coverage conversion
// ──────────────────────────────────────────────

/// Reads an existing bedGraph as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct BedGraphPassthrough;

impl CoverageConverter for BedGraphPassthrough {
    fn bed_to_bedgraph(&self, path: &Path, _chrom_sizes: Option<&ChromSizes>) -> Result<CoverageStream> {
        let name = path_arg(path);
        let reader = open_sniffed(&name)?;
        Ok(Box::new(CoverageReader::new(reader, name)))
    }
}

/// Computes read depth from sorted BED reads and emits it as run-length bedGraph.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadPileup;

impl CoverageConverter for ReadPileup {
    fn bed_to_bedgraph(&self, path: &Path, chrom_sizes: Option<&ChromSizes>) -> Result<CoverageStream> {
        let name = path_arg(path);
        let reader = open_sniffed(&name)?;
        info!("Computing read depth from {}", name);
        Ok(Box::new(PileupStream::new(reader, name, chrom_sizes.cloned())))
    }
}

///
/// Streaming depth sweep over sorted reads.
///
/// Depth is kept per base in a sliding window that starts at the first position not yet
/// emitted and ends at the furthest read end seen, so memory is bounded by read length
/// rather than chromosome length. Zero-depth stretches are not emitted.
///
pub struct PileupStream<R: BufRead> {
    reader: R,
    source_name: String,
    line_no: usize,
    chrom_sizes: Option<ChromSizes>,

    chrom: Option<String>,
    count_buffer: VecDeque<u32>,
    buffer_start_pos: u32,
    run: Option<CoverageInterval>,
    output: VecDeque<CoverageInterval>,
    done: bool,
}

impl<R: BufRead> PileupStream<R> {
    pub fn new(reader: R, source_name: impl Into<String>, chrom_sizes: Option<ChromSizes>) -> Self {
        PileupStream {
            reader,
            source_name: source_name.into(),
            line_no: 0,
            chrom_sizes,
            chrom: None,
            count_buffer: VecDeque::new(),
            buffer_start_pos: 0,
            run: None,
            output: VecDeque::new(),
            done: false,
        }
    }

    fn close_run(&mut self) {
        if let Some(run) = self.run.take() {
            self.output.push_back(run);
        }
    }

    fn push_depth(&mut self, pos: u32, depth: u32) {
        if depth == 0 {
            self.close_run();
            return;
        }
        let depth = depth as f64;
        if let Some(run) = self.run.as_mut().filter(|r| r.end == pos && r.score == depth) {
            run.end += 1;
            return;
        }
        self.close_run();
        let chrom = self.chrom.clone().unwrap_or_default();
        self.run = Some(CoverageInterval::new(chrom, pos, pos + 1, depth));
    }

    /// Emit all positions before `up_to_pos`; later reads cannot change them.
    fn emit_up_to(&mut self, up_to_pos: u32) {
        while self.buffer_start_pos < up_to_pos {
            let Some(count) = self.count_buffer.pop_front() else {
                break;
            };
            self.push_depth(self.buffer_start_pos, count);
            self.buffer_start_pos += 1;
        }
    }

    fn finish_chromosome(&mut self) {
        self.emit_up_to(u32::MAX);
        self.close_run();
    }

    fn add_read(&mut self, chrom: &str, start: u32, end: u32) -> Result<()> {
        if self.chrom.as_deref() != Some(chrom) {
            self.finish_chromosome();
            self.chrom = Some(chrom.to_string());
            self.count_buffer.clear();
            self.buffer_start_pos = start;
        }

        let end = match &self.chrom_sizes {
            Some(sizes) => end.min(
                sizes
                    .get(chrom)
                    .ok_or_else(|| ProfileError::UnknownChromosome(chrom.to_string()))?,
            ),
            None => end,
        };
        if start < self.buffer_start_pos {
            return Err(ProfileError::Unsorted {
                line: self.line_no,
                reason: format!("read at {chrom}:{start} comes after position {}", self.buffer_start_pos),
            });
        }
        if start >= end {
            return Ok(());
        }

        self.emit_up_to(start);
        if self.count_buffer.is_empty() {
            if self.buffer_start_pos < start {
                // gap with no coverage
                self.close_run();
            }
            self.buffer_start_pos = start;
        }

        let offset = (start - self.buffer_start_pos) as usize;
        let needed = (end - self.buffer_start_pos) as usize;
        if needed > self.count_buffer.len() {
            self.count_buffer.resize(needed, 0);
        }
        for count in self.count_buffer.range_mut(offset..needed) {
            *count += 1;
        }
        Ok(())
    }

    fn parse_read<'l>(&self, line: &'l str) -> Result<(&'l str, u32, u32)> {
        let mut fields = line.split_whitespace();
        let (Some(chrom), Some(start), Some(end)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(ProfileError::parse(&self.source_name, self.line_no, "expected at least 3 columns"));
        };
        let coord = |s: &str| {
            s.parse::<u32>().map_err(|e| {
                ProfileError::parse(&self.source_name, self.line_no, format!("bad coordinate '{s}': {e}"))
            })
        };
        Ok((chrom, coord(start)?, coord(end)?))
    }

    fn read_next(&mut self) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                self.finish_chromosome();
                self.done = true;
                return Ok(());
            }
            self.line_no += 1;
            if is_header_or_blank(&line) {
                continue;
            }
            let (chrom, start, end) = self.parse_read(&line)?;
            return self.add_read(chrom, start, end);
        }
    }
}

impl<R: BufRead> Iterator for PileupStream<R> {
    type Item = Result<CoverageInterval>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(interval) = self.output.pop_front() {
                return Some(Ok(interval));
            }
            if self.done {
                return None;
            }
            if let Err(e) = self.read_next() {
                self.done = true;
                return Some(Err(e));
            }
        }
    }
}

// ──────────────────────────────────────────────
// Chromosome sizes
// ──────────────────────────────────────────────

/// A single chrom.sizes file, whatever genome is asked for.
#[derive(Debug, Clone)]
pub struct ChromSizesFile {
    pub path: PathBuf,
}

impl ChromSizeProvider for ChromSizesFile {
    fn lookup(&self, _genome: &str) -> Result<ChromSizes> {
        Ok(ChromSizes::try_from(self.path.as_path())?)
    }
}

/// A directory of `<genome>.chrom.sizes` files.
#[derive(Debug, Clone)]
pub struct ChromSizesDirectory {
    pub dir: PathBuf,
}

impl ChromSizeProvider for ChromSizesDirectory {
    fn lookup(&self, genome: &str) -> Result<ChromSizes> {
        let path = self.dir.join(format!("{genome}.chrom.sizes"));
        if !path.exists() {
            return Err(ProfileError::Config(format!(
                "no chromosome sizes for genome '{}' (looked for {})",
                genome,
                path.display()
            )));
        }
        Ok(ChromSizes::try_from(path.as_path())?)
    }
}

/// Load chromosome sizes from a configured source.
pub fn load_chrom_sizes(source: &ChromSizesSource) -> Result<ChromSizes> {
    let sizes = match source {
        ChromSizesSource::File(path) => ChromSizesFile { path: path.clone() }.lookup("")?,
        ChromSizesSource::Genome { name, dir } => ChromSizesDirectory { dir: dir.clone() }.lookup(name)?,
    };
    info!("Loaded sizes for {} chromosomes", sizes.len());
    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::{Cursor, Write};

    use pretty_assertions::assert_eq;
    use rstest::*;

    fn pileup(text: &str, sizes: Option<ChromSizes>) -> Result<Vec<(String, u32, u32, f64)>> {
        PileupStream::new(Cursor::new(text.to_string()), "reads", sizes)
            .map(|r| r.map(|iv| (iv.chrom, iv.start, iv.end, iv.score)))
            .collect()
    }

    fn s(chrom: &str, start: u32, end: u32, score: f64) -> (String, u32, u32, f64) {
        (chrom.to_string(), start, end, score)
    }

    #[rstest]
    fn test_pileup_depth_runs() {
        let reads = "chr1\t0\t10\nchr1\t5\t15\nchr1\t20\t25\n";
        assert_eq!(
            pileup(reads, None).unwrap(),
            vec![
                s("chr1", 0, 5, 1.0),
                s("chr1", 5, 10, 2.0),
                s("chr1", 10, 15, 1.0),
                s("chr1", 20, 25, 1.0),
            ]
        );
    }

    #[rstest]
    fn test_pileup_adjacent_reads_merge() {
        let reads = "chr1\t0\t10\nchr1\t10\t20\n";
        assert_eq!(pileup(reads, None).unwrap(), vec![s("chr1", 0, 20, 1.0)]);
    }

    #[rstest]
    fn test_pileup_chromosome_change() {
        let reads = "# reads\nchr1\t0\t4\nchr2\t2\t4\nchr2\t2\t6\n";
        assert_eq!(
            pileup(reads, None).unwrap(),
            vec![s("chr1", 0, 4, 1.0), s("chr2", 2, 4, 2.0), s("chr2", 4, 6, 1.0)]
        );
    }

    #[rstest]
    fn test_pileup_clips_to_chrom_sizes() {
        let sizes = ChromSizes::from_iter([("chr1".to_string(), 12u32)]);
        assert_eq!(
            pileup("chr1\t5\t20\n", Some(sizes.clone())).unwrap(),
            vec![s("chr1", 5, 12, 1.0)]
        );
        let err = pileup("chrUn\t0\t5\n", Some(sizes)).unwrap_err();
        assert!(matches!(err, ProfileError::UnknownChromosome(c) if c == "chrUn"));
    }

    #[rstest]
    fn test_pileup_rejects_unsorted_reads() {
        let err = pileup("chr1\t50\t60\nchr1\t10\t20\n", None).unwrap_err();
        assert!(matches!(err, ProfileError::Unsorted { line: 2, .. }));
    }

    #[rstest]
    #[case("chr1\t0\t1\nchr1\t5\t6\nchr2\t0\t1\n", None)]
    #[case("chr1\t5\t6\nchr1\t0\t1\n", Some(2))]
    #[case("chr1\t0\t1\nchr2\t0\t1\nchr1\t5\t6\n", Some(3))]
    fn test_sortedness_check(#[case] text: &str, #[case] bad_line: Option<usize>) {
        match (SortednessCheck::check(Cursor::new(text)), bad_line) {
            (Ok(()), None) => {}
            (Err(ProfileError::Unsorted { line, .. }), Some(expected)) => assert_eq!(line, expected),
            (other, _) => panic!("unexpected result {other:?}"),
        }
    }

    #[rstest]
    fn test_passthrough_reads_gzip() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut file = tempfile::Builder::new().suffix(".bedGraph.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"chr1\t0\t10\t2.5\n").unwrap();
        file.write_all(&encoder.finish().unwrap()).unwrap();
        file.flush().unwrap();

        let intervals: Vec<CoverageInterval> = BedGraphPassthrough
            .bed_to_bedgraph(file.path(), None)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(intervals, vec![CoverageInterval::new("chr1", 0, 10, 2.5)]);
    }

    #[rstest]
    fn test_chrom_sizes_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hg38.chrom.sizes"), "chr1\t1000\nchr2\t500\n").unwrap();

        let provider = ChromSizesDirectory {
            dir: dir.path().to_path_buf(),
        };
        let sizes = provider.lookup("hg38").unwrap();
        assert_eq!(sizes.get("chr2"), Some(500));
        assert!(matches!(provider.lookup("mm10"), Err(ProfileError::Config(_))));
    }
}
