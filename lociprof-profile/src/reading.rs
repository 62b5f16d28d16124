//! Readers for coverage streams, region files, GTF annotations and gene lists.
//!
//! Every reader takes a `BufRead` so callers decide how the bytes are opened (plain file,
//! gzip, stdin); see [lociprof_core::utils].

use std::io::BufRead;

use fxhash::{FxHashMap, FxHashSet};
use log::{info, warn};

use lociprof_core::models::{CoverageInterval, Region, Strand, TranscriptRecord};
use lociprof_core::utils::is_header_or_blank;

use crate::errors::{ProfileError, Result};

///
/// Lazily parses `chrom start end score` lines into [CoverageInterval]s.
///
/// Header, comment and blank lines are skipped. A malformed line yields an error naming
/// the source and line number.
///
pub struct CoverageReader<R: BufRead> {
    reader: R,
    source_name: String,
    line_no: usize,
    line: String,
}

impl<R: BufRead> CoverageReader<R> {
    pub fn new(reader: R, source_name: impl Into<String>) -> Self {
        CoverageReader {
            reader,
            source_name: source_name.into(),
            line_no: 0,
            line: String::with_capacity(256),
        }
    }

    fn parse_line(&self) -> Result<CoverageInterval> {
        let fields: Vec<&str> = self.line.split_whitespace().collect();
        if fields.len() < 4 {
            return Err(ProfileError::parse(
                &self.source_name,
                self.line_no,
                format!("expected 4 columns, found {}", fields.len()),
            ));
        }
        let coord = |s: &str| {
            s.parse::<u32>().map_err(|e| {
                ProfileError::parse(&self.source_name, self.line_no, format!("bad coordinate '{s}': {e}"))
            })
        };
        let start = coord(fields[1])?;
        let end = coord(fields[2])?;
        let score = fields[3].parse::<f64>().map_err(|e| {
            ProfileError::parse(
                &self.source_name,
                self.line_no,
                format!("bad score '{}': {}", fields[3], e),
            )
        })?;

        Ok(CoverageInterval::new(fields[0], start, end, score))
    }
}

impl<R: BufRead> Iterator for CoverageReader<R> {
    type Item = Result<CoverageInterval>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line_no += 1;
                    if is_header_or_blank(&self.line) {
                        continue;
                    }
                    return Some(self.parse_line());
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

///
/// Read a BED3-6 region file as one-transcript loci.
///
/// The name defaults to `chr:start-end` and the strand to `+` when the columns are
/// absent or `.`.
///
pub fn read_regions<R: BufRead>(reader: R, source_name: &str) -> Result<Vec<TranscriptRecord>> {
    let mut records = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if is_header_or_blank(&line) {
            continue;
        }
        let region = Region::from_bed_line(line.trim_end())
            .ok_or_else(|| ProfileError::parse(source_name, idx + 1, "not a BED record"))?;
        let name = region
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| region.label());
        let strand = region
            .strand()
            .map_err(|e| ProfileError::parse(source_name, idx + 1, e.to_string()))?;

        records.push(TranscriptRecord {
            id: Some(name.clone()),
            chrom: Some(region.chr.clone()),
            start: Some(region.start),
            end: Some(region.end),
            strand: Some(strand.unwrap_or(Strand::Forward)),
            gene_name: Some(name),
            tss: None,
        });
    }
    Ok(records)
}

fn gtf_attribute(attrs: &str, key: &str) -> Option<String> {
    attrs.split(';').find_map(|attr| {
        let (k, v) = attr.trim().split_once(' ')?;
        (k == key).then(|| v.trim().trim_matches('"').to_string())
    })
}

/// Prefix Ensembl-style chromosome names with `chr`; `MT` becomes `chrM`.
pub fn to_ucsc_name(chrom: &str) -> String {
    if chrom.starts_with("chr") {
        chrom.to_string()
    } else if chrom == "MT" {
        "chrM".to_string()
    } else {
        format!("chr{}", chrom)
    }
}

fn widen(current: Option<u32>, value: Option<u32>, pick: fn(u32, u32) -> u32) -> Option<u32> {
    match (current, value) {
        (Some(c), Some(v)) => Some(pick(c, v)),
        (c, v) => c.or(v),
    }
}

///
/// Read transcripts from a GTF.
///
/// `transcript` features are taken as-is. Transcripts that only appear through `exon`
/// rows (UCSC refGene and table-browser exports) get the span from their first exon
/// start to their last exon end. Coordinates are converted from 1-based inclusive to
/// 0-based half-open. Rows that do not have nine columns are skipped with a warning;
/// fields that fail to parse are left empty so the annotation index can drop the record.
///
/// # Arguments
/// - reader: GTF contents
/// - ucsc_names: prefix chromosome names with `chr` (see [to_ucsc_name])
///
pub fn read_gtf_transcripts<R: BufRead>(reader: R, ucsc_names: bool) -> Result<Vec<TranscriptRecord>> {
    let mut records = Vec::new();
    let mut listed: FxHashSet<String> = FxHashSet::default();
    let mut from_exons: Vec<TranscriptRecord> = Vec::new();
    let mut exon_index: FxHashMap<String, usize> = FxHashMap::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') || line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 9 {
            warn!("GTF line {}: expected 9 columns, found {}", idx + 1, fields.len());
            continue;
        }
        let is_exon = match fields[2] {
            "transcript" => false,
            "exon" => true,
            _ => continue,
        };

        let chrom = match ucsc_names {
            true => to_ucsc_name(fields[0]),
            false => fields[0].to_string(),
        };
        let attrs = fields[8];
        let id = gtf_attribute(attrs, "transcript_id");
        let start = fields[3].parse::<u32>().ok().map(|s| s.saturating_sub(1));
        let end = fields[4].parse::<u32>().ok();

        if !is_exon {
            if let Some(id) = &id {
                listed.insert(id.clone());
            }
            records.push(TranscriptRecord {
                id,
                chrom: Some(chrom),
                start,
                end,
                strand: fields[6].parse::<Strand>().ok(),
                gene_name: gtf_attribute(attrs, "gene_name").or_else(|| gtf_attribute(attrs, "gene_id")),
                tss: None,
            });
            continue;
        }

        let Some(id) = id else {
            continue;
        };
        match exon_index.get(&id) {
            Some(&i) => {
                let span = &mut from_exons[i];
                span.start = widen(span.start, start, u32::min);
                span.end = widen(span.end, end, u32::max);
            }
            None => {
                exon_index.insert(id.clone(), from_exons.len());
                from_exons.push(TranscriptRecord {
                    id: Some(id),
                    chrom: Some(chrom),
                    start,
                    end,
                    strand: fields[6].parse::<Strand>().ok(),
                    gene_name: gtf_attribute(attrs, "gene_name").or_else(|| gtf_attribute(attrs, "gene_id")),
                    tss: None,
                });
            }
        }
    }

    let before = records.len();
    records.extend(
        from_exons
            .into_iter()
            .filter(|tx| tx.id.as_ref().is_some_and(|id| !listed.contains(id))),
    );
    if records.len() > before {
        info!(
            "Derived {} transcript spans from exon rows",
            records.len() - before
        );
    }
    if records.is_empty() {
        warn!("GTF has no transcript or exon features, no loci will be profiled");
    }
    Ok(records)
}

/// Read one gene or transcript name per line; blank lines and `#` comments are ignored.
pub fn read_gene_list<R: BufRead>(reader: R) -> Result<FxHashSet<String>> {
    let mut names = FxHashSet::default();
    for line in reader.lines() {
        let line = line?;
        let name = line.trim();
        if name.is_empty() || name.starts_with('#') {
            continue;
        }
        names.insert(name.to_string());
    }
    Ok(names)
}
