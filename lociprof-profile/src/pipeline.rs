//! End-to-end wiring: settings in, profile table out.

use std::io::Write;
use std::path::Path;

use log::info;

use lociprof_core::models::{ChromSizes, TranscriptRecord};
use lociprof_core::utils::get_dynamic_reader;

use crate::aggregate::{AggregateStats, StreamAggregator};
use crate::annotation::AnnotationIndex;
use crate::binning::{BinnedLoci, LocusBinner};
use crate::collaborators::CoverageStream;
use crate::config::{LocusSource, ProfileSettings};
use crate::errors::Result;
use crate::normalize::normalize_table;
use crate::profile::{ProfileRow, ProfileTable, ProfileWriter};
use crate::reading::{read_gene_list, read_gtf_transcripts, read_regions};

/// Loci binned and grouped by chromosome, ready for aggregation.
#[derive(Debug, Clone)]
pub struct PreparedLoci {
    pub loci: BinnedLoci,
    pub locus_count: usize,
    pub total_bins: usize,
}

fn read_source(source: &LocusSource, ucsc_names: bool) -> Result<Vec<TranscriptRecord>> {
    match source {
        LocusSource::Region(path) => {
            read_regions(get_dynamic_reader(path)?, &path.display().to_string())
        }
        LocusSource::Gtf(path) => read_gtf_transcripts(get_dynamic_reader(path)?, ucsc_names),
    }
}

///
/// Read the locus source, merge and filter it, and compute every locus's bins.
///
/// # Arguments
/// - settings: a validated configuration
/// - chrom_sizes: required when the geometry clips to chromosome ends
///
pub fn prepare_loci(settings: &ProfileSettings, chrom_sizes: Option<&ChromSizes>) -> Result<PreparedLoci> {
    let restrict = match &settings.gene_list {
        Some(path) => {
            let names = read_gene_list(get_dynamic_reader(path)?)?;
            info!("Restricting to {} names from {}", names.len(), path.display());
            Some(names)
        }
        None => None,
    };

    let index = AnnotationIndex::from_records(read_source(&settings.source, settings.ucsc_names)?);
    let loci = index.loci(settings.mode, settings.geometry.is_tss(), restrict.as_ref());

    let binner = LocusBinner::new(settings.geometry, chrom_sizes)?;
    let binned = binner.bin_all(&loci)?;
    info!(
        "Prepared {} loci on {} chromosomes, {} bins each",
        loci.len(),
        binned.len(),
        binner.total_bins()
    );

    Ok(PreparedLoci {
        loci: binned,
        locus_count: loci.len(),
        total_bins: binner.total_bins(),
    })
}

///
/// Aggregate `coverage` over the prepared loci and write the profile table.
///
/// Without normalization rows are streamed straight to `writer`; with it the table is
/// collected first. `on_row` is called once per aggregated row.
///
pub fn write_profile<W, F>(
    prepared: PreparedLoci,
    coverage: CoverageStream,
    settings: &ProfileSettings,
    writer: W,
    mut on_row: F,
) -> Result<AggregateStats>
where
    W: Write,
    F: FnMut(&ProfileRow),
{
    let total_bins = prepared.total_bins;
    let mut aggregator = StreamAggregator::new(prepared.loci, total_bins, coverage);

    if settings.genome_norm.is_none() && settings.gene_norm.is_none() {
        let mut out = ProfileWriter::new(writer, total_bins, settings.position);
        out.write_header()?;
        for row in aggregator.by_ref() {
            let row = row?;
            on_row(&row);
            out.write_row(&row)?;
        }
        out.finish()?;
    } else {
        let mut table = ProfileTable::new(total_bins, settings.position);
        for row in aggregator.by_ref() {
            let row = row?;
            on_row(&row);
            table.rows.push(row);
        }
        normalize_table(table, settings.genome_norm, settings.gene_norm).write_to(writer)?;
    }

    let stats = aggregator.stats();
    info!(
        "Wrote {} rows: {} matched, {} on chromosomes without coverage; peak buffer {} intervals",
        stats.matched_rows + stats.unseen_rows,
        stats.matched_rows,
        stats.unseen_rows,
        stats.peak_buffer
    );
    Ok(stats)
}

/// Read a profile table from disk and apply the requested passes.
pub fn normalize_file(path: &Path, genome_norm: Option<f64>, gene_norm: Option<f64>) -> Result<ProfileTable> {
    let table = ProfileTable::from_reader(get_dynamic_reader(path)?, &path.display().to_string())?;
    info!("Read {} rows of {} bins from {}", table.len(), table.total_bins, path.display());
    Ok(normalize_table(table, genome_norm, gene_norm))
}
