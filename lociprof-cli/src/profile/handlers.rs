use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::ArgMatches;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use lociprof_profile::collaborators::{
    BedGraphPassthrough, CoverageConverter, ReadPileup, SortednessCheck, Sorter, load_chrom_sizes,
};
use lociprof_profile::pipeline::{prepare_loci, write_profile};
use lociprof_profile::ProfileConfig;

use super::cli::FORMAT_BED;

fn path_flag(matches: &ArgMatches, id: &str) -> Option<PathBuf> {
    matches.get_one::<String>(id).map(PathBuf::from)
}

///
/// Build the run configuration: the `--config` file if given, then every flag on top.
///
pub fn config_from_matches(matches: &ArgMatches) -> Result<ProfileConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ProfileConfig::try_from(Path::new(path))
            .with_context(|| format!("Failed to read config file {path}"))?,
        None => ProfileConfig::default(),
    };

    macro_rules! overlay {
        ($field:ident, $id:literal, path) => {
            if let Some(value) = path_flag(matches, $id) {
                config.$field = Some(value);
            }
        };
        ($field:ident, $id:literal, $ty:ty) => {
            if let Some(value) = matches.get_one::<$ty>($id).cloned() {
                config.$field = Some(value);
            }
        };
        ($field:ident, $id:literal) => {
            if matches.get_flag($id) {
                config.$field = true;
            }
        };
    }

    overlay!(region, "region", path);
    overlay!(gtf, "gtf", path);
    overlay!(gene_list, "gene-list", path);
    overlay!(region_bins, "region-bins", i64);

    overlay!(tss, "tss");
    overlay!(tss_up, "tss-up", u32);
    overlay!(tss_down, "tss-down", u32);
    overlay!(tss_bins, "tss-bins", i64);

    overlay!(upstream, "upstream", u32);
    overlay!(up_bins, "up-bins", i64);
    overlay!(downstream, "downstream", u32);
    overlay!(down_bins, "down-bins", i64);
    overlay!(gene_bins, "gene-bins", i64);

    overlay!(transcript, "transcript");
    overlay!(position, "position");
    overlay!(genome_norm, "genome-norm", f64);
    overlay!(gene_norm, "gene-norm", f64);

    overlay!(chrom_sizes, "chrom-sizes", path);
    overlay!(genome, "genome", String);
    overlay!(genome_dir, "genome-dir", path);
    overlay!(ucsc_names, "ucsc-names");

    Ok(config)
}

pub fn run_profile(matches: &ArgMatches) -> Result<()> {
    let coverage = matches
        .get_one::<String>("coverage")
        .context("--coverage is required")?;
    let coverage = Path::new(coverage);

    let settings = config_from_matches(matches)?
        .validate()
        .context("Invalid profile configuration")?;

    let chrom_sizes = match &settings.chrom_sizes {
        Some(source) => Some(load_chrom_sizes(source).context("Failed to load chromosome sizes")?),
        None => None,
    };

    if matches.get_flag("check-sorted") {
        SortednessCheck
            .ensure_sorted(coverage)
            .with_context(|| format!("{} is not sorted", coverage.display()))?;
    }

    let prepared = prepare_loci(&settings, chrom_sizes.as_ref()).context("Failed to prepare loci")?;

    let converter: &dyn CoverageConverter = match matches.get_one::<String>("input-format") {
        Some(format) if format == FORMAT_BED => &ReadPileup,
        _ => &BedGraphPassthrough,
    };
    let stream = converter
        .bed_to_bedgraph(coverage, chrom_sizes.as_ref())
        .with_context(|| format!("Failed to open coverage {}", coverage.display()))?;

    let writer: Box<dyn Write> = match matches.get_one::<String>("output") {
        Some(path) => Box::new(
            File::create(path).with_context(|| format!("Failed to create output file {path}"))?,
        ),
        None => Box::new(io::stdout().lock()),
    };
    let writer = BufWriter::new(writer);

    let pb = ProgressBar::new(prepared.locus_count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?,
    );
    pb.set_message("Aggregating loci");

    let stats = write_profile(prepared, stream, &settings, writer, |_| pb.inc(1))
        .context("Profile aggregation failed")?;
    pb.finish_and_clear();

    if stats.skipped_intervals > 0 {
        info!(
            "{} coverage intervals fell on chromosomes without loci",
            stats.skipped_intervals
        );
    }

    Ok(())
}
