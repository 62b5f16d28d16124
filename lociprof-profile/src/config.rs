//! Run configuration.
//!
//! [ProfileConfig] is the raw, user-facing option set (TOML file keys or CLI flags).
//! [ProfileConfig::validate] checks it as a whole and produces [ProfileSettings], the
//! only form the engine consumes, so every configuration error surfaces before any
//! input is read.

use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::annotation::LocusMode;
use crate::errors::{ProfileError, Result};

pub const DEFAULT_REGION_BINS: i64 = 20;
pub const DEFAULT_TSS_UP: u32 = 1000;
pub const DEFAULT_TSS_DOWN: u32 = 1000;
pub const DEFAULT_TSS_BINS: i64 = 20;
pub const DEFAULT_GENE_BINS: i64 = 40;
pub const DEFAULT_FLANK_BINS: i64 = 10;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ProfileConfig {
    pub gene_list: Option<PathBuf>,
    pub region: Option<PathBuf>,
    pub gtf: Option<PathBuf>,
    pub region_bins: Option<i64>,

    pub tss: bool,
    pub tss_up: Option<u32>,
    pub tss_down: Option<u32>,
    pub tss_bins: Option<i64>,

    pub upstream: Option<u32>,
    pub up_bins: Option<i64>,
    pub downstream: Option<u32>,
    pub down_bins: Option<i64>,
    pub gene_bins: Option<i64>,

    pub transcript: bool,
    pub position: bool,
    pub genome_norm: Option<f64>,
    pub gene_norm: Option<f64>,

    pub chrom_sizes: Option<PathBuf>,
    pub genome: Option<String>,
    pub genome_dir: Option<PathBuf>,
    /// Prefix Ensembl-style chromosome names (`1`, `X`) in the GTF with `chr`.
    pub ucsc_names: bool,
}

/// Where loci come from.
#[derive(Debug, Clone, PartialEq)]
pub enum LocusSource {
    Region(PathBuf),
    Gtf(PathBuf),
}

/// Where chromosome lengths come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ChromSizesSource {
    File(PathBuf),
    Genome { name: String, dir: PathBuf },
}

/// Bin layout of every locus in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Geometry {
    Region {
        bins: usize,
    },
    Tss {
        upstream: u32,
        downstream: u32,
        bins: usize,
    },
    GeneBody {
        upstream: u32,
        up_bins: usize,
        gene_bins: usize,
        downstream: u32,
        down_bins: usize,
    },
}

impl Geometry {
    /// Number of bins every locus is split into.
    pub fn total_bins(&self) -> usize {
        match *self {
            Geometry::Region { bins } => bins,
            Geometry::Tss { bins, .. } => bins,
            Geometry::GeneBody {
                up_bins,
                gene_bins,
                down_bins,
                ..
            } => up_bins + gene_bins + down_bins,
        }
    }

    /// TSS windows and downstream-of-end flanks are clipped to chromosome length.
    pub fn needs_chrom_sizes(&self) -> bool {
        match *self {
            Geometry::Region { .. } => false,
            Geometry::Tss { .. } => true,
            Geometry::GeneBody {
                upstream,
                downstream,
                ..
            } => upstream > 0 || downstream > 0,
        }
    }

    pub fn is_tss(&self) -> bool {
        matches!(self, Geometry::Tss { .. })
    }
}

/// A validated configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSettings {
    pub source: LocusSource,
    pub geometry: Geometry,
    pub mode: LocusMode,
    pub gene_list: Option<PathBuf>,
    pub position: bool,
    pub genome_norm: Option<f64>,
    pub gene_norm: Option<f64>,
    pub chrom_sizes: Option<ChromSizesSource>,
    pub ucsc_names: bool,
}

impl TryFrom<&Path> for ProfileConfig {
    type Error = ProfileError;

    fn try_from(path: &Path) -> Result<Self> {
        let toml_str = read_to_string(path)?;
        let config = toml::from_str(&toml_str)?;
        Ok(config)
    }
}

fn positive_bins(option: &str, value: i64) -> Result<usize> {
    if value <= 0 {
        return Err(ProfileError::Config(format!(
            "{option} must be a positive bin count, got {value}"
        )));
    }
    Ok(value as usize)
}

fn positive_scale(option: &str, value: Option<f64>) -> Result<Option<f64>> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(ProfileError::Config(format!(
            "{option} must be a positive target scale, got {v}"
        ))),
        other => Ok(other),
    }
}

impl ProfileConfig {
    fn has_flank_options(&self) -> bool {
        self.upstream.is_some()
            || self.downstream.is_some()
            || self.up_bins.is_some()
            || self.down_bins.is_some()
            || self.gene_bins.is_some()
    }

    fn has_tss_options(&self) -> bool {
        self.tss || self.tss_up.is_some() || self.tss_down.is_some() || self.tss_bins.is_some()
    }

    fn geometry(&self, source: &LocusSource) -> Result<Geometry> {
        if let LocusSource::Region(_) = source {
            if self.has_tss_options() || self.has_flank_options() {
                return Err(ProfileError::Config(
                    "region input only supports regionBins; TSS and flank options need a GTF"
                        .to_string(),
                ));
            }
            let bins = positive_bins(
                "regionBins",
                self.region_bins.unwrap_or(DEFAULT_REGION_BINS),
            )?;
            return Ok(Geometry::Region { bins });
        }

        if self.region_bins.is_some() {
            return Err(ProfileError::Config(
                "regionBins only applies to region input".to_string(),
            ));
        }

        if self.tss {
            if self.has_flank_options() {
                return Err(ProfileError::Config(
                    "tss and gene-body flank options (upstream/downstream/upBins/downBins/geneBins) are mutually exclusive"
                        .to_string(),
                ));
            }
            let upstream = self.tss_up.unwrap_or(DEFAULT_TSS_UP);
            let downstream = self.tss_down.unwrap_or(DEFAULT_TSS_DOWN);
            if upstream as u64 + downstream as u64 == 0 {
                return Err(ProfileError::Config(
                    "tssUp and tssDown are both 0, the TSS window is empty".to_string(),
                ));
            }
            let bins = positive_bins("tssBins", self.tss_bins.unwrap_or(DEFAULT_TSS_BINS))?;
            return Ok(Geometry::Tss {
                upstream,
                downstream,
                bins,
            });
        }

        if self.tss_up.is_some() || self.tss_down.is_some() || self.tss_bins.is_some() {
            return Err(ProfileError::Config(
                "tssUp/tssDown/tssBins require tss".to_string(),
            ));
        }

        let upstream = self.upstream.unwrap_or(0);
        let downstream = self.downstream.unwrap_or(0);
        let gene_bins = positive_bins("geneBins", self.gene_bins.unwrap_or(DEFAULT_GENE_BINS))?;
        // a zero-length flank contributes no bins at all
        let up_bins = match upstream {
            0 => 0,
            _ => positive_bins("upBins", self.up_bins.unwrap_or(DEFAULT_FLANK_BINS))?,
        };
        let down_bins = match downstream {
            0 => 0,
            _ => positive_bins("downBins", self.down_bins.unwrap_or(DEFAULT_FLANK_BINS))?,
        };

        Ok(Geometry::GeneBody {
            upstream,
            up_bins,
            gene_bins,
            downstream,
            down_bins,
        })
    }

    fn chrom_sizes_source(&self) -> Result<Option<ChromSizesSource>> {
        match (&self.chrom_sizes, &self.genome) {
            (Some(_), Some(_)) => Err(ProfileError::Config(
                "chromSizes and genome are mutually exclusive".to_string(),
            )),
            (Some(path), None) => Ok(Some(ChromSizesSource::File(path.clone()))),
            (None, Some(name)) => {
                let dir = self.genome_dir.clone().ok_or_else(|| {
                    ProfileError::Config("genome requires genomeDir".to_string())
                })?;
                Ok(Some(ChromSizesSource::Genome {
                    name: name.clone(),
                    dir,
                }))
            }
            (None, None) => Ok(None),
        }
    }

    /// Check the configuration as a whole.
    pub fn validate(&self) -> Result<ProfileSettings> {
        let source = match (&self.region, &self.gtf) {
            (Some(region), None) => LocusSource::Region(region.clone()),
            (None, Some(gtf)) => LocusSource::Gtf(gtf.clone()),
            (Some(_), Some(_)) => {
                return Err(ProfileError::Config(
                    "region and gtf are mutually exclusive, set exactly one".to_string(),
                ));
            }
            (None, None) => {
                return Err(ProfileError::Config(
                    "no locus source, set exactly one of region or gtf".to_string(),
                ));
            }
        };

        let geometry = self.geometry(&source)?;
        let chrom_sizes = self.chrom_sizes_source()?;
        if geometry.needs_chrom_sizes() && chrom_sizes.is_none() {
            return Err(ProfileError::Config(
                "TSS and flank geometries clip to chromosome ends, provide chromSizes or genome"
                    .to_string(),
            ));
        }

        // regions are never merged
        let mode = match (&source, self.transcript) {
            (LocusSource::Region(_), _) | (_, true) => LocusMode::PerTranscript,
            (LocusSource::Gtf(_), false) => LocusMode::PerGene,
        };

        Ok(ProfileSettings {
            source,
            geometry,
            mode,
            gene_list: self.gene_list.clone(),
            position: self.position,
            genome_norm: positive_scale("genomeNorm", self.genome_norm)?,
            gene_norm: positive_scale("geneNorm", self.gene_norm)?,
            chrom_sizes,
            ucsc_names: self.ucsc_names,
        })
    }
}
