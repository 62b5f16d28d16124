//! # lociprof-profile
//!
//! Fixed-width signal profiles over genomic loci.
//!
//! Loci (gene bodies, TSS windows or arbitrary regions) are each split into the same number
//! of bins, then joined against a chromosome-sorted coverage stream in a single forward pass.
//! Every bin gets the length-weighted average score of the coverage overlapping it, and each
//! locus becomes one row of a tab-separated table.
//!
//! ## Main Components
//!
//! - **`AnnotationIndex`**: validated transcripts, optionally merged per gene
//! - **`LocusBinner`**: region, TSS-window and gene-body-with-flanks bin layouts
//! - **`StreamAggregator`**: the merge-join, an iterator of [ProfileRow]s
//! - **`GenomeNormalizer`** / **`GeneNormalizer`**: post-hoc rescaling of a table
//!
//! ## Example
//!
//! ```rust
//! use lociprof_core::models::{CoverageInterval, Strand};
//! use lociprof_profile::annotation::GeneLocus;
//! use lociprof_profile::binning::LocusBinner;
//! use lociprof_profile::config::Geometry;
//! use lociprof_profile::StreamAggregator;
//!
//! let locus = GeneLocus {
//!     name: "peak1".to_string(),
//!     chrom: "chr1".to_string(),
//!     start: 100,
//!     end: 200,
//!     strand: Strand::Forward,
//!     tss: 100,
//! };
//! let binner = LocusBinner::new(Geometry::Region { bins: 2 }, None).unwrap();
//! let loci = binner.bin_all(&[locus]).unwrap();
//!
//! let coverage = vec![
//!     CoverageInterval::new("chr1", 90, 120, 2.0),
//!     CoverageInterval::new("chr1", 120, 200, 1.0),
//! ];
//! let rows: Vec<_> = StreamAggregator::new(loci, 2, coverage.into_iter().map(Ok))
//!     .collect::<Result<_, _>>()
//!     .unwrap();
//! assert_eq!(rows[0].scores, vec![1.4, 1.0]);
//! ```
//!
pub mod aggregate;
pub mod annotation;
pub mod binning;
pub mod collaborators;
pub mod config;
pub mod errors;
pub mod normalize;
pub mod pipeline;
pub mod profile;
pub mod reading;

// re-expose the main types
pub use aggregate::{AggregateStats, StreamAggregator};
pub use annotation::{AnnotationIndex, GeneLocus, LocusMode};
pub use binning::{Bin, LocusBinner, LocusBins};
pub use config::{ProfileConfig, ProfileSettings};
pub use errors::{ProfileError, Result};
pub use normalize::{GeneNormalizer, GenomeNormalizer, ProfileNormalizer};
pub use profile::{ProfileRow, ProfileTable, ProfileWriter};
