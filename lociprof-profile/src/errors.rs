use std::io;

use lociprof_core::CoreError;
use thiserror::Error;

/// Error type for profile construction and aggregation.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// The run configuration is inconsistent; raised before any aggregation starts.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A locus (or read) chromosome is missing from the chromosome sizes it must be clipped to.
    #[error("Chromosome '{0}' not found in chromosome sizes")]
    UnknownChromosome(String),

    /// A region or gene body that cannot be split into bins.
    #[error("Locus '{name}' at {chrom}:{start}-{end} has zero length")]
    EmptyLocus {
        name: String,
        chrom: String,
        start: u32,
        end: u32,
    },

    /// A line of an input table could not be parsed.
    #[error("{source_name} line {line}: {reason}")]
    Parse {
        source_name: String,
        line: usize,
        reason: String,
    },

    /// The coverage input violates the (chromosome block, start) sort order.
    #[error("Input is not sorted at line {line}: {reason}")]
    Unsorted { line: usize, reason: String },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ProfileError {
    pub(crate) fn parse(source_name: &str, line: usize, reason: impl Into<String>) -> Self {
        ProfileError::Parse {
            source_name: source_name.to_string(),
            line,
            reason: reason.into(),
        }
    }
}

/// Result type alias for lociprof-profile operations.
pub type Result<T> = std::result::Result<T, ProfileError>;
