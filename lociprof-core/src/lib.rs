//! # Core primitives for lociprof
//!
//! Small, dependency-light building blocks used by the profiling engine:
//! strands, BED-like regions, transcript annotations, chromosome sizes, scored coverage
//! intervals and gzip-aware readers.
//!
//! All coordinates are 0-based, half-open (`[start, end)`), the BED/bedGraph convention.
pub mod errors;
pub mod models;
pub mod utils;

pub use errors::CoreError;
