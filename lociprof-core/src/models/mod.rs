pub mod chrom_sizes;
pub mod coverage;
pub mod region;
pub mod strand;
pub mod transcript;

// re-export for cleaner imports
pub use self::chrom_sizes::ChromSizes;
pub use self::coverage::CoverageInterval;
pub use self::region::Region;
pub use self::strand::Strand;
pub use self::transcript::{TranscriptAnnotation, TranscriptRecord};
