/// One scored interval of a bedGraph-like coverage stream.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageInterval {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
    pub score: f64,
}

impl CoverageInterval {
    pub fn new(chrom: impl Into<String>, start: u32, end: u32, score: f64) -> Self {
        CoverageInterval {
            chrom: chrom.into(),
            start,
            end,
            score,
        }
    }
}
