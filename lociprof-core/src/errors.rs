use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Can't read file: {0}")]
    FileReadError(String),

    #[error("Error parsing chrom sizes line {line}: {reason}")]
    ChromSizesParseError { line: usize, reason: String },

    #[error("Invalid strand: '{0}'")]
    InvalidStrand(String),

    #[error("Malformed transcript record: {0}")]
    MalformedRecord(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
