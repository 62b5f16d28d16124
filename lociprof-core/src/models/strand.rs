use std::fmt::{self, Display};
use std::str::FromStr;

use crate::errors::CoreError;

/// Strand orientation of a locus.
///
/// Unstranded features (`.`) are not representable: every locus that gets profiled
/// needs an orientation so its bins can be reported 5' to 3'.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Parse a strand character; anything other than `+` or `-` yields `None`.
    pub fn from_char(c: char) -> Option<Strand> {
        match c {
            '+' => Some(Strand::Forward),
            '-' => Some(Strand::Reverse),
            _ => None,
        }
    }

    pub fn is_reverse(self) -> bool {
        self == Strand::Reverse
    }
}

impl FromStr for Strand {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                Strand::from_char(c).ok_or_else(|| CoreError::InvalidStrand(s.to_string()))
            }
            _ => Err(CoreError::InvalidStrand(s.to_string())),
        }
    }
}

impl Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Forward => write!(f, "+"),
            Strand::Reverse => write!(f, "-"),
        }
    }
}
