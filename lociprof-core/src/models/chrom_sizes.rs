use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use crate::errors::{CoreError, Result};
use crate::utils::get_dynamic_reader;

/// Chromosome name to length (bp). Loaded once, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChromSizes {
    sizes: HashMap<String, u32>,
}

impl ChromSizes {
    /// Parse a chrom.sizes file (tab-separated: name\tsize) from any reader.
    ///
    /// Blank lines and `#` comments are skipped; anything else must have a name
    /// and a non-negative integer size.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut sizes = HashMap::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let (name, size) = match (fields.next(), fields.next()) {
                (Some(name), Some(size)) => (name, size),
                _ => {
                    return Err(CoreError::ChromSizesParseError {
                        line: idx + 1,
                        reason: format!("fewer than 2 fields: '{}'", trimmed),
                    });
                }
            };
            let size: u32 = size.parse().map_err(|e| CoreError::ChromSizesParseError {
                line: idx + 1,
                reason: format!("cannot parse size '{}': {}", size, e),
            })?;

            sizes.insert(name.to_string(), size);
        }
        Ok(ChromSizes { sizes })
    }

    pub fn get(&self, chrom: &str) -> Option<u32> {
        self.sizes.get(chrom).copied()
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl TryFrom<&Path> for ChromSizes {
    type Error = CoreError;

    fn try_from(value: &Path) -> Result<Self> {
        let reader = get_dynamic_reader(value)?;
        ChromSizes::from_reader(reader)
    }
}

impl FromIterator<(String, u32)> for ChromSizes {
    fn from_iter<T: IntoIterator<Item = (String, u32)>>(iter: T) -> Self {
        ChromSizes {
            sizes: iter.into_iter().collect(),
        }
    }
}
