//! Profile rows and the tab-separated profile table format.
//!
//! ```text
//! gene_name	1	2	...	N
//! chr	start	end	gene_name	1	2	...	N    (with positions)
//! ```

use std::io::{BufRead, Write};

use crate::binning::LocusBins;
use crate::errors::{ProfileError, Result};

pub const NAME_COLUMN: &str = "gene_name";
pub const POSITION_COLUMNS: [&str; 3] = ["chr", "start", "end"];

/// Genomic coordinates reported next to a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub chrom: String,
    pub start: u32,
    pub end: u32,
}

/// One output row: a name, optional coordinates and one score per bin.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub name: String,
    pub position: Option<Position>,
    pub scores: Vec<f64>,
}

impl ProfileRow {
    /// Build a row from per-bin scores in genomic order; minus-strand loci are reversed
    /// so that the first score is always the 5' end.
    pub fn from_locus(locus: &LocusBins, mut scores: Vec<f64>) -> Self {
        if locus.strand.is_reverse() {
            scores.reverse();
        }
        ProfileRow {
            name: locus.name.clone(),
            position: Some(Position {
                chrom: locus.chrom.clone(),
                start: locus.start,
                end: locus.end,
            }),
            scores,
        }
    }

    /// An all-zero row for a locus that never met any coverage.
    pub fn zeros(locus: &LocusBins, total_bins: usize) -> Self {
        Self::from_locus(locus, vec![0.0; total_bins])
    }

    pub fn max_score(&self) -> f64 {
        self.scores.iter().copied().fold(0.0, f64::max)
    }
}

/// Writes rows in the profile table format, scores to two decimals.
pub struct ProfileWriter<W: Write> {
    writer: W,
    position: bool,
    total_bins: usize,
}

impl<W: Write> ProfileWriter<W> {
    pub fn new(writer: W, total_bins: usize, position: bool) -> Self {
        ProfileWriter {
            writer,
            position,
            total_bins,
        }
    }

    pub fn write_header(&mut self) -> Result<()> {
        if self.position {
            write!(self.writer, "{}\t", POSITION_COLUMNS.join("\t"))?;
        }
        write!(self.writer, "{}", NAME_COLUMN)?;
        for i in 1..=self.total_bins {
            write!(self.writer, "\t{}", i)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn write_row(&mut self, row: &ProfileRow) -> Result<()> {
        if self.position {
            match &row.position {
                Some(p) => write!(self.writer, "{}\t{}\t{}\t", p.chrom, p.start, p.end)?,
                None => write!(self.writer, ".\t.\t.\t")?,
            }
        }
        write!(self.writer, "{}", row.name)?;
        for score in &row.scores {
            write!(self.writer, "\t{:.2}", score)?;
        }
        writeln!(self.writer)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// A whole profile table held in memory, as the normalization passes need it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileTable {
    pub total_bins: usize,
    pub position: bool,
    pub rows: Vec<ProfileRow>,
}

impl ProfileTable {
    pub fn new(total_bins: usize, position: bool) -> Self {
        ProfileTable {
            total_bins,
            position,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate over every score of every row.
    pub fn scores(&self) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().flat_map(|r| r.scores.iter().copied())
    }

    ///
    /// Parse a profile table. Whether coordinates are present is taken from the header.
    ///
    /// # Arguments
    /// - reader: the table contents
    /// - source_name: used in error messages
    ///
    pub fn from_reader<R: BufRead>(reader: R, source_name: &str) -> Result<Self> {
        let mut lines = reader.lines().enumerate();

        let header = loop {
            match lines.next() {
                Some((_, line)) => {
                    let line = line?;
                    if !line.trim().is_empty() {
                        break line;
                    }
                }
                None => return Err(ProfileError::parse(source_name, 1, "missing header")),
            }
        };
        let columns: Vec<&str> = header.trim_end().split('\t').collect();
        let position = columns.first() == Some(&POSITION_COLUMNS[0]);
        let leading = if position { 4 } else { 1 };
        if columns.len() < leading || columns[leading - 1] != NAME_COLUMN {
            return Err(ProfileError::parse(
                source_name,
                1,
                format!("expected '{}' column in header", NAME_COLUMN),
            ));
        }
        let total_bins = columns.len() - leading;

        let mut table = ProfileTable::new(total_bins, position);
        for (idx, line) in lines {
            let line = line?;
            let line_no = idx + 1;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.trim_end_matches(['\n', '\r']).split('\t').collect();
            if fields.len() != leading + total_bins {
                return Err(ProfileError::parse(
                    source_name,
                    line_no,
                    format!("expected {} columns, found {}", leading + total_bins, fields.len()),
                ));
            }

            let position = if position {
                let coord = |s: &str| {
                    s.parse::<u32>().map_err(|e| {
                        ProfileError::parse(source_name, line_no, format!("bad coordinate '{s}': {e}"))
                    })
                };
                Some(Position {
                    chrom: fields[0].to_string(),
                    start: coord(fields[1])?,
                    end: coord(fields[2])?,
                })
            } else {
                None
            };

            let scores = fields[leading..]
                .iter()
                .map(|s| {
                    s.trim().parse::<f64>().map_err(|e| {
                        ProfileError::parse(source_name, line_no, format!("bad score '{s}': {e}"))
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            table.rows.push(ProfileRow {
                name: fields[leading - 1].to_string(),
                position,
                scores,
            });
        }
        Ok(table)
    }

    /// Write the table, header first.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<W> {
        let mut out = ProfileWriter::new(writer, self.total_bins, self.position);
        out.write_header()?;
        for row in &self.rows {
            out.write_row(row)?;
        }
        out.finish()
    }
}
