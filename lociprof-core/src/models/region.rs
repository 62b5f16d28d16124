use crate::errors::Result;
use crate::models::Strand;

///
/// Region struct, representation of one line of a BED-like file
///
#[derive(Eq, PartialEq, Hash, Debug, Clone)]
pub struct Region {
    pub chr: String,
    pub start: u32,
    pub end: u32,

    pub rest: Option<String>,
}

impl Region {
    ///
    /// Parse one BED line (BED3 or wider). Columns past the third are kept in `rest`.
    ///
    pub fn from_bed_line(line: &str) -> Option<Region> {
        let mut fields = line.splitn(4, '\t');
        let chr = fields.next()?.trim();
        let start = fields.next()?.trim().parse::<u32>().ok()?;
        let end = fields.next()?.trim().parse::<u32>().ok()?;
        let rest = fields.next().map(|s| s.to_string()).filter(|s| !s.is_empty());

        if chr.is_empty() {
            return None;
        }

        Some(Region {
            chr: chr.to_string(),
            start,
            end,
            rest,
        })
    }

    /// BED column 4, if present and not a placeholder.
    pub fn name(&self) -> Option<&str> {
        self.rest_field(0).filter(|s| *s != ".")
    }

    /// BED column 6. `None` for BED3-5 or an unstranded `.` entry; anything other than
    /// `+`, `-` or `.` is an error.
    pub fn strand(&self) -> Result<Option<Strand>> {
        match self.rest_field(2) {
            None | Some(".") => Ok(None),
            Some(s) => s.parse::<Strand>().map(Some),
        }
    }

    fn rest_field(&self, idx: usize) -> Option<&str> {
        self.rest
            .as_deref()
            .and_then(|r| r.split('\t').nth(idx))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// `chr:start-end`, used as a fallback locus name.
    pub fn label(&self) -> String {
        format!("{}:{}-{}", self.chr, self.start, self.end)
    }
}
