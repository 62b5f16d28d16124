use crate::errors::CoreError;
use crate::models::Strand;

/// A transcript as produced by an annotation reader, before validation.
///
/// Readers fill in whatever they could parse; missing mandatory fields are
/// reported when converting into a [TranscriptAnnotation].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranscriptRecord {
    pub id: Option<String>,
    pub chrom: Option<String>,
    pub start: Option<u32>,
    pub end: Option<u32>,
    pub strand: Option<Strand>,
    pub gene_name: Option<String>,
    pub tss: Option<u32>,
}

/// A validated transcript span, 0-based half-open.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranscriptAnnotation {
    pub id: String,
    pub chrom: String,
    pub start: u32,
    pub end: u32,
    pub strand: Strand,
    pub gene_name: String,
    pub tss: Option<u32>,
}

impl TranscriptAnnotation {
    /// Transcription start site: the explicit position when the annotation
    /// carries one, otherwise `start` on `+` and `end` on `-`.
    pub fn tss_position(&self) -> u32 {
        self.tss.unwrap_or(match self.strand {
            Strand::Forward => self.start,
            Strand::Reverse => self.end,
        })
    }
}

impl TryFrom<TranscriptRecord> for TranscriptAnnotation {
    type Error = CoreError;

    fn try_from(record: TranscriptRecord) -> Result<Self, Self::Error> {
        let label = record
            .id
            .clone()
            .or_else(|| record.gene_name.clone())
            .unwrap_or_else(|| "<unnamed>".to_string());
        let missing = |field: &str| CoreError::MalformedRecord(format!("{label}: missing {field}"));

        let chrom = record
            .chrom
            .filter(|c| !c.is_empty())
            .ok_or_else(|| missing("chromosome"))?;
        let start = record.start.ok_or_else(|| missing("start"))?;
        let end = record.end.ok_or_else(|| missing("end"))?;
        let strand = record.strand.ok_or_else(|| missing("strand"))?;

        if start > end {
            return Err(CoreError::MalformedRecord(format!(
                "{label}: start {start} is past end {end}"
            )));
        }

        // either name stands in for the other
        let (id, gene_name) = match (record.id, record.gene_name) {
            (Some(id), Some(gene)) => (id, gene),
            (Some(id), None) => (id.clone(), id),
            (None, Some(gene)) => (gene.clone(), gene),
            (None, None) => return Err(missing("transcript id and gene name")),
        };

        Ok(TranscriptAnnotation {
            id,
            chrom,
            start,
            end,
            strand,
            gene_name,
            tss: record.tss,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn record() -> TranscriptRecord {
        TranscriptRecord {
            id: Some("tx1".to_string()),
            chrom: Some("chr1".to_string()),
            start: Some(100),
            end: Some(500),
            strand: Some(Strand::Reverse),
            gene_name: Some("GENE1".to_string()),
            tss: None,
        }
    }

    #[rstest]
    fn test_valid_record_converts(record: TranscriptRecord) {
        let tx = TranscriptAnnotation::try_from(record).unwrap();
        assert_eq!(tx.id, "tx1");
        assert_eq!(tx.gene_name, "GENE1");
        assert_eq!(tx.tss_position(), 500);
    }

    #[rstest]
    fn test_explicit_tss_wins(mut record: TranscriptRecord) {
        record.tss = Some(420);
        let tx = TranscriptAnnotation::try_from(record).unwrap();
        assert_eq!(tx.tss_position(), 420);
    }

    #[rstest]
    fn test_missing_strand_is_malformed(mut record: TranscriptRecord) {
        record.strand = None;
        let err = TranscriptAnnotation::try_from(record).unwrap_err();
        assert!(err.to_string().contains("missing strand"));
    }

    #[rstest]
    fn test_inverted_coordinates_are_malformed(mut record: TranscriptRecord) {
        record.start = Some(600);
        assert!(TranscriptAnnotation::try_from(record).is_err());
    }

    #[rstest]
    fn test_gene_name_falls_back_to_id(mut record: TranscriptRecord) {
        record.gene_name = None;
        let tx = TranscriptAnnotation::try_from(record).unwrap();
        assert_eq!(tx.gene_name, "tx1");
    }
}
