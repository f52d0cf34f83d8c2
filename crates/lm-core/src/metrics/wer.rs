use super::{edit_distance, segment_references, IncrementalMetric, MetricError, References, ReplaceableMetric};
use crate::token::Token;

/// Word error rate against the closest reference of each segment.
///
/// The corpus score is `-(total edits) / (total reference length)`, so
/// higher is better and a perfect corpus scores 0. Edits are pooled over
/// the corpus rather than averaged per segment, so long segments weigh
/// more than short ones.
pub struct WerMetric {
    references: References,
    /// Per segment: (edits, length of the closest reference).
    segments: Vec<(usize, usize)>,
    total_edits: usize,
    total_ref_len: usize,
}

impl WerMetric {
    pub fn new(references: References) -> Self {
        Self {
            references,
            segments: Vec::new(),
            total_edits: 0,
            total_ref_len: 0,
        }
    }

    /// Minimum edit distance over the references of `segment`; ties prefer
    /// the shorter reference.
    fn closest(&self, segment: usize, hypothesis: &[Token]) -> Result<(usize, usize), MetricError> {
        segment_references(&self.references, segment)?
            .iter()
            .map(|r| (edit_distance(hypothesis, r), r.len()))
            .min()
            .ok_or(MetricError::MissingReferences(segment))
    }

    pub fn total_edits(&self) -> usize {
        self.total_edits
    }
}

impl IncrementalMetric for WerMetric {
    fn add(&mut self, hypothesis: &[Token]) -> Result<(), MetricError> {
        let (edits, ref_len) = self.closest(self.segments.len(), hypothesis)?;
        self.segments.push((edits, ref_len));
        self.total_edits += edits;
        self.total_ref_len += ref_len;
        Ok(())
    }

    fn score(&self) -> f64 {
        if self.segments.is_empty() {
            return 0.0;
        }
        -(self.total_edits as f64) / self.total_ref_len.max(1) as f64
    }

    fn len(&self) -> usize {
        self.segments.len()
    }

    fn max_score(&self) -> f64 {
        0.0
    }
}

impl ReplaceableMetric for WerMetric {
    fn replace(&mut self, index: usize, hypothesis: &[Token]) -> Result<(), MetricError> {
        let len = self.segments.len();
        if index >= len {
            return Err(MetricError::IndexOutOfRange { index, len });
        }
        let (edits, ref_len) = self.closest(index, hypothesis)?;
        let (old_edits, old_ref_len) = std::mem::replace(&mut self.segments[index], (edits, ref_len));
        self.total_edits = self.total_edits - old_edits + edits;
        self.total_ref_len = self.total_ref_len - old_ref_len + ref_len;
        Ok(())
    }
}
