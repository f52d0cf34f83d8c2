use super::{IncrementalMetric, MetricError, ReplaceableMetric};
use crate::token::Token;

/// Weighted sum of metrics that all see the same hypotheses.
pub struct LinearCombination {
    parts: Vec<(f64, Box<dyn ReplaceableMetric>)>,
}

impl LinearCombination {
    pub fn new(parts: Vec<(f64, Box<dyn ReplaceableMetric>)>) -> Result<Box<dyn ReplaceableMetric>, MetricError> {
        if parts.is_empty() {
            return Err(MetricError::InvalidSpec {
                spec: String::new(),
                reason: "linear combination needs at least one metric".to_string(),
            });
        }
        if let Some((_, first)) = parts.first() {
            let len = first.len();
            if parts.iter().any(|(_, m)| m.len() != len) {
                return Err(MetricError::InvalidSpec {
                    spec: String::new(),
                    reason: "combined metrics hold different numbers of segments".to_string(),
                });
            }
        }
        Ok(Box::new(Self { parts }))
    }

    pub fn weights(&self) -> impl Iterator<Item = f64> + '_ {
        self.parts.iter().map(|(w, _)| *w)
    }
}

impl IncrementalMetric for LinearCombination {
    fn add(&mut self, hypothesis: &[Token]) -> Result<(), MetricError> {
        for (_, metric) in &mut self.parts {
            metric.add(hypothesis)?;
        }
        Ok(())
    }

    fn score(&self) -> f64 {
        self.parts.iter().map(|(w, m)| w * m.score()).sum()
    }

    fn len(&self) -> usize {
        self.parts.first().map_or(0, |(_, m)| m.len())
    }

    fn max_score(&self) -> f64 {
        self.parts.iter().map(|(w, m)| w * m.max_score()).sum()
    }
}

impl ReplaceableMetric for LinearCombination {
    fn replace(&mut self, index: usize, hypothesis: &[Token]) -> Result<(), MetricError> {
        for (_, metric) in &mut self.parts {
            metric.replace(index, hypothesis)?;
        }
        Ok(())
    }
}
