use std::collections::HashMap;

use super::{segment_references, IncrementalMetric, MetricError, References, ReplaceableMetric};
use crate::settings::settings;
use crate::token::Token;

/// Sufficient statistics of one segment (or a sum of segments).
#[derive(Debug, Clone, Default, PartialEq)]
struct BleuStats {
    /// Clipped n-gram matches, index `n - 1`.
    matched: Vec<usize>,
    /// Hypothesis n-gram totals, index `n - 1`.
    possible: Vec<usize>,
    hyp_len: usize,
    ref_len: usize,
}

impl BleuStats {
    fn zero(order: usize) -> Self {
        Self {
            matched: vec![0; order],
            possible: vec![0; order],
            hyp_len: 0,
            ref_len: 0,
        }
    }

    fn add(&mut self, other: &Self) {
        for (a, b) in self.matched.iter_mut().zip(&other.matched) {
            *a += b;
        }
        for (a, b) in self.possible.iter_mut().zip(&other.possible) {
            *a += b;
        }
        self.hyp_len += other.hyp_len;
        self.ref_len += other.ref_len;
    }

    fn sub(&mut self, other: &Self) {
        for (a, b) in self.matched.iter_mut().zip(&other.matched) {
            *a -= b;
        }
        for (a, b) in self.possible.iter_mut().zip(&other.possible) {
            *a -= b;
        }
        self.hyp_len -= other.hyp_len;
        self.ref_len -= other.ref_len;
    }
}

/// Corpus BLEU: geometric mean of clipped n-gram precisions times the
/// brevity penalty, computed from summed segment statistics.
pub struct BleuMetric {
    references: References,
    order: usize,
    smooth: bool,
    segments: Vec<BleuStats>,
    totals: BleuStats,
}

impl BleuMetric {
    /// BLEU with the configured default order.
    pub fn new(references: References) -> Self {
        Self::with_order(references, settings().metrics.bleu_order)
    }

    pub fn with_order(references: References, order: usize) -> Self {
        let order = order.max(1);
        Self {
            references,
            order,
            smooth: false,
            segments: Vec::new(),
            totals: BleuStats::zero(order),
        }
    }

    /// Add-one smoothing of the precisions of orders above one.
    pub fn smoothed(mut self, smooth: bool) -> Self {
        self.smooth = smooth;
        self
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Modified n-gram precisions of the corpus so far.
    pub fn precisions(&self) -> Vec<f64> {
        (0..self.order)
            .map(|i| {
                let (m, p) = (self.totals.matched[i], self.totals.possible[i]);
                if self.smooth && i > 0 {
                    (m + 1) as f64 / (p + 1) as f64
                } else if p == 0 {
                    0.0
                } else {
                    m as f64 / p as f64
                }
            })
            .collect()
    }

    pub fn brevity_penalty(&self) -> f64 {
        let (c, r) = (self.totals.hyp_len, self.totals.ref_len);
        if c == 0 {
            0.0
        } else if c >= r {
            1.0
        } else {
            (1.0 - r as f64 / c as f64).exp()
        }
    }

    fn segment_stats(&self, segment: usize, hypothesis: &[Token]) -> Result<BleuStats, MetricError> {
        let refs = segment_references(&self.references, segment)?;
        let mut stats = BleuStats::zero(self.order);
        stats.hyp_len = hypothesis.len();
        stats.ref_len = closest_length(refs, hypothesis.len());

        for n in 1..=self.order {
            let hyp_counts = ngram_counts(hypothesis, n);
            let mut max_ref: HashMap<&[Token], usize> = HashMap::new();
            for r in refs {
                for (gram, count) in ngram_counts(r, n) {
                    let slot = max_ref.entry(gram).or_insert(0);
                    *slot = (*slot).max(count);
                }
            }
            stats.possible[n - 1] = hypothesis.len().saturating_sub(n - 1);
            stats.matched[n - 1] = hyp_counts
                .iter()
                .map(|(gram, &count)| count.min(max_ref.get(gram).copied().unwrap_or(0)))
                .sum();
        }
        Ok(stats)
    }
}

/// Length of the reference closest to `hyp_len`, preferring the shorter
/// one on ties.
fn closest_length(refs: &[Vec<Token>], hyp_len: usize) -> usize {
    refs.iter()
        .map(Vec::len)
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0)
}

fn ngram_counts(seq: &[Token], n: usize) -> HashMap<&[Token], usize> {
    let mut counts = HashMap::new();
    for gram in seq.windows(n) {
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

impl IncrementalMetric for BleuMetric {
    fn add(&mut self, hypothesis: &[Token]) -> Result<(), MetricError> {
        let stats = self.segment_stats(self.segments.len(), hypothesis)?;
        self.totals.add(&stats);
        self.segments.push(stats);
        Ok(())
    }

    fn score(&self) -> f64 {
        let precisions = self.precisions();
        if precisions.iter().any(|&p| p == 0.0) {
            return 0.0;
        }
        let mean_log = precisions.iter().map(|p| p.ln()).sum::<f64>() / self.order as f64;
        self.brevity_penalty() * mean_log.exp()
    }

    fn len(&self) -> usize {
        self.segments.len()
    }

    fn max_score(&self) -> f64 {
        1.0
    }
}

impl ReplaceableMetric for BleuMetric {
    fn replace(&mut self, index: usize, hypothesis: &[Token]) -> Result<(), MetricError> {
        let len = self.segments.len();
        if index >= len {
            return Err(MetricError::IndexOutOfRange { index, len });
        }
        let stats = self.segment_stats(index, hypothesis)?;
        self.totals.sub(&self.segments[index]);
        self.totals.add(&stats);
        self.segments[index] = stats;
        Ok(())
    }
}
