//! Corpus-level evaluation metrics with incremental updates.
//!
//! Every metric accumulates one finished hypothesis at a time with `add`.
//! Metrics that can also swap a previously added hypothesis in O(1) of the
//! corpus size implement `ReplaceableMetric`.

mod bleu;
mod edit_distance;
mod linear;
mod wer;

pub use bleu::BleuMetric;
pub use edit_distance::edit_distance;
pub use linear::LinearCombination;
pub use wer::WerMetric;

use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::settings::settings;
use crate::token::{tokenize, Token};

/// References for every segment of a corpus: `references[i]` holds all
/// reference translations of segment `i`.
pub type References = Arc<[Vec<Vec<Token>>]>;

#[derive(Debug, thiserror::Error)]
pub enum MetricError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("no references for segment {0}")]
    MissingReferences(usize),

    #[error("segment {index} out of range (metric holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("reference file {path} has {found} lines, expected {expected}")]
    ReferenceLengthMismatch {
        path: String,
        expected: usize,
        found: usize,
    },

    #[error("unrecognized metric: {0}")]
    UnknownMetric(String),

    #[error("invalid metric '{spec}': {reason}")]
    InvalidSpec { spec: String, reason: String },
}

/// Streaming accumulation of a corpus score.
pub trait IncrementalMetric: Send {
    /// Append the next segment's hypothesis.
    fn add(&mut self, hypothesis: &[Token]) -> Result<(), MetricError>;

    /// Corpus score over everything added so far.
    fn score(&self) -> f64;

    /// Number of hypotheses added.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Best attainable score.
    fn max_score(&self) -> f64;
}

/// Metrics whose aggregate can be patched when one hypothesis changes.
pub trait ReplaceableMetric: IncrementalMetric {
    fn replace(&mut self, index: usize, hypothesis: &[Token]) -> Result<(), MetricError>;
}

/// Build a metric from its name.
///
/// Accepted forms are `wer`, `bleu`, `bleu:N`, `smoothbleu`,
/// `smoothbleu:N`, and `-`-separated weighted sums of those such as
/// `bleu-wer`, `bleu-2wer`, `2bleu-wer`, or `bleu:3-0.5wer`.
pub fn new_metric(spec: &str, references: References) -> Result<Box<dyn ReplaceableMetric>, MetricError> {
    let terms = spec
        .split('-')
        .map(|term| parse_term(spec, term))
        .collect::<Result<Vec<_>, _>>()?;
    debug!(spec, terms = terms.len(), segments = references.len(), "building metric");

    if let [(weight, kind)] = terms.as_slice() {
        if *weight == 1.0 {
            return Ok(kind.build(references));
        }
    }
    let parts = terms
        .into_iter()
        .map(|(weight, kind)| (weight, kind.build(Arc::clone(&references))))
        .collect();
    LinearCombination::new(parts)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MetricKind {
    Wer,
    Bleu { order: usize, smooth: bool },
}

impl MetricKind {
    fn build(self, references: References) -> Box<dyn ReplaceableMetric> {
        match self {
            MetricKind::Wer => Box::new(WerMetric::new(references)),
            MetricKind::Bleu { order, smooth } => {
                Box::new(BleuMetric::with_order(references, order).smoothed(smooth))
            }
        }
    }
}

/// `[weight]name[:order]`
fn parse_term(spec: &str, term: &str) -> Result<(f64, MetricKind), MetricError> {
    let invalid = |reason: String| MetricError::InvalidSpec {
        spec: spec.to_string(),
        reason,
    };

    let split = term
        .find(|c: char| c.is_ascii_alphabetic())
        .ok_or_else(|| invalid(format!("term '{term}' names no metric")))?;
    let (weight, rest) = term.split_at(split);
    let weight = if weight.is_empty() {
        1.0
    } else {
        weight
            .parse::<f64>()
            .ok()
            .filter(|w| w.is_finite() && *w > 0.0)
            .ok_or_else(|| invalid(format!("bad weight '{weight}'")))?
    };

    let (name, order) = match rest.split_once(':') {
        Some((name, order)) => {
            let order = order
                .parse::<usize>()
                .ok()
                .filter(|n| (1..=9).contains(n))
                .ok_or_else(|| invalid(format!("bad n-gram order '{order}'")))?;
            (name, Some(order))
        }
        None => (rest, None),
    };

    let kind = match (name, order) {
        ("wer", None) => MetricKind::Wer,
        ("bleu" | "smoothbleu", order) => MetricKind::Bleu {
            order: order.unwrap_or(settings().metrics.bleu_order),
            smooth: name == "smoothbleu",
        },
        ("wer", Some(_)) => return Err(invalid("wer takes no order".to_string())),
        _ => return Err(MetricError::UnknownMetric(spec.to_string())),
    };
    Ok((weight, kind))
}

/// Read parallel reference files: line `i` of every file is a reference
/// for segment `i`. All files must have the same number of lines.
pub fn read_references<P: AsRef<Path>>(paths: &[P]) -> Result<References, MetricError> {
    let mut segments: Vec<Vec<Vec<Token>>> = Vec::new();
    for (i, path) in paths.iter().enumerate() {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let lines: Vec<&str> = text.lines().collect();
        if i == 0 {
            segments = vec![Vec::new(); lines.len()];
        } else if lines.len() != segments.len() {
            return Err(MetricError::ReferenceLengthMismatch {
                path: path.display().to_string(),
                expected: segments.len(),
                found: lines.len(),
            });
        }
        for (segment, line) in segments.iter_mut().zip(lines) {
            segment.push(tokenize(line));
        }
    }
    Ok(segments.into())
}

/// The references of `segment`, or an error when the corpus is shorter.
fn segment_references(references: &References, segment: usize) -> Result<&[Vec<Token>], MetricError> {
    references
        .get(segment)
        .filter(|refs| !refs.is_empty())
        .map(Vec::as_slice)
        .ok_or(MetricError::MissingReferences(segment))
}
