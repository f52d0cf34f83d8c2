use lm_core::derivation::DerivationId;
use lm_core::featurizer::{FeatureValue, ScoreError};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Score(#[from] ScoreError),

    #[error("target diverges from the fixed prefix at position {position}: expected '{expected}', got '{found}'")]
    PrefixViolation {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("sentence finished after {covered} of {required} prefix tokens")]
    IncompletePrefix { covered: usize, required: usize },

    #[error("unknown derivation {0}")]
    UnknownDerivation(usize),

    #[error("no phrases to score")]
    EmptySegmentation,
}

/// Result of one hypothesis extension.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub id: DerivationId,
    /// Values of the features that produced one; a feature with nothing to
    /// score yet is absent.
    pub features: Vec<FeatureValue>,
    /// Sum of `features`.
    pub total: f64,
}
