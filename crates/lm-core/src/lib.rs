pub mod class_map;
pub mod derivation;
pub mod featurizer;
pub mod lm;
pub mod metrics;
pub mod sequence;
pub mod settings;
pub mod token;

#[cfg(test)]
pub(crate) mod testutil;

pub use class_map::{ClassMapError, WordClassMap};
pub use derivation::{Derivation, DerivationArena, DerivationId, FeatureId, FeatureState};
pub use featurizer::{
    ConfigError, FeatureValue, FeaturizerConfig, NGramFeaturizer, PrefixCache, ScoreError,
};
pub use lm::{BackoffModel, LanguageModel, LmError, LmState};
pub use token::Token;
