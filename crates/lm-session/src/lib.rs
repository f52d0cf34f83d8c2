//! Per-sentence decoding session driving language-model features.
//!
//! `DecodingSession` owns the derivation arena of one sentence and, for
//! prefix-constrained decoding, one prefix cache per feature. The search
//! engine calls `extend` once per hypothesis extension and reads back the
//! feature values.

mod extend;
mod types;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use lm_core::derivation::DerivationArena;
use lm_core::featurizer::{FeatureValue, NGramFeaturizer, PrefixCache};
use lm_core::token::Token;
use tracing::debug;

pub use types::{Extension, SessionError};

pub struct DecodingSession {
    features: Vec<Arc<NGramFeaturizer>>,
    arena: DerivationArena,
    /// Fixed target prefix for constrained decoding.
    prefix: Option<Vec<Token>>,
    /// One cache per feature, same order as `features`. Empty when
    /// unconstrained.
    caches: Vec<PrefixCache>,
}

impl DecodingSession {
    pub fn new(features: Vec<Arc<NGramFeaturizer>>) -> Self {
        Self {
            features,
            arena: DerivationArena::new(),
            prefix: None,
            caches: Vec::new(),
        }
    }

    /// Session whose every hypothesis must start with `prefix`.
    pub fn with_prefix(features: Vec<Arc<NGramFeaturizer>>, prefix: Vec<Token>) -> Self {
        let caches = features
            .iter()
            .map(|f| f.begin_prefix_cache_session())
            .collect();
        debug!(
            features = features.len(),
            prefix_len = prefix.len(),
            "constrained session"
        );
        Self {
            arena: DerivationArena::with_prefix_length(prefix.len()),
            features,
            prefix: Some(prefix),
            caches,
        }
    }

    pub fn features(&self) -> &[Arc<NGramFeaturizer>] {
        &self.features
    }

    pub fn arena(&self) -> &DerivationArena {
        &self.arena
    }

    pub fn prefix(&self) -> Option<&[Token]> {
        self.prefix.as_deref()
    }

    pub fn prefix_caches(&self) -> &[PrefixCache] {
        &self.caches
    }

    /// Context-free score of `phrase` under every feature.
    pub fn option_scores(&self, phrase: &[Token]) -> Result<Vec<FeatureValue>, SessionError> {
        self.features
            .iter()
            .map(|f| f.rule_featurize(phrase).map_err(SessionError::from))
            .collect()
    }

    /// Drop every derivation and start fresh cache sessions.
    pub fn reset(&mut self) {
        self.arena.clear();
        if self.prefix.is_some() {
            self.caches = self
                .features
                .iter()
                .map(|f| f.begin_prefix_cache_session())
                .collect();
        }
    }
}
