//! N-gram language-model feature for phrase-based decoding.
//!
//! The featurizer is called once per hypothesis extension. It scores only
//! the newly attached phrase, continuing from the state its parent left
//! behind, and attaches the resulting state to the new derivation so the
//! next extension can continue from it in turn.
//!
//! For prefix-constrained decoding the caller opens a `PrefixCache`
//! session; positions inside the fixed prefix are then scored once per
//! session and served from the cache afterwards.

mod config;
mod prefix_cache;
#[cfg(test)]
mod tests;

pub use config::{ConfigError, FeaturizerConfig};
pub use prefix_cache::PrefixCache;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tracing::{debug, debug_span, warn};

use crate::class_map::{default_class_map, ClassMapError, WordClassMap};
use crate::derivation::{Derivation, DerivationArena, DerivationId, FeatureId, FeatureState};
use crate::lm::{self, LanguageModel, LmState};
use crate::sequence::{self, Boundary};
use crate::settings::settings;
use crate::token::Token;

#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("derivation {derivation} extends a parent with no '{feature}' state")]
    MissingPriorState { feature: String, derivation: usize },

    #[error("class projection failed: {0}")]
    ClassMap(#[from] ClassMapError),

    #[error("cannot rebuild sentence-start context from an empty target prefix")]
    EmptyTargetPrefix,

    #[error("prefix cache holds {expected} positions but derivation has prefix length {found}")]
    PrefixLengthMismatch { expected: usize, found: usize },

    #[error("prefix cache was opened by another featurizer")]
    ForeignCache,

    #[error("derivation {0} is not in this arena")]
    UnknownDerivation(usize),
}

/// A named scalar emitted for one derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureValue {
    pub name: Arc<str>,
    pub value: f64,
}

static NEXT_FEATURE_ID: AtomicU32 = AtomicU32::new(0);

pub struct NGramFeaturizer {
    id: FeatureId,
    name: Arc<str>,
    lm: Arc<dyn LanguageModel>,
    start_token: Token,
    end_token: Token,
    class_map: Option<Arc<WordClassMap>>,
    wrap_boundary: bool,
}

impl NGramFeaturizer {
    /// Featurizer over `lm` with the default feature name, surface-word
    /// scoring, and the process-wide wrap-boundary mode.
    pub fn new(lm: Arc<dyn LanguageModel>) -> Self {
        let s = settings();
        Self {
            id: FeatureId(NEXT_FEATURE_ID.fetch_add(1, Ordering::Relaxed)),
            name: Arc::from(s.scoring.default_feature_name.as_str()),
            start_token: lm.start_token(),
            end_token: lm.end_token(),
            lm,
            class_map: None,
            wrap_boundary: s.scoring.wrap_boundary,
        }
    }

    /// Load the model named by `config` and build the featurizer.
    pub fn from_config(config: &FeaturizerConfig) -> Result<Self, ConfigError> {
        let lm = lm::load(&config.model).map_err(|source| ConfigError::Model {
            path: config.model.clone(),
            source,
        })?;
        Self::from_config_with_model(config, lm)
    }

    /// Build from `config` using an already loaded model.
    pub fn from_config_with_model(
        config: &FeaturizerConfig,
        lm: Arc<dyn LanguageModel>,
    ) -> Result<Self, ConfigError> {
        let featurizer = Self::new(lm).with_name(&config.name);
        if !config.class_based {
            if config.class_map.is_some() {
                warn!(feature = %config.name, "classMap ignored without classBased=true");
            }
            return Ok(featurizer);
        }
        let map = match &config.class_map {
            Some(path) => Arc::new(WordClassMap::load(path).map_err(|source| {
                ConfigError::ClassMap {
                    path: path.clone(),
                    source,
                }
            })?),
            None => default_class_map().ok_or(ConfigError::NoClassMap)?,
        };
        Ok(featurizer.with_class_map(map))
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Arc::from(name);
        self
    }

    /// Score class sequences instead of surface words.
    pub fn with_class_map(mut self, map: Arc<WordClassMap>) -> Self {
        self.class_map = Some(map);
        self
    }

    /// Override the process-wide wrap-boundary mode for this featurizer.
    pub fn with_wrap_boundary(mut self, enabled: bool) -> Self {
        self.wrap_boundary = enabled;
        self
    }

    pub fn id(&self) -> FeatureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn language_model(&self) -> &Arc<dyn LanguageModel> {
        &self.lm
    }

    pub fn is_class_based(&self) -> bool {
        self.class_map.is_some()
    }

    pub fn wrap_boundary(&self) -> bool {
        self.wrap_boundary
    }

    /// Score the newest phrase of `id` and attach the resulting state.
    ///
    /// Returns `Ok(None)` when wrap-boundary mode has nothing to score yet
    /// (a sentence-start phrase holding only the start marker); no state
    /// is attached in that case.
    pub fn featurize(
        &self,
        arena: &mut DerivationArena,
        id: DerivationId,
    ) -> Result<Option<FeatureValue>, ScoreError> {
        let state = {
            let d = arena
                .try_get(id)
                .ok_or(ScoreError::UnknownDerivation(id.index()))?;
            let _span = debug_span!(
                "lm_featurize",
                feature = %self.name,
                derivation = id.index(),
                phrase_len = d.target_phrase().len()
            )
            .entered();
            let prior = self.prior_state(arena, d, id)?;
            self.score(
                prior,
                d.target_phrase(),
                d.is_sentence_start(),
                d.done(),
                d.target_prefix(),
            )?
        };
        Ok(state.map(|s| {
            let value = s.score();
            self.attach(arena, id, s, value)
        }))
    }

    /// Score a phrase on its own, from no context, for future-cost
    /// estimation. Nothing is attached anywhere.
    pub fn rule_featurize(&self, phrase: &[Token]) -> Result<FeatureValue, ScoreError> {
        let projected = self.project(phrase)?;
        let seq = projected.as_deref().unwrap_or(phrase);
        let value = self.lm.score(seq, 0, None).score();
        Ok(self.value(value))
    }

    /// Open a prefix-cache session. The cache lives as long as the caller
    /// keeps it; dropping it (or calling `end`) discards every entry.
    pub fn begin_prefix_cache_session(&self) -> PrefixCache {
        debug!(feature = %self.name, "prefix cache session started");
        PrefixCache::new(self.id)
    }

    /// Like [`featurize`](Self::featurize), but positions inside the fixed
    /// prefix are served from `cache`.
    pub fn featurize_with_cache(
        &self,
        arena: &mut DerivationArena,
        id: DerivationId,
        cache: &mut PrefixCache,
    ) -> Result<Option<FeatureValue>, ScoreError> {
        if cache.owner() != self.id {
            return Err(ScoreError::ForeignCache);
        }
        let (prefix_length, target_position) = {
            let d = arena
                .try_get(id)
                .ok_or(ScoreError::UnknownDerivation(id.index()))?;
            (d.prefix_length(), d.target_position())
        };
        if prefix_length == 0 {
            return self.featurize(arena, id);
        }

        self.fill_prefix_cache(cache, arena.get(id))?;
        if target_position >= cache.next_uncached_position() {
            return self.featurize(arena, id);
        }

        let (score, state) = {
            let d = arena.get(id);
            let _span = debug_span!(
                "lm_featurize_cached",
                feature = %self.name,
                derivation = id.index(),
                target_position,
                cached = cache.next_uncached_position()
            )
            .entered();
            let prefix = d.target_prefix();
            let next_uncached = cache.next_uncached_position();
            let cache_max = next_uncached.min(prefix.len());

            let mut score: f64 = (target_position..cache_max)
                .filter_map(|i| cache.entry(i))
                .map(LmState::score)
                .sum();
            let mut state = cache_max
                .checked_sub(1)
                .and_then(|i| cache.entry(i))
                .cloned();

            if prefix.len() > next_uncached {
                // The phrase straddles the cache boundary.
                state = self.score(
                    state.as_ref(),
                    &prefix[cache_max..],
                    false,
                    d.done(),
                    prefix,
                )?;
                score += state.as_ref().map_or(0.0, LmState::score);
            } else if d.done() {
                state = self.score(state.as_ref(), &[], false, true, prefix)?;
                score += state.as_ref().map_or(0.0, LmState::score);
            }
            (score, state)
        };

        Ok(state.map(|s| {
            let combined = LmState::new(score, s.context());
            self.attach(arena, id, combined, score)
        }))
    }

    /// Score each not-yet-cached position of the fixed prefix that `d`
    /// covers, one token at a time and never with the sentence end.
    fn fill_prefix_cache(&self, cache: &mut PrefixCache, d: &Derivation) -> Result<(), ScoreError> {
        let prefix_length = d.prefix_length();
        let prefix = d.target_prefix();
        let covered = prefix.len().min(prefix_length);
        let from = cache.next_uncached_position();

        let entries = cache.entries_mut(prefix_length)?;
        if covered <= from {
            return Ok(());
        }

        let _span = debug_span!("prefix_cache_fill", feature = %self.name, from, to = covered).entered();
        let mut state = from.checked_sub(1).and_then(|i| entries[i].clone());
        for i in from..covered {
            state = self.score(state.as_ref(), &prefix[i..i + 1], i == 0, false, prefix)?;
            entries[i] = state.clone();
        }
        cache.advance_to(covered);
        Ok(())
    }

    /// The parent's state for this feature, or `None` at sentence start.
    fn prior_state<'a>(
        &self,
        arena: &'a DerivationArena,
        d: &Derivation,
        id: DerivationId,
    ) -> Result<Option<&'a LmState>, ScoreError> {
        let Some(prior_id) = d.prior() else {
            return Ok(None);
        };
        match arena.get(prior_id).lm_state(self.id) {
            Some(s) => Ok(Some(s)),
            // Wrap-boundary mode leaves the first extension stateless when
            // it only carried the start marker; context is rebuilt below.
            None if self.wrap_boundary => Ok(None),
            None => Err(ScoreError::MissingPriorState {
                feature: self.name.to_string(),
                derivation: id.index(),
            }),
        }
    }

    fn project(&self, seq: &[Token]) -> Result<Option<Vec<Token>>, ClassMapError> {
        let Some(map) = &self.class_map else {
            return Ok(None);
        };
        let boundaries = [self.start_token, self.end_token];
        let preserved: &[Token] = if self.wrap_boundary { &boundaries } else { &[] };
        map.project(seq, preserved).map(Some)
    }

    /// Boundary handling, class projection, and the oracle call.
    ///
    /// `target_prefix` is only consulted in wrap-boundary mode, when a
    /// non-initial phrase has no prior state and the sentence-start
    /// context is rebuilt from the first recorded target token.
    fn score(
        &self,
        prior: Option<&LmState>,
        seq: &[Token],
        is_begin: bool,
        is_end: bool,
        target_prefix: &[Token],
    ) -> Result<Option<LmState>, ScoreError> {
        let projected = self.project(seq)?;
        let seq = projected.as_deref().unwrap_or(seq);

        let (sequence, start_index) = if !self.wrap_boundary {
            sequence::wrap(
                seq,
                Boundary::from_flags(is_begin, is_end),
                self.start_token,
                self.end_token,
            )
        } else if is_begin {
            if seq.len() < 2 {
                return Ok(None);
            }
            (seq.to_vec(), 1)
        } else if prior.is_none() {
            let first = *target_prefix.first().ok_or(ScoreError::EmptyTargetPrefix)?;
            (sequence::wrap_start(seq, first), 1)
        } else {
            (seq.to_vec(), 0)
        };

        Ok(Some(self.lm.score(&sequence, start_index, prior)))
    }

    fn attach(
        &self,
        arena: &mut DerivationArena,
        id: DerivationId,
        state: LmState,
        value: f64,
    ) -> FeatureValue {
        arena.set_state(id, self.id, FeatureState::Lm(state));
        self.value(value)
    }

    fn value(&self, value: f64) -> FeatureValue {
        FeatureValue {
            name: Arc::clone(&self.name),
            value,
        }
    }
}
