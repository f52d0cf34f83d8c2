use lm_core::derivation::DerivationId;
use lm_core::featurizer::FeatureValue;
use lm_core::token::Token;
use tracing::debug_span;

use super::types::{Extension, SessionError};
use super::DecodingSession;

impl DecodingSession {
    /// Add `phrase` after `prior` (or start a hypothesis when `prior` is
    /// `None`) and score it with every feature.
    pub fn extend(
        &mut self,
        prior: Option<DerivationId>,
        phrase: &[Token],
        done: bool,
    ) -> Result<Extension, SessionError> {
        let offset = match prior {
            Some(p) => {
                self.arena
                    .try_get(p)
                    .ok_or(SessionError::UnknownDerivation(p.index()))?
                    .target_prefix()
                    .len()
            }
            None => 0,
        };
        self.check_prefix(offset, phrase, done)?;

        let mark = self.arena.len();
        let id = match prior {
            Some(p) => self.arena.extend(p, phrase, done),
            None => self.arena.root(phrase, done),
        };
        let _span = debug_span!("session_extend", derivation = id.index(), offset, done).entered();

        let features = match self.run_features(id) {
            Ok(features) => features,
            Err(e) => {
                // Roll back the unreachable derivation.
                self.arena.truncate(mark);
                return Err(e);
            }
        };
        let total = features.iter().map(|v| v.value).sum();
        Ok(Extension {
            id,
            features,
            total,
        })
    }

    fn run_features(&mut self, id: DerivationId) -> Result<Vec<FeatureValue>, SessionError> {
        let mut features = Vec::with_capacity(self.features.len());
        for (i, f) in self.features.iter().enumerate() {
            let value = match self.caches.get_mut(i) {
                Some(cache) => f.featurize_with_cache(&mut self.arena, id, cache)?,
                None => f.featurize(&mut self.arena, id)?,
            };
            features.extend(value);
        }
        Ok(features)
    }

    /// Score one complete segmentation of a sentence: the first phrase
    /// starts the hypothesis and the last one finishes it.
    pub fn score_segmentation(&mut self, phrases: &[Vec<Token>]) -> Result<Vec<Extension>, SessionError> {
        let last = phrases
            .len()
            .checked_sub(1)
            .ok_or(SessionError::EmptySegmentation)?;
        let mut prior = None;
        let mut steps = Vec::with_capacity(phrases.len());
        for (i, phrase) in phrases.iter().enumerate() {
            let step = self.extend(prior, phrase, i == last)?;
            prior = Some(step.id);
            steps.push(step);
        }
        Ok(steps)
    }

    /// Positions `offset..offset + phrase.len()` must agree with the fixed
    /// prefix where they overlap it, and a finished sentence must cover it.
    fn check_prefix(&self, offset: usize, phrase: &[Token], done: bool) -> Result<(), SessionError> {
        let Some(prefix) = &self.prefix else {
            return Ok(());
        };
        let overlap = prefix.iter().skip(offset).zip(phrase);
        for (i, (&expected, &found)) in overlap.enumerate() {
            if expected != found {
                return Err(SessionError::PrefixViolation {
                    position: offset + i,
                    expected: expected.to_string(),
                    found: found.to_string(),
                });
            }
        }
        let covered = offset + phrase.len();
        if done && covered < prefix.len() {
            return Err(SessionError::IncompletePrefix {
                covered,
                required: prefix.len(),
            });
        }
        Ok(())
    }
}
