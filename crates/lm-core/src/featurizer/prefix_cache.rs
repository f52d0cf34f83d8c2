use tracing::debug;

use super::ScoreError;
use crate::derivation::FeatureId;
use crate::lm::LmState;

/// Per-session cache of language-model states for a fixed target prefix.
///
/// Entry `i` holds the state after scoring prefix token `i` given tokens
/// `0..i`. Entries below `next_uncached_position` are final; the rest are
/// unset. The table is sized from the first derivation that uses it and
/// never grows. One cache serves one featurizer and one sentence: open it
/// with `NGramFeaturizer::begin_prefix_cache_session` and drop it (or call
/// [`end`](Self::end)) when the sentence is finished.
#[derive(Debug)]
pub struct PrefixCache {
    owner: FeatureId,
    entries: Option<Vec<Option<LmState>>>,
    next_uncached: usize,
}

impl PrefixCache {
    pub(super) fn new(owner: FeatureId) -> Self {
        Self {
            owner,
            entries: None,
            next_uncached: 0,
        }
    }

    pub(super) fn owner(&self) -> FeatureId {
        self.owner
    }

    /// Number of leading prefix positions already scored.
    pub fn next_uncached_position(&self) -> usize {
        self.next_uncached
    }

    /// Fixed prefix length, once the table has been allocated.
    pub fn prefix_length(&self) -> Option<usize> {
        self.entries.as_ref().map(Vec::len)
    }

    pub fn entry(&self, pos: usize) -> Option<&LmState> {
        self.entries.as_ref()?.get(pos)?.as_ref()
    }

    /// The entry table, allocated on first use.
    pub(super) fn entries_mut(
        &mut self,
        prefix_length: usize,
    ) -> Result<&mut [Option<LmState>], ScoreError> {
        let entries = self
            .entries
            .get_or_insert_with(|| vec![None; prefix_length]);
        if entries.len() != prefix_length {
            return Err(ScoreError::PrefixLengthMismatch {
                expected: entries.len(),
                found: prefix_length,
            });
        }
        Ok(entries)
    }

    pub(super) fn advance_to(&mut self, pos: usize) {
        debug_assert!(pos >= self.next_uncached);
        debug_assert!(self.prefix_length().is_some_and(|len| pos <= len));
        self.next_uncached = pos;
    }

    /// Close the session and discard every cached state.
    pub fn end(self) {}
}

impl Drop for PrefixCache {
    fn drop(&mut self) {
        debug!(cached = self.next_uncached, "prefix cache session ended");
    }
}
