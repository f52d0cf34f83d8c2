//! Arena of partial translation hypotheses.
//!
//! The search engine owns the arena and grows it one phrase at a time.
//! Each `Derivation` points at its parent by index and carries the states
//! attached to it by scoring features. Dropping or clearing the arena
//! frees every state with it.

use crate::lm::LmState;
use crate::token::Token;

/// Index of a derivation inside its arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DerivationId(usize);

impl DerivationId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Identity of a scoring feature; states are attached per feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureId(pub(crate) u32);

/// Per-feature state attached to a derivation.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureState {
    Lm(LmState),
}

impl FeatureState {
    pub fn score(&self) -> f64 {
        match self {
            FeatureState::Lm(s) => s.score(),
        }
    }

    pub fn as_lm(&self) -> Option<&LmState> {
        match self {
            FeatureState::Lm(s) => Some(s),
        }
    }
}

/// One partial or complete hypothesis.
#[derive(Debug, Clone)]
pub struct Derivation {
    prior: Option<DerivationId>,
    /// Full target side generated so far, including the newest phrase.
    target_prefix: Vec<Token>,
    /// Where the newest phrase starts inside `target_prefix`.
    target_position: usize,
    done: bool,
    prefix_length: usize,
    states: Vec<(FeatureId, FeatureState)>,
}

impl Derivation {
    pub fn prior(&self) -> Option<DerivationId> {
        self.prior
    }

    pub fn target_prefix(&self) -> &[Token] {
        &self.target_prefix
    }

    /// The phrase added by this extension.
    pub fn target_phrase(&self) -> &[Token] {
        &self.target_prefix[self.target_position..]
    }

    pub fn target_position(&self) -> usize {
        self.target_position
    }

    pub fn is_sentence_start(&self) -> bool {
        self.prior.is_none()
    }

    /// True when this extension completes the sentence.
    pub fn done(&self) -> bool {
        self.done
    }

    /// Length of the externally fixed prefix (0 when unconstrained).
    pub fn prefix_length(&self) -> usize {
        self.prefix_length
    }

    pub fn state(&self, feature: FeatureId) -> Option<&FeatureState> {
        self.states
            .iter()
            .find(|(id, _)| *id == feature)
            .map(|(_, s)| s)
    }

    pub fn lm_state(&self, feature: FeatureId) -> Option<&LmState> {
        self.state(feature).and_then(FeatureState::as_lm)
    }
}

/// Owner of every derivation built while decoding one sentence.
#[derive(Debug, Default)]
pub struct DerivationArena {
    nodes: Vec<Derivation>,
    prefix_length: usize,
}

impl DerivationArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arena whose derivations are constrained to a fixed target prefix of
    /// `prefix_length` tokens.
    pub fn with_prefix_length(prefix_length: usize) -> Self {
        Self {
            nodes: Vec::new(),
            prefix_length,
        }
    }

    pub fn prefix_length(&self) -> usize {
        self.prefix_length
    }

    /// Start a new hypothesis with its first phrase.
    pub fn root(&mut self, phrase: &[Token], done: bool) -> DerivationId {
        self.push(Derivation {
            prior: None,
            target_prefix: phrase.to_vec(),
            target_position: 0,
            done,
            prefix_length: self.prefix_length,
            states: Vec::new(),
        })
    }

    /// Extend `prior` with `phrase`.
    ///
    /// Panics if `prior` is not in this arena; use `try_get` first for ids
    /// that may be stale.
    pub fn extend(&mut self, prior: DerivationId, phrase: &[Token], done: bool) -> DerivationId {
        let parent = &self.nodes[prior.0];
        let mut target_prefix = Vec::with_capacity(parent.target_prefix.len() + phrase.len());
        target_prefix.extend_from_slice(&parent.target_prefix);
        target_prefix.extend_from_slice(phrase);
        let target_position = parent.target_prefix.len();
        self.push(Derivation {
            prior: Some(prior),
            target_prefix,
            target_position,
            done,
            prefix_length: self.prefix_length,
            states: Vec::new(),
        })
    }

    fn push(&mut self, d: Derivation) -> DerivationId {
        let id = DerivationId(self.nodes.len());
        self.nodes.push(d);
        id
    }

    /// Panics on an id from another arena or from before `clear`.
    pub fn get(&self, id: DerivationId) -> &Derivation {
        &self.nodes[id.0]
    }

    /// Look up an id that may have come from elsewhere.
    pub fn try_get(&self, id: DerivationId) -> Option<&Derivation> {
        self.nodes.get(id.0)
    }

    /// Attach (or replace) the state of `feature` on `id`.
    pub fn set_state(&mut self, id: DerivationId, feature: FeatureId, state: FeatureState) {
        let states = &mut self.nodes[id.0].states;
        match states.iter_mut().find(|(f, _)| *f == feature) {
            Some(slot) => slot.1 = state,
            None => states.push((feature, state)),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Drop every derivation created after the first `len`.
    pub fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
    }
}
