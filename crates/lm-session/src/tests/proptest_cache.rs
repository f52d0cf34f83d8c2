//! Property-based tests for prefix-cache scoring.
//!
//! Random sentences are segmented several ways and scored in one
//! constrained session (so the segmentations share its caches). Every
//! extension must score exactly as it would without a cache, and the
//! cached region may only grow.

use proptest::prelude::*;

use lm_core::token::{tokenize, Token};

use super::{lm_feature, unconstrained};
use crate::DecodingSession;

fn arb_sentence() -> impl Strategy<Value = Vec<Token>> {
    // "mouse" is out of vocabulary.
    prop::collection::vec(
        prop::sample::select(vec!["the", "cat", "sat", "on", "dog", "mouse"]),
        1..8,
    )
    .prop_map(|words| tokenize(&words.join(" ")))
}

/// A sentence, a prefix length, and a few segmentations given as cut flags
/// between consecutive words.
fn arb_case() -> impl Strategy<Value = (Vec<Token>, usize, Vec<Vec<bool>>)> {
    arb_sentence().prop_flat_map(|sentence| {
        let n = sentence.len();
        (
            Just(sentence),
            0..=n,
            prop::collection::vec(prop::collection::vec(any::<bool>(), n - 1), 1..5),
        )
    })
}

fn segment(sentence: &[Token], cuts: &[bool]) -> Vec<Vec<Token>> {
    let mut out = vec![vec![sentence[0]]];
    for (&word, &cut) in sentence[1..].iter().zip(cuts) {
        if cut {
            out.push(Vec::new());
        }
        if let Some(last) = out.last_mut() {
            last.push(word);
        }
    }
    out
}

proptest! {
    #[test]
    fn cached_scores_match_uncached((sentence, prefix_len, segmentations) in arb_case()) {
        let mut fixed = DecodingSession::with_prefix(
            vec![lm_feature("LM")],
            sentence[..prefix_len].to_vec(),
        );
        let mut filled = 0;
        for cuts in &segmentations {
            let phrases = segment(&sentence, cuts);
            let mut free = unconstrained();
            let expected = free.score_segmentation(&phrases).unwrap();

            let mut prior = None;
            for (i, phrase) in phrases.iter().enumerate() {
                let step = fixed.extend(prior, phrase, i + 1 == phrases.len()).unwrap();
                prop_assert!((step.total - expected[i].total).abs() < 1e-9);
                prior = Some(step.id);

                let now = fixed.prefix_caches()[0].next_uncached_position();
                prop_assert!(now >= filled);
                prop_assert!(now <= prefix_len);
                filled = now;
            }
        }
        if prefix_len > 0 {
            prop_assert_eq!(filled, prefix_len);
        }
    }
}
