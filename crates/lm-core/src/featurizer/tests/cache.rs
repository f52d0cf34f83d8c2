use std::sync::Arc;

use super::*;
use crate::derivation::{DerivationArena, DerivationId};
use crate::featurizer::ScoreError;
use crate::testutil::{assert_close, RecordingModel};
use crate::token::tokenize;

/// A small search tree over the fixed prefix "the cat sat". Parents come
/// before children.
fn build_tree(arena: &mut DerivationArena) -> Vec<DerivationId> {
    let r1 = arena.root(&tokenize("the"), false);
    let r2 = arena.root(&tokenize("the cat"), false);
    let a = arena.extend(r1, &tokenize("cat"), false);
    let b = arena.extend(a, &tokenize("sat on"), false);
    let c = arena.extend(r2, &tokenize("sat"), true);
    let d = arena.extend(b, &tokenize("the dog"), true);
    let e = arena.extend(a, &[], false);
    vec![r1, r2, a, b, c, d, e]
}

fn assert_equivalent(f: &NGramFeaturizer, prefix_length: usize) {
    let mut plain = DerivationArena::with_prefix_length(prefix_length);
    let mut cached = DerivationArena::with_prefix_length(prefix_length);
    let ids = build_tree(&mut plain);
    assert_eq!(build_tree(&mut cached), ids);

    let mut cache = f.begin_prefix_cache_session();
    for &id in &ids {
        let expected = f.featurize(&mut plain, id).unwrap();
        let actual = f.featurize_with_cache(&mut cached, id, &mut cache).unwrap();
        match (expected, actual) {
            (Some(e), Some(a)) => {
                assert_eq!(e.name, a.name);
                assert_close(a.value, e.value);
            }
            (e, a) => assert_eq!(e.is_some(), a.is_some(), "derivation {}", id.index()),
        }
        let e = plain.get(id).lm_state(f.id());
        let a = cached.get(id).lm_state(f.id());
        assert_eq!(e.map(|s| s.context()), a.map(|s| s.context()));
        if let (Some(e), Some(a)) = (e, a) {
            assert_close(a.score(), e.score());
        }
    }
}

#[test]
fn test_cached_matches_uncached() {
    assert_equivalent(&surface(false), 3);
}

#[test]
fn test_cached_matches_uncached_short_prefix() {
    assert_equivalent(&surface(false), 2);
    assert_equivalent(&surface(false), 1);
}

#[test]
fn test_cached_matches_uncached_class_based() {
    let f = NGramFeaturizer::new(class_model())
        .with_class_map(class_map())
        .with_wrap_boundary(false);
    let mut plain = DerivationArena::with_prefix_length(3);
    let mut cached = DerivationArena::with_prefix_length(3);
    let mut cache = f.begin_prefix_cache_session();
    let mut ids = Vec::new();
    for arena in [&mut plain, &mut cached] {
        let root = arena.root(&tokenize("the"), false);
        ids = vec![root, arena.extend(root, &tokenize("dog sat"), true)];
    }
    for id in ids {
        let e = f.featurize(&mut plain, id).unwrap().unwrap();
        let a = f.featurize_with_cache(&mut cached, id, &mut cache).unwrap().unwrap();
        assert_close(a.value, e.value);
    }
}

#[test]
fn test_fill_is_lazy_and_monotonic() {
    let f = surface(false);
    let mut arena = DerivationArena::with_prefix_length(3);
    let ids = build_tree(&mut arena);
    let mut cache = f.begin_prefix_cache_session();
    assert_eq!(cache.next_uncached_position(), 0);
    assert_eq!(cache.prefix_length(), None);

    let mut seen = Vec::new();
    for &id in &ids {
        f.featurize_with_cache(&mut arena, id, &mut cache).unwrap();
        seen.push(cache.next_uncached_position());
    }
    assert_eq!(seen, vec![1, 2, 2, 3, 3, 3, 3]);
    assert_eq!(cache.prefix_length(), Some(3));
    assert!(cache.entry(2).is_some());
    assert!(cache.entry(3).is_none());
}

#[test]
fn test_cache_saves_oracle_calls() {
    let rec = RecordingModel::new(test_model());
    let lm: Arc<dyn LanguageModel> = rec.clone();
    let f = NGramFeaturizer::new(lm).with_wrap_boundary(false);

    let shape = |arena: &mut DerivationArena| {
        let mut ids = Vec::new();
        for _ in 0..2 {
            let root = arena.root(&tokenize("the"), false);
            ids.push(root);
            ids.push(arena.extend(root, &tokenize("cat"), false));
        }
        ids
    };

    let mut plain = DerivationArena::with_prefix_length(2);
    for id in shape(&mut plain) {
        f.featurize(&mut plain, id).unwrap();
    }
    assert_eq!(rec.call_count(), 4);

    rec.clear();
    let mut cached = DerivationArena::with_prefix_length(2);
    let mut cache = f.begin_prefix_cache_session();
    for id in shape(&mut cached) {
        f.featurize_with_cache(&mut cached, id, &mut cache).unwrap();
    }
    assert_eq!(rec.call_count(), 2);
}

#[test]
fn test_phrase_straddling_cache_boundary() {
    let rec = RecordingModel::new(test_model());
    let lm: Arc<dyn LanguageModel> = rec.clone();
    let f = NGramFeaturizer::new(lm).with_wrap_boundary(false);

    let mut arena = DerivationArena::with_prefix_length(3);
    let root = arena.root(&tokenize("the cat"), false);
    let mut cache = f.begin_prefix_cache_session();
    let first = f.featurize_with_cache(&mut arena, root, &mut cache).unwrap().unwrap();
    assert_close(first.value, -0.5);

    rec.clear();
    let next = arena.extend(root, &tokenize("sat on"), false);
    let fv = f.featurize_with_cache(&mut arena, next, &mut cache).unwrap().unwrap();
    // sat | the cat = -0.25, on | cat sat backs off to -0.8 + -0.1.
    assert_close(fv.value, -1.15);

    let calls = rec.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].sequence, tokenize("sat"));
    assert_eq!(calls[1].sequence, tokenize("on"));
    assert_eq!(calls[1].start_index, 0);
    assert!(calls[1].had_prior);
    assert_eq!(
        arena.get(next).lm_state(f.id()).unwrap().context(),
        tokenize("sat on").as_slice()
    );
}

#[test]
fn test_sentence_end_inside_prefix() {
    let rec = RecordingModel::new(test_model());
    let lm: Arc<dyn LanguageModel> = rec.clone();
    let f = NGramFeaturizer::new(lm).with_wrap_boundary(false);

    let mut arena = DerivationArena::with_prefix_length(3);
    let id = arena.root(&tokenize("the cat sat"), true);
    let mut cache = f.begin_prefix_cache_session();
    let fv = f.featurize_with_cache(&mut arena, id, &mut cache).unwrap().unwrap();

    assert_close(fv.value, -1.25);
    let calls = rec.calls();
    assert_eq!(calls.len(), 4);
    assert_eq!(calls[0].sequence, tokenize("<s> the"));
    assert_eq!(calls[0].start_index, 1);
    assert_eq!(calls[3].sequence, tokenize("</s>"));
    assert_eq!(calls[3].start_index, 0);
    // Cached positions never include the sentence end.
    assert_close(cache.entry(2).unwrap().score(), -0.25);
}

#[test]
fn test_unconstrained_derivation_bypasses_cache() {
    let f = surface(false);
    let mut arena = DerivationArena::new();
    let id = arena.root(&tokenize("the cat"), false);
    let mut cache = f.begin_prefix_cache_session();
    let fv = f.featurize_with_cache(&mut arena, id, &mut cache).unwrap().unwrap();
    assert_close(fv.value, -0.5);
    assert_eq!(cache.next_uncached_position(), 0);
    assert_eq!(cache.prefix_length(), None);
}

#[test]
fn test_foreign_cache_rejected() {
    let f = surface(false);
    let g = surface(false);
    let mut arena = DerivationArena::with_prefix_length(2);
    let id = arena.root(&tokenize("the"), false);
    let mut cache = g.begin_prefix_cache_session();
    assert!(matches!(
        f.featurize_with_cache(&mut arena, id, &mut cache),
        Err(ScoreError::ForeignCache)
    ));
}

#[test]
fn test_prefix_length_mismatch() {
    let f = surface(false);
    let mut cache = f.begin_prefix_cache_session();

    let mut three = DerivationArena::with_prefix_length(3);
    let id = three.root(&tokenize("the"), false);
    f.featurize_with_cache(&mut three, id, &mut cache).unwrap();

    let mut two = DerivationArena::with_prefix_length(2);
    let id = two.root(&tokenize("the"), false);
    match f.featurize_with_cache(&mut two, id, &mut cache) {
        Err(ScoreError::PrefixLengthMismatch { expected, found }) => {
            assert_eq!((expected, found), (3, 2));
        }
        other => panic!("expected PrefixLengthMismatch, got {other:?}"),
    }
}

#[test]
fn test_new_session_starts_empty() {
    let f = surface(false);
    let mut arena = DerivationArena::with_prefix_length(2);
    let id = arena.root(&tokenize("the cat"), false);
    let mut cache = f.begin_prefix_cache_session();
    f.featurize_with_cache(&mut arena, id, &mut cache).unwrap();
    assert_eq!(cache.next_uncached_position(), 2);
    cache.end();

    let fresh = f.begin_prefix_cache_session();
    assert_eq!(fresh.next_uncached_position(), 0);
    assert!(fresh.entry(0).is_none());
}
