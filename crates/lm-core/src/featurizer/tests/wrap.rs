use std::sync::Arc;

use super::*;
use crate::derivation::DerivationArena;
use crate::featurizer::ScoreError;
use crate::testutil::{assert_close, RecordingModel};
use crate::token::tokenize;

#[test]
fn test_markers_come_from_phrases() {
    let rec = RecordingModel::new(test_model());
    let lm: Arc<dyn LanguageModel> = rec.clone();
    let f = NGramFeaturizer::new(lm).with_wrap_boundary(true);

    let mut arena = DerivationArena::new();
    let id = arena.root(&tokenize("<s> the cat sat </s>"), true);
    let fv = f.featurize(&mut arena, id).unwrap().unwrap();

    assert_close(fv.value, -1.25);
    let calls = rec.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].sequence, tokenize("<s> the cat sat </s>"));
    assert_eq!(calls[0].start_index, 1);
}

#[test]
fn test_start_marker_alone_scores_nothing() {
    let f = surface(true);
    let mut arena = DerivationArena::new();
    let root = arena.root(&tokenize("<s>"), false);
    assert_eq!(f.featurize(&mut arena, root).unwrap(), None);
    assert!(arena.get(root).lm_state(f.id()).is_none());
}

#[test]
fn test_context_rebuilt_after_stateless_start() {
    let f = surface(true);
    let mut arena = DerivationArena::new();
    let root = arena.root(&tokenize("<s>"), false);
    f.featurize(&mut arena, root).unwrap();

    let mid = arena.extend(root, &tokenize("the cat"), false);
    let a = f.featurize(&mut arena, mid).unwrap().unwrap();
    assert_close(a.value, -0.5);

    let last = arena.extend(mid, &tokenize("sat </s>"), true);
    let b = f.featurize(&mut arena, last).unwrap().unwrap();
    assert_close(b.value, -0.75);
}

#[test]
fn test_empty_target_prefix() {
    let f = surface(true);
    let mut arena = DerivationArena::new();
    let root = arena.root(&[], false);
    assert_eq!(f.featurize(&mut arena, root).unwrap(), None);
    let next = arena.extend(root, &[], false);
    assert!(matches!(
        f.featurize(&mut arena, next),
        Err(ScoreError::EmptyTargetPrefix)
    ));
}

#[test]
fn test_class_projection_keeps_markers() {
    let f = NGramFeaturizer::new(class_model())
        .with_class_map(class_map())
        .with_wrap_boundary(true);
    let mut arena = DerivationArena::new();
    let id = arena.root(&tokenize("<s> the dog sat </s>"), true);
    let fv = f.featurize(&mut arena, id).unwrap().unwrap();
    assert_close(fv.value, -0.75);
}

#[test]
fn test_cache_in_wrap_mode() {
    let f = surface(true);
    let build = |arena: &mut DerivationArena| {
        let r1 = arena.root(&tokenize("<s>"), false);
        let r2 = arena.root(&tokenize("<s> the"), false);
        let a = arena.extend(r1, &tokenize("the cat"), false);
        let b = arena.extend(r2, &tokenize("cat sat"), false);
        vec![r1, r2, a, b]
    };

    let mut plain = DerivationArena::with_prefix_length(3);
    let mut cached = DerivationArena::with_prefix_length(3);
    let ids = build(&mut plain);
    build(&mut cached);
    let mut cache = f.begin_prefix_cache_session();

    let mut values = Vec::new();
    for id in ids {
        let e = f.featurize(&mut plain, id).unwrap().map(|v| v.value);
        let a = f
            .featurize_with_cache(&mut cached, id, &mut cache)
            .unwrap()
            .map(|v| v.value);
        assert_eq!(e.is_some(), a.is_some());
        if let (Some(e), Some(a)) = (e, a) {
            assert_close(a, e);
        }
        values.push(a);
    }
    assert_eq!(values[0], None);
    assert_close(values[1].unwrap(), -0.3);
    assert_close(values[2].unwrap(), -0.5);
    assert_close(values[3].unwrap(), -0.45);
    assert!(cache.entry(0).is_none());
    assert_eq!(cache.next_uncached_position(), 3);
}
