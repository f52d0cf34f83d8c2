use std::thread;

use super::*;

#[test]
fn test_sessions_share_features_across_threads() {
    let features = vec![lm_feature("LM")];
    let sentences = ["the|cat sat", "the cat|sat on", "the cat sat|on the dog", "the dog"];

    let expected: Vec<f64> = sentences
        .iter()
        .map(|s| {
            let mut session = DecodingSession::new(features.clone());
            session
                .score_segmentation(&phrases(s))
                .unwrap()
                .iter()
                .map(|e| e.total)
                .sum::<f64>()
        })
        .collect();

    let results: Vec<Vec<f64>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let features = features.clone();
                scope.spawn(move || {
                    sentences
                        .iter()
                        .map(|s| {
                            let prefix = phrases(s).concat();
                            let mut session = DecodingSession::with_prefix(features.clone(), prefix);
                            session
                                .score_segmentation(&phrases(s))
                                .unwrap()
                                .iter()
                                .map(|e| e.total)
                                .sum::<f64>()
                        })
                        .collect::<Vec<f64>>()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for totals in results {
        for (a, e) in totals.iter().zip(&expected) {
            assert_close(*a, *e);
        }
    }
}
